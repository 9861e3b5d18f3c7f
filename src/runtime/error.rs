use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("File at {:?} not found.", path)]
    FileNotFound { path: std::path::PathBuf },

    #[error("File at {:?} is invalid{}.", path, Error::format_msg_as_detail(msg))]
    FileNotValid {
        path: std::path::PathBuf,
        msg: Option<String>,
    },

    #[error("Invalid configuration: {msg}")]
    Configuration { msg: String },

    #[error("{msg} Aborting execution. See warnings for more info (turn on verbose warnings by adding --verbose option).")]
    Calibration { msg: String },

    #[error("Failed reading input{}", Error::format_msg_as_detail(msg))]
    SourceRead { msg: Option<String> },

    #[error("Failed writing to {sink} sink: {source}")]
    SinkWrite {
        sink: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Unrecoverable alignment fault on read {read_id}: {msg}")]
    Alignment { read_id: u64, msg: String },

    #[error("Report was already finalized")]
    ReportFinalized,

    #[error("Failed parsing {}{}", context, Error::format_msg_as_detail(msg))]
    ParseError {
        context: String,
        msg: Option<String>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    #[cold]
    pub fn file_not_found<P: AsRef<std::path::Path>>(path: P) -> Self {
        Error::FileNotFound {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[cold]
    pub fn file_not_valid<P: AsRef<std::path::Path>, M: Into<String>>(
        path: P,
        msg: Option<M>,
    ) -> Self {
        Error::FileNotValid {
            path: path.as_ref().to_path_buf(),
            msg: msg.map(|m| m.into()),
        }
    }

    #[cold]
    pub fn configuration<M: Into<String>>(msg: M) -> Self {
        Error::Configuration { msg: msg.into() }
    }

    #[cold]
    pub fn calibration<M: Into<String>>(msg: M) -> Self {
        Error::Calibration { msg: msg.into() }
    }

    #[cold]
    pub fn source_read<M: Into<String>>(msg: Option<M>) -> Self {
        Error::SourceRead {
            msg: msg.map(|m| m.into()),
        }
    }

    #[cold]
    pub fn sink_write(sink: &'static str, source: std::io::Error) -> Self {
        Error::SinkWrite { sink, source }
    }

    #[cold]
    pub fn alignment<M: Into<String>>(read_id: u64, msg: M) -> Self {
        Error::Alignment {
            read_id,
            msg: msg.into(),
        }
    }

    #[cold]
    pub fn parse_error<C: Into<String>, M: Into<String>>(context: C, msg: Option<M>) -> Self {
        Error::ParseError {
            context: context.into(),
            msg: msg.map(|m| m.into()),
        }
    }

    pub fn format_msg_as_detail(msg: &Option<String>) -> String {
        match msg {
            Some(m) => format!(" ({})", m),
            None => String::new(),
        }
    }

    /// Errors raised before any read has been processed.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Error::Configuration { .. } | Error::Calibration { .. } | Error::ParseError { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_msg_as_detail() {
        assert_eq!(Error::format_msg_as_detail(&None), "");
        assert_eq!(
            Error::format_msg_as_detail(&Some("truncated".to_string())),
            " (truncated)"
        );
    }

    #[test]
    fn test_setup_errors() {
        assert!(Error::configuration("bad").is_setup_error());
        assert!(Error::calibration("No V genes to align.").is_setup_error());
        assert!(!Error::ReportFinalized.is_setup_error());
        let e = Error::calibration("No J genes to align.");
        assert!(e.to_string().starts_with("No J genes to align. Aborting execution."));
    }
}
