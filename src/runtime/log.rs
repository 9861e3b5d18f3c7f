use std::io::Write;

use log::LevelFilter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogLevel(pub LevelFilter);
impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.to_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" | "warning" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            "off" | "none" => LevelFilter::Off,
            _ => return Err(format!("Invalid log level: {}", s)),
        };
        Ok(LogLevel(level))
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        level.0
    }
}

/// Set up env_logger. `RUST_LOG` takes precedence over the given level.
pub fn setup_logger(log_level: LogLevel) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log_level.0);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{} {:<5}] {}",
            buf.timestamp_seconds(),
            record.level(),
            record.args()
        )
    });
    // a second init (tests, embedding) keeps the first logger
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel(LevelFilter::Warn));
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel(LevelFilter::Debug));
        assert!("loud".parse::<LogLevel>().is_err());
    }
}
