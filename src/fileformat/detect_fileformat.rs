use std::fs::File;
use std::path::Path;

use log::warn;

use crate::runtime::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedFileformat {
    FASTQ,
    FASTA,
    VDJCA,
    TSV,
    Other,
}

pub fn detect_fileformat<P: AsRef<Path>>(p: P) -> DetectedFileformat {
    let p_string = p
        .as_ref()
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let p_string = p_string.strip_suffix(".gz").unwrap_or(&p_string);

    if p_string.ends_with(".fq") | p_string.ends_with(".fastq") {
        DetectedFileformat::FASTQ
    } else if p_string.ends_with(".fa") | p_string.ends_with(".fasta") {
        DetectedFileformat::FASTA
    } else if p_string.ends_with(".vdjca") {
        DetectedFileformat::VDJCA
    } else if p_string.ends_with(".tsv") {
        DetectedFileformat::TSV
    } else {
        DetectedFileformat::Other
    }
}

pub fn is_gzip_path<P: AsRef<Path>>(p: P) -> bool {
    p.as_ref()
        .extension()
        .map_or(false, |e| e.eq_ignore_ascii_case("gz"))
}

/////// Check that the specified file is a FASTQ or FASTA file that can be opened
pub fn verify_input_read_file<P: AsRef<Path>>(path_in: P) -> Result<DetectedFileformat, Error> {
    let path_in = path_in.as_ref();
    let format = detect_fileformat(path_in);
    if !matches!(format, DetectedFileformat::FASTQ | DetectedFileformat::FASTA) {
        return Err(Error::file_not_valid(
            path_in,
            Some("input must be a FASTQ (.fastq, .fq) or FASTA (.fasta, .fa) file, optionally gzipped"),
        ));
    }
    let file = File::open(path_in).map_err(|_| Error::file_not_found(path_in))?;
    if file.metadata()?.len() == 0 {
        warn!("Input file {} is empty", path_in.display());
    }
    Ok(format)
}
