mod detect_fileformat;
mod fastq;
pub mod report;
mod sink;
mod source;
mod tsv;
mod vdjca;

pub use detect_fileformat::detect_fileformat;
pub use detect_fileformat::is_gzip_path;
pub use detect_fileformat::verify_input_read_file;
pub use detect_fileformat::DetectedFileformat;

pub use fastq::open_read_source;
pub use fastq::FastaReadSource;
pub use fastq::FastqReadSource;
pub use fastq::FastqRejectedWriter;

pub use sink::AlignmentSink;
pub use sink::RejectedSink;

pub use source::LimitedSource;
pub use source::ReadSource;
pub use source::VecReadSource;

pub use tsv::TsvAlignmentWriter;

pub use vdjca::VdjcaHeader;
pub use vdjca::VdjcaReader;
pub use vdjca::VdjcaWriter;
pub use vdjca::VDJCA_MAGIC;
