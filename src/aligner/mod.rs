mod kmer;
mod layout;
pub mod mutations;
mod params;
mod record;

pub use kmer::KmerAligner;
pub use layout::{merge_mates, reverse_mate, ReadsLayout};
pub use params::{AlignmentParameters, GeneAlignerParameters, PRESETS};
pub use record::{
    Alignment, AlignmentOutcome, AlignmentRecord, AlignmentResult, Hit, NotAlignedReason,
    SequenceHistory,
};

use thiserror::Error;

use crate::common::Read;
use crate::repertoire::CalibratedRepertoire;

#[derive(Error, Debug)]
pub enum AlignError {
    /// Something is wrong with this read only; it is reported as not aligned
    #[error("read rejected by aligner: {0}")]
    Recoverable(String),
    /// The engine cannot continue; the run is aborted
    #[error("aligner fault: {0}")]
    Fatal(String),
}

/// Aligns one read at a time. Called concurrently from all workers.
pub trait AlignmentEngine: Send + Sync {
    fn align(
        &self,
        read: &Read,
        params: &AlignmentParameters,
        repertoire: &CalibratedRepertoire,
    ) -> Result<AlignmentOutcome, AlignError>;
}
