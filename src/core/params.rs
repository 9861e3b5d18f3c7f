use serde::{Deserialize, Serialize};

use super::constants::{DEFAULT_BATCH_SIZE, DEFAULT_REORDER_WARN_DEPTH, MIN_BUFFER_DEPTH};
use super::trim::QualityTrimmerParameters;
use crate::aligner::AlignmentParameters;
use crate::runtime::Error;

/// What the run reads and writes, for the report
#[derive(Debug, Clone, Default)]
pub struct IO {
    pub command_line: String,
    pub input_files: Vec<String>,
    pub output_files: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Runtime {
    pub write_all: bool,
    pub verbose: bool,
    /// Stop after this many reads
    pub limit: Option<u64>,
    pub trimmer: QualityTrimmerParameters,
    pub reorder_warn_depth: usize,
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime {
            write_all: false,
            verbose: false,
            limit: None,
            trimmer: QualityTrimmerParameters::default(),
            reorder_warn_depth: DEFAULT_REORDER_WARN_DEPTH,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Threading {
    pub threads_work: usize,
    pub batch_size: usize,
    /// Capacity, in batches, of the channels between stages
    pub buffer_depth: usize,
}

impl Threading {
    pub fn new(threads_work: usize) -> Self {
        Threading {
            threads_work,
            batch_size: DEFAULT_BATCH_SIZE,
            buffer_depth: MIN_BUFFER_DEPTH.max(threads_work),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub io: IO,
    pub runtime: Runtime,
    pub threading: Threading,
}

impl PipelineConfig {
    pub fn new(threads_work: usize) -> Self {
        PipelineConfig {
            io: IO::default(),
            runtime: Runtime::default(),
            threading: Threading::new(threads_work),
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.threading.threads_work == 0 {
            return Err(Error::configuration("number of threads must be at least 1"));
        }
        if self.threading.batch_size == 0 {
            return Err(Error::configuration("batch size must be at least 1"));
        }
        if self.threading.buffer_depth == 0 {
            return Err(Error::configuration("buffer depth must be at least 1"));
        }
        if self.runtime.limit == Some(0) {
            return Err(Error::configuration("-n / --limit must be positive"));
        }
        if self.runtime.trimmer.is_enabled() && self.runtime.trimmer.window_size == 0 {
            return Err(Error::configuration("trimming window size must be at least 1"));
        }
        Ok(())
    }
}

/// Everything needed to reproduce the alignment step; stored in the output
/// header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignConfiguration {
    /// Aligner parameters after calibration
    pub aligner_parameters: AlignmentParameters,
    pub library_name: String,
    pub limit: Option<u64>,
    /// None when trimming is disabled
    pub trimmer_parameters: Option<QualityTrimmerParameters>,
}

impl AlignConfiguration {
    pub fn new(
        aligner_parameters: AlignmentParameters,
        library_name: impl Into<String>,
        runtime: &Runtime,
    ) -> Self {
        AlignConfiguration {
            aligner_parameters,
            library_name: library_name.into(),
            limit: runtime.limit,
            trimmer_parameters: runtime.trimmer.is_enabled().then_some(runtime.trimmer),
        }
    }
}
