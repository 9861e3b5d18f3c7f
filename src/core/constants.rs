/// Share of V genes lacking the feature to align above which the V feature
/// is corrected
pub const V_ABSENT_FRACTION: f64 = 0.9;
/// Minimal share of those genes that must supply the correcting feature
pub const V_ALTERNATIVE_FRACTION: f64 = 0.8;

pub const DEFAULT_BATCH_SIZE: usize = 64;
pub const MIN_BUFFER_DEPTH: usize = 16;
pub const DEFAULT_TRIMMING_WINDOW_SIZE: usize = 6;

/// Reorder buffer depth (in batches) above which a warning is logged
pub const DEFAULT_REORDER_WARN_DEPTH: usize = 1024;

pub const PROGRESS_INTERVAL: u64 = 100_000;
