pub mod calibrate;
pub mod constants;
mod core;
pub mod params;
pub mod report;
pub mod router;
pub mod threading;
pub mod trim;

pub use self::core::run;
pub use calibrate::calibrate;
pub use params::{AlignConfiguration, PipelineConfig};
pub use report::{ReportSnapshot, RunReport};
pub use router::{RouteOutcome, Sinks};
pub use trim::QualityTrimmerParameters;
