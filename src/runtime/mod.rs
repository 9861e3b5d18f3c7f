mod config;
mod error;
mod log;

pub use config::*;
pub use error::Error;
pub use self::log::*;

pub type Result<T> = std::result::Result<T, Error>;
