use std::sync::OnceLock;

use crate::runtime;

///////////////////////////////
/// Global Config Options
pub static CONFIG: OnceLock<Config> = OnceLock::new();

#[derive(Clone, Debug)]
pub struct Config {
    pub log_level: runtime::LogLevel,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: runtime::LogLevel(log::LevelFilter::Info),
            verbose: false,
        }
    }
}

impl Config {
    /// Install the process wide config. Only the first call has an effect.
    pub fn init(config: Config) -> &'static Config {
        CONFIG.get_or_init(|| config)
    }

    pub fn get() -> &'static Config {
        CONFIG.get_or_init(Config::default)
    }

    pub fn verbose() -> bool {
        Config::get().verbose
    }
}
