pub mod aligner;
pub mod command;
pub mod common;
pub mod core;
pub mod fileformat;
pub mod repertoire;
pub mod runtime;
pub mod threading;
