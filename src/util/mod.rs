//! Utility modules for buildscript
//!
//! - Structured logging setup and configuration

pub mod logging;

pub use logging::{init_from_config, init_logging, parse_level, LoggingConfig};
