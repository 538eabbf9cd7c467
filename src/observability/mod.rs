//! # Observability Module
//!
//! Logging configuration and subscriber setup.

pub mod config;
pub mod logging;

pub use config::{LogConfig, LogFormat};
pub use logging::init_logging;
