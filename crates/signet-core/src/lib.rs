//! Signet Core Library
//!
//! Shared functionality for Signet components:
//! - Wire-message types and parsing for the front-end and native-host transports
//! - Configuration resolution
//! - Runtime-reloadable tracing initialisation
//! - Common error types

pub mod config;
pub mod error;
pub mod logging;
pub mod wire;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::{LogLevel, LogLevelHandle};
