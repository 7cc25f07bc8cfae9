//! Signet Relay Library
//!
//! Core functionality for the relay daemon:
//! - Channel registry pairing front-end ports with native host connections
//! - Native host process management and framed transport
//! - Reassembly of fragmented host messages
//! - Time-bounded per-origin approval cache
//! - Dispatcher enforcing the routing and teardown protocol
//! - Unix-socket listener for front-end connections

pub mod approval;
pub mod dispatcher;
pub mod host;
pub mod reassembly;
pub mod registry;
pub mod server;
pub mod status;
