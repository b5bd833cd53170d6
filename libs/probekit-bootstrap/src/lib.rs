//! Bootstrap layer for probehost binaries: layered configuration,
//! logging initialization and shutdown signal plumbing.

pub mod config;
pub mod logging;
pub mod signals;

pub use config::*;
pub use logging::*;
pub use signals::*;
