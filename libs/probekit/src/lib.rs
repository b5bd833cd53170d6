//! Probekit: module lifecycle primitives for probehost.
//!
//! A probehost process is a set of pluggable modules hosted on one shared
//! gRPC endpoint. This crate defines the contract a module implements
//! ([`contracts::Module`]) and the [`loader::Loader`] that instantiates a
//! list of named factories against the process configuration, attaches each
//! module to the shared route set, aggregates per-module statistics, and
//! drives coordinated shutdown.

pub mod contracts;
pub mod loader;

pub use contracts::{Factory, Module, ModuleStats};
pub use loader::{Loader, LoaderError, ShutdownError};
