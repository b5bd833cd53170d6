use std::collections::HashMap;

use async_trait::async_trait;
use tonic::service::RoutesBuilder;

/// Point-in-time snapshot of a module's counters, keyed by stat name.
pub type ModuleStats = HashMap<String, serde_json::Value>;

/// A pluggable unit of probe functionality hosted by the loader.
///
/// The loader holds modules behind this trait only and never sees a concrete
/// module type. Implementations are expected to use interior mutability for
/// any state that changes after construction.
#[async_trait]
pub trait Module: Send + Sync + 'static {
    /// Snapshot of the module's current counters.
    ///
    /// The loader treats this as a pure read; whether repeated snapshots are
    /// cheap or reset anything is the module's own contract.
    fn stats(&self) -> ModuleStats;

    /// Attach the module's gRPC services to the shared route set.
    ///
    /// Called exactly once, during the registration pass. A module with no
    /// RPC surface returns `Ok(())` without touching the builder.
    fn register(&self, routes: &mut RoutesBuilder) -> anyhow::Result<()>;

    /// Release all resources held by the module.
    ///
    /// Called at most once per instance, during loader shutdown.
    async fn close(&self) -> anyhow::Result<()>;
}

/// Named module constructor handed to the registration pass.
///
/// The configuration type `C` is opaque to the loader; it is passed by
/// reference, unmodified, to every constructor in the pass.
pub struct Factory<C> {
    /// Unique module name; used as the registry key and in log/error output.
    pub name: &'static str,
    /// Builds the module from the shared configuration.
    pub create: fn(&C) -> anyhow::Result<Box<dyn Module>>,
}

impl<C> Clone for Factory<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Factory<C> {}

impl<C> std::fmt::Debug for Factory<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factory").field("name", &self.name).finish()
    }
}
