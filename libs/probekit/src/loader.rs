use std::collections::HashMap;

use thiserror::Error;
use tonic::service::RoutesBuilder;

use crate::contracts::{Factory, Module, ModuleStats};

/// Structured errors produced by the registration pass.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to instantiate module '{module}'")]
    Create {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to register module '{module}'")]
    Register {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("module '{module}' is already registered")]
    Duplicate { module: &'static str },
}

impl LoaderError {
    /// Name of the module the pass failed on.
    pub fn module(&self) -> &'static str {
        match self {
            Self::Create { module, .. }
            | Self::Register { module, .. }
            | Self::Duplicate { module } => *module,
        }
    }
}

/// Aggregate of per-module close failures collected during shutdown.
#[derive(Debug, Error)]
#[error("{} module(s) failed to close cleanly", failures.len())]
pub struct ShutdownError {
    pub failures: Vec<(&'static str, anyhow::Error)>,
}

/// Tracks the set of live modules, keyed by factory name.
///
/// A name is present in the map if and only if its module was fully
/// constructed *and* attached to the shared route set; no partially
/// initialized module is ever stored.
///
/// The loader does no internal locking: all methods are meant to be called
/// from the single owning task, or behind external synchronization if
/// concurrent stats queries are ever needed.
pub struct Loader {
    modules: HashMap<&'static str, Box<dyn Module>>,
}

impl Loader {
    /// Empty loader with no modules.
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Run the registration pass over `factories`, strictly in the order
    /// given.
    ///
    /// Each factory's constructor receives the shared configuration, then
    /// the new module attaches itself to `routes`. The first failure aborts
    /// the pass immediately; modules that completed earlier in the pass
    /// remain stored and live; cleanup is left to the eventual
    /// [`Loader::close`]. A module whose attach fails is
    /// discarded without a close call, since it was never stored.
    ///
    /// A factory whose name is already present fails the pass before its
    /// constructor runs.
    pub fn register<C>(
        &mut self,
        cfg: &C,
        routes: &mut RoutesBuilder,
        factories: &[Factory<C>],
    ) -> Result<(), LoaderError> {
        for factory in factories {
            if self.modules.contains_key(factory.name) {
                return Err(LoaderError::Duplicate {
                    module: factory.name,
                });
            }

            let module = (factory.create)(cfg).map_err(|source| LoaderError::Create {
                module: factory.name,
                source,
            })?;

            module
                .register(routes)
                .map_err(|source| LoaderError::Register {
                    module: factory.name,
                    source,
                })?;

            self.modules.insert(factory.name, module);

            tracing::info!(module = factory.name, "module started");
        }

        Ok(())
    }

    /// Snapshot of every live module's stats, keyed by module name.
    pub fn stats(&self) -> HashMap<&'static str, ModuleStats> {
        self.modules
            .iter()
            .map(|(name, module)| (*name, module.stats()))
            .collect()
    }

    /// Close every live module, exactly once each.
    ///
    /// Consumes the loader: after shutdown no further operations are
    /// possible. Every module receives its close call regardless of earlier
    /// modules' outcomes; individual failures are logged and collected into
    /// the returned [`ShutdownError`] rather than cutting the pass short.
    pub async fn close(self) -> Result<(), ShutdownError> {
        let mut failures = Vec::new();

        for (name, module) in self.modules {
            if let Err(err) = module.close().await {
                tracing::warn!(module = name, error = %err, "failed to close module");
                failures.push((name, err));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ShutdownError { failures })
        }
    }

    /// Number of live modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Names of all live modules, in unspecified order.
    pub fn module_names(&self) -> Vec<&'static str> {
        self.modules.keys().copied().collect()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}
