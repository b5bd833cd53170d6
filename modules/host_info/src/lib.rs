//! Host Info Module
//!
//! Reports static host facts (hostname, pid, start time) through the stats
//! surface and optionally exposes a minimal ping service on the shared gRPC
//! endpoint so peers can probe liveness.

use std::convert::Infallible;
use std::future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use std::time::Instant;

use anyhow::Context;
use async_trait::async_trait;
use http::{Request, Response};
use probekit::contracts::{Module, ModuleStats};
use probekit_bootstrap::AppConfig;
use serde::Deserialize;
use tonic::{body::Body, server::NamedService, service::RoutesBuilder};
use tower::Service;

pub const MODULE_NAME: &str = "host_info";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct HostInfoConfig {
    /// Attach the ping service to the shared endpoint.
    #[serde(default = "default_true")]
    expose_ping: bool,
}

fn default_true() -> bool {
    true
}

impl Default for HostInfoConfig {
    fn default() -> Self {
        Self { expose_ping: true }
    }
}

fn module_config(cfg: &AppConfig) -> anyhow::Result<HostInfoConfig> {
    match cfg.modules.get(MODULE_NAME) {
        Some(value) => serde_json::from_value(value.clone())
            .with_context(|| format!("invalid '{MODULE_NAME}' config")),
        None => Ok(HostInfoConfig::default()),
    }
}

/// Factory entry point: builds the module from the shared configuration.
pub fn new_module(cfg: &AppConfig) -> anyhow::Result<Box<dyn Module>> {
    let module_cfg = module_config(cfg)?;
    Ok(Box::new(HostInfo {
        hostname: read_hostname(),
        pid: std::process::id(),
        started_at: Instant::now(),
        expose_ping: module_cfg.expose_ping,
        pings_served: Arc::new(AtomicU64::new(0)),
    }))
}

pub struct HostInfo {
    hostname: Option<String>,
    pid: u32,
    started_at: Instant,
    expose_ping: bool,
    pings_served: Arc<AtomicU64>,
}

#[async_trait]
impl Module for HostInfo {
    fn stats(&self) -> ModuleStats {
        ModuleStats::from([
            ("hostname".to_string(), serde_json::json!(self.hostname)),
            ("pid".to_string(), serde_json::json!(self.pid)),
            (
                "uptime_secs".to_string(),
                serde_json::json!(self.started_at.elapsed().as_secs()),
            ),
            (
                "pings_served".to_string(),
                serde_json::json!(self.pings_served.load(Ordering::Relaxed)),
            ),
        ])
    }

    fn register(&self, routes: &mut RoutesBuilder) -> anyhow::Result<()> {
        if self.expose_ping {
            routes.add_service(PingService {
                served: Arc::clone(&self.pings_served),
            });
            tracing::debug!(service = PingService::NAME, "ping service attached");
        }
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        tracing::debug!("host_info closed");
        Ok(())
    }
}

fn read_hostname() -> Option<String> {
    std::fs::read_to_string("/proc/sys/kernel/hostname")
        .ok()
        .map(|s| s.trim().to_string())
        .or_else(|| std::env::var("HOSTNAME").ok())
        .filter(|s| !s.is_empty())
}

/// Liveness probe service, implemented by hand rather than from a proto:
/// every call is answered with an empty OK body and counted.
#[derive(Clone)]
struct PingService {
    served: Arc<AtomicU64>,
}

impl NamedService for PingService {
    const NAME: &'static str = "probehost.v1.HostInfo";
}

impl Service<Request<Body>> for PingService {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = future::Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: Request<Body>) -> Self::Future {
        self.served.fetch_add(1, Ordering::Relaxed);
        future::ready(Ok(Response::new(Body::empty())))
    }
}
