//! Proc Stats Module
//!
//! Samples process counters from `/proc/self` on every stats snapshot:
//! resident/virtual memory, thread count and (optionally) open file
//! descriptors. Exposes no RPC surface of its own. On platforms without
//! procfs the snapshot degrades to a `supported: false` marker.

use anyhow::Context;
use async_trait::async_trait;
use probekit::contracts::{Module, ModuleStats};
use probekit_bootstrap::AppConfig;
use serde::Deserialize;
use tonic::service::RoutesBuilder;

pub const MODULE_NAME: &str = "proc_stats";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProcStatsConfig {
    /// Count entries of /proc/self/fd in each snapshot.
    #[serde(default = "default_true")]
    include_fds: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ProcStatsConfig {
    fn default() -> Self {
        Self { include_fds: true }
    }
}

/// Factory entry point: builds the module from the shared configuration.
pub fn new_module(cfg: &AppConfig) -> anyhow::Result<Box<dyn Module>> {
    let module_cfg = match cfg.modules.get(MODULE_NAME) {
        Some(value) => serde_json::from_value(value.clone())
            .with_context(|| format!("invalid '{MODULE_NAME}' config"))?,
        None => ProcStatsConfig::default(),
    };
    Ok(Box::new(ProcStats {
        include_fds: module_cfg.include_fds,
    }))
}

pub struct ProcStats {
    include_fds: bool,
}

#[async_trait]
impl Module for ProcStats {
    fn stats(&self) -> ModuleStats {
        let mut stats = ModuleStats::new();

        if !cfg!(target_os = "linux") {
            stats.insert("supported".to_string(), serde_json::json!(false));
            return stats;
        }
        stats.insert("supported".to_string(), serde_json::json!(true));

        match std::fs::read_to_string("/proc/self/status") {
            Ok(status) => {
                for (key, value) in parse_status(&status) {
                    stats.insert(key, serde_json::json!(value));
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "failed to read /proc/self/status");
            }
        }

        if self.include_fds {
            if let Ok(entries) = std::fs::read_dir("/proc/self/fd") {
                stats.insert(
                    "open_fds".to_string(),
                    serde_json::json!(entries.count()),
                );
            }
        }

        stats
    }

    fn register(&self, _routes: &mut RoutesBuilder) -> anyhow::Result<()> {
        // Stats-only module, nothing to attach.
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        tracing::debug!("proc_stats closed");
        Ok(())
    }
}

/// Pick the interesting counters out of /proc/self/status.
///
/// Values are returned in the unit procfs reports them in: kB for the
/// memory rows, a plain count for Threads.
fn parse_status(status: &str) -> Vec<(String, u64)> {
    let mut out = Vec::new();
    for line in status.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let stat_name = match key {
            "VmRSS" => "vm_rss_kb",
            "VmSize" => "vm_size_kb",
            "Threads" => "threads",
            _ => continue,
        };
        let value = rest
            .trim()
            .trim_end_matches("kB")
            .trim()
            .parse::<u64>()
            .ok();
        if let Some(value) = value {
            out.push((stat_name.to_string(), value));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_memory_and_thread_rows() {
        let status = "\
Name:\tprobehost-server
VmSize:\t  123456 kB
VmRSS:\t   7890 kB
Threads:\t8
VoluntaryCtxtSwitches:\t42
";
        let parsed = parse_status(status);
        assert!(parsed.contains(&("vm_size_kb".to_string(), 123_456)));
        assert!(parsed.contains(&("vm_rss_kb".to_string(), 7_890)));
        assert!(parsed.contains(&("threads".to_string(), 8)));
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let parsed = parse_status("VmRSS: not-a-number kB\nno colon here\n");
        assert!(parsed.is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn live_snapshot_reports_own_process() {
        let module = new_module(&AppConfig::default()).expect("module should build");
        let stats = module.stats();

        assert_eq!(stats["supported"], serde_json::json!(true));
        assert!(stats.contains_key("vm_rss_kb"));
        assert!(stats.contains_key("open_fds"));
    }

    #[test]
    fn fds_can_be_disabled() {
        let mut cfg = AppConfig::default();
        cfg.modules.insert(
            MODULE_NAME.to_string(),
            serde_json::json!({"include_fds": false}),
        );
        let module = new_module(&cfg).expect("module should build");
        assert!(!module.stats().contains_key("open_fds"));
    }

    #[test]
    fn register_is_a_no_op() {
        let module = new_module(&AppConfig::default()).unwrap();
        let mut routes = RoutesBuilder::default();
        module.register(&mut routes).expect("register should succeed");
    }
}
