//! The factory table: every module this server can host, in startup order.
//!
//! Order matters: it is the order modules are constructed and attached to
//! the shared endpoint. New modules are added here.

use probekit::contracts::Factory;
use probekit_bootstrap::AppConfig;

pub fn factories() -> Vec<Factory<AppConfig>> {
    vec![
        Factory {
            name: host_info::MODULE_NAME,
            create: host_info::new_module,
        },
        Factory {
            name: proc_stats::MODULE_NAME,
            create: proc_stats::new_module,
        },
    ]
}
