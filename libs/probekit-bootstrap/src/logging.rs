use crate::config::LoggingConfig;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// ================= level helpers =================

fn parse_tracing_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

// ================= rotating writer for the file sink =================

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};

#[derive(Clone)]
struct RotWriter(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl<'a> fmt::MakeWriter<'a> for RotWriter {
    type Writer = RotWriterHandle;
    fn make_writer(&'a self) -> Self::Writer {
        RotWriterHandle(self.0.clone())
    }
}

#[derive(Clone)]
struct RotWriterHandle(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl Write for RotWriterHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        self.0.lock().unwrap().flush()
    }
}

fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn create_rotating_writer(
    log_path: &Path,
    max_bytes: usize,
    max_backups: Option<usize>,
) -> anyhow::Result<RotWriter> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let limit = FileLimit::MaxFiles(max_backups.unwrap_or(3));
    let rot = FileRotate::new(
        log_path,
        AppendTimestamp::default(limit),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        None,
    );

    Ok(RotWriter(Arc::new(Mutex::new(rot))))
}

// ================= public init =================

/// Install the global tracing subscriber: a console sink and, if configured,
/// a size-rotated file sink. Relative log file paths resolve against
/// `base_dir`.
///
/// With no logging section, falls back to console-only INFO honoring
/// `RUST_LOG`.
pub fn init_logging(cfg: Option<&LoggingConfig>, base_dir: &Path) {
    // Bridge `log` → `tracing` *before* installing the subscriber.
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("LogTracer init skipped: {e}");
    }

    let Some(cfg) = cfg else {
        init_minimal();
        return;
    };

    let console = parse_tracing_level(&cfg.console_level).map(|level| {
        fmt::layer()
            .with_ansi(std::io::stdout().is_terminal())
            .with_filter(LevelFilter::from_level(level))
    });

    let file = cfg.file.as_deref().and_then(|file| {
        let level_str = if cfg.file_level.is_empty() {
            "debug"
        } else {
            cfg.file_level.as_str()
        };
        let level = parse_tracing_level(level_str)?;

        let path = resolve_log_path(file, base_dir);
        let max_bytes = cfg.max_size_mb.unwrap_or(100) as usize * 1024 * 1024;
        match create_rotating_writer(&path, max_bytes, cfg.max_backups) {
            Ok(writer) => Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_filter(LevelFilter::from_level(level)),
            ),
            Err(e) => {
                eprintln!("failed to open log file {}: {e}", path.display());
                None
            }
        }
    });

    if let Err(e) = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
    {
        eprintln!("tracing subscriber init skipped: {e}");
    }
}

/// Console-only fallback: INFO unless `RUST_LOG` says otherwise.
fn init_minimal() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(e) = tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(std::io::stdout().is_terminal()))
        .with(filter)
        .try_init()
    {
        eprintln!("tracing subscriber init skipped: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_parse_case_insensitively() {
        assert_eq!(parse_tracing_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_tracing_level("warn"), Some(Level::WARN));
    }

    #[test]
    fn off_disables_the_sink() {
        assert_eq!(parse_tracing_level("off"), None);
        assert_eq!(parse_tracing_level("none"), None);
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        assert_eq!(parse_tracing_level("verbose"), Some(Level::INFO));
    }

    #[test]
    fn relative_paths_resolve_against_base_dir() {
        let p = resolve_log_path("logs/probehost.log", Path::new("/var/lib/probehost"));
        assert_eq!(p, PathBuf::from("/var/lib/probehost/logs/probehost.log"));
    }

    #[test]
    fn absolute_paths_are_kept() {
        let p = resolve_log_path("/tmp/p.log", Path::new("/var/lib/probehost"));
        assert_eq!(p, PathBuf::from("/tmp/p.log"));
    }
}
