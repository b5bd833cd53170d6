use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use probekit::loader::Loader;
use probekit_bootstrap::{AppConfig, CliArgs};
use std::path::{Path, PathBuf};
use tonic::service::RoutesBuilder;
use tonic::transport::Server;

mod factories;

/// Probehost Server - host probe with pluggable collector modules
#[derive(Parser)]
#[command(name = "probehost-server")]
#[command(about = "Probehost Server - host probe with pluggable collector modules")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override for the gRPC server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // Layered config: defaults -> YAML (if provided) -> env (PROBEHOST__*)
    // -> CLI overrides.
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    probekit_bootstrap::logging::init_logging(config.logging.as_ref(), Path::new("."));

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(config),
    }
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!("Probehost Server starting");

    let addr = config.server.listen_addr()?;
    let cancel = probekit_bootstrap::signals::shutdown_token();

    // Registration pass: construct every module against the shared config
    // and attach it to the shared route set. Any failure aborts startup.
    let mut routes = RoutesBuilder::default();
    let mut loader = Loader::new();
    loader
        .register(&config, &mut routes, &factories::factories())
        .context("module startup failed")?;
    tracing::info!(modules = ?loader.module_names(), "all modules started");

    tracing::info!(%addr, "serving gRPC");
    let shutdown = cancel.clone();
    Server::builder()
        .add_routes(routes.routes())
        .serve_with_shutdown(addr, async move {
            shutdown.cancelled().await;
        })
        .await
        .context("gRPC server failed")?;

    // The server has drained; snapshot the modules once more, then close
    // them. Close failures are reported but no longer block exit.
    match serde_json::to_string(&loader.stats()) {
        Ok(summary) => tracing::info!(stats = %summary, "final module stats"),
        Err(e) => tracing::debug!(error = %e, "failed to serialize final stats"),
    }

    if let Err(err) = loader.close().await {
        tracing::error!(
            failed = err.failures.len(),
            "shutdown completed with module close failures"
        );
    }

    tracing::info!("Probehost Server stopped");
    Ok(())
}

fn check_config(config: AppConfig) -> Result<()> {
    let addr = config.server.listen_addr()?;
    println!("Configuration is valid (listen address {addr})");
    println!("{}", config.to_yaml()?);
    Ok(())
}
