use anyhow::Result;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Wait for termination signals (Ctrl+C, SIGTERM).
pub async fn wait_for_shutdown() -> Result<()> {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(%e, "Failed to install Ctrl+C handler");
            return Err(e);
        }
        Ok(())
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal_handler) => {
                signal_handler.recv().await;
                Ok(())
            }
            Err(e) => {
                tracing::error!(%e, "Failed to install SIGTERM handler");
                Err(e)
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = async { Ok::<(), std::io::Error>(()) };

    tokio::select! {
        result = ctrl_c => {
            result.map(|_| tracing::info!("Received Ctrl+C signal"))?;
        },
        result = terminate => {
            result.map(|_| tracing::info!("Received SIGTERM signal"))?;
        },
    }

    tracing::info!("Shutdown signal received, initiating graceful shutdown");
    Ok(())
}

/// Spawn a signal waiter and hand back the token it will cancel.
///
/// If the primary waiter fails to install its handlers we fall back to a
/// plain `ctrl_c()` wait rather than leaving the process unstoppable.
pub fn shutdown_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let c = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown().await {
            tracing::warn!(error = %e, "shutdown: primary waiter failed; falling back to ctrl_c()");
            let _ = signal::ctrl_c().await;
        }
        c.cancel();
    });
    cancel
}
