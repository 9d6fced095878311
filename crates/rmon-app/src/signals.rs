//! Shutdown on SIGINT/SIGTERM (Ctrl+C on Windows)

use std::future::Future;

use tokio_util::sync::CancellationToken;

use rmon_core::prelude::*;

/// Cancel `token` when a shutdown signal arrives.
///
/// Handlers are installed before returning, so a setup failure is reported
/// to the caller. Must be called from within a tokio runtime.
pub fn cancel_on_shutdown_signal(token: CancellationToken) -> Result<()> {
    let signal = shutdown_signal()?;
    tokio::spawn(async move {
        tokio::select! {
            name = signal => {
                info!("Received {}, shutting down", name);
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    });
    Ok(())
}

#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = &'static str>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())
        .map_err(|e| Error::signal(format!("SIGINT handler: {}", e)))?;
    let mut terminate = signal(SignalKind::terminate())
        .map_err(|e| Error::signal(format!("SIGTERM handler: {}", e)))?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
        }
    })
}

#[cfg(windows)]
fn shutdown_signal() -> Result<impl Future<Output = &'static str>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "Ctrl+C",
            Err(e) => {
                error!("Ctrl+C handler: {}", e);
                std::future::pending::<&'static str>().await
            }
        }
    })
}
