//! Serving until a shutdown signal, then draining within a grace period

use std::future::Future;
use std::io;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{error, info, warn};

/// Default time in-flight requests get to finish after a shutdown signal
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("HTTP server failed: {0}")]
    Server(#[from] io::Error),

    #[error("In-flight requests did not finish within {0:?}")]
    GraceExpired(Duration),

    #[error("HTTP server task failed: {0}")]
    Join(#[from] JoinError),
}

/// Resolves on SIGTERM or SIGINT.
///
/// The handlers are installed when this is called, not when the returned
/// future is first polled.
#[cfg(unix)]
pub fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, initiating graceful shutdown");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, initiating graceful shutdown");
            }
        }
    })
}

/// Resolves on Ctrl+C
#[cfg(not(unix))]
pub fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    })
}

/// Serve `app` on `listener` until `signal` resolves.
///
/// On the signal, `shutdown_tx` is flipped to true (background tasks watching
/// it stop), the listener stops accepting and in-flight requests get `grace`
/// to complete. Connections still open after that are dropped and the call
/// returns [`LifecycleError::GraceExpired`].
pub async fn run_until_shutdown<F>(
    listener: TcpListener,
    app: Router,
    signal: F,
    shutdown_tx: watch::Sender<bool>,
    grace: Duration,
) -> Result<(), LifecycleError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let mut stop = shutdown_tx.subscribe();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.wait_for(|stop| *stop).await;
            })
            .await
    });

    tokio::select! {
        _ = signal => {}
        result = &mut server => {
            // Server ended without being asked to
            shutdown_tx.send_replace(true);
            result??;
            warn!("HTTP server stopped before a shutdown signal");
            return Ok(());
        }
    }

    shutdown_tx.send_replace(true);
    info!("Draining in-flight requests for up to {:?}", grace);

    match tokio::time::timeout(grace, &mut server).await {
        Ok(result) => {
            result??;
            info!("Shutdown complete");
            Ok(())
        }
        Err(_) => {
            server.abort();
            error!("Grace period of {:?} expired, closing remaining connections", grace);
            Err(LifecycleError::GraceExpired(grace))
        }
    }
}
