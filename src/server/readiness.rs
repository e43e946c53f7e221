//! Readiness state
//!
//! The service starts `NotReady` and becomes `Ready` once a fixed warm-up
//! delay has passed. The transition happens once and is never undone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// Default warm-up delay before the readiness probe turns positive
pub const DEFAULT_WARMUP: Duration = Duration::from_secs(15);

/// Shared readiness flag.
///
/// Cloning yields a handle to the same flag. Only the warm-up task writes it.
#[derive(Debug, Clone, Default)]
pub struct Readiness {
    ready: Arc<AtomicBool>,
}

impl Readiness {
    /// A flag in the `NotReady` state
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Flip to `Ready`. Later calls are no-ops.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }
}

/// Spawn the warm-up timer.
///
/// After `delay` the flag is marked ready. If `shutdown` flips to true first,
/// the task exits and the flag stays `NotReady`.
pub fn spawn_warmup(
    readiness: Readiness,
    delay: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Readiness probe is negative for the next {:?}", delay);

        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                readiness.mark_ready();
                info!("Readiness probe is positive");
            }
            Ok(_) = shutdown.wait_for(|stop| *stop) => {
                info!("Warm-up cancelled by shutdown");
            }
        }
    })
}
