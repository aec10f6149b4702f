//! Shutdown signalling
//!
//! The logger runs until Ctrl+C. If the signal handler cannot be installed
//! the process keeps running and never requests shutdown.

use std::future::Future;
use std::io;
use tokio::sync::watch;
use tracing::{info, warn};

/// Spawn a task that flips the returned flag to `true` once `signal`
/// resolves. A failed `signal` leaves the flag `false` for good.
pub fn watch_for_shutdown<F>(signal: F) -> watch::Receiver<bool>
where
    F: Future<Output = io::Result<()>> + Send + 'static,
{
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match signal.await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down");
                let _ = tx.send(true);
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for Ctrl+C, stop the logger another way");
                // a dropped sender would read as shutdown on the receiving side
                let _tx = tx;
                std::future::pending::<()>().await;
            }
        }
    });
    rx
}
