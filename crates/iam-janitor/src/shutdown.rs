//! Run cancellation on deadline or termination signal
//!
//! Both paths cancel the same [`CancellationToken`]. In-flight deletions
//! finish, anything not yet started is skipped and the run reports a partial
//! result instead of being killed midway.

use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Why a run was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Deadline,
    Signal,
}

/// Cancel `token` once `deadline` elapses or `trigger` completes, whichever
/// comes first. Returns immediately if the token is cancelled elsewhere.
pub async fn cancel_on<F>(
    token: CancellationToken,
    deadline: Duration,
    trigger: F,
) -> Option<CancelReason>
where
    F: Future<Output = ()>,
{
    let reason = tokio::select! {
        biased;
        _ = token.cancelled() => return None,
        _ = tokio::time::sleep(deadline) => {
            warn!(deadline_secs = deadline.as_secs(), "Deadline reached, cancelling run");
            CancelReason::Deadline
        }
        _ = trigger => {
            warn!("Termination requested, cancelling run");
            CancelReason::Signal
        }
    };
    token.cancel();
    Some(reason)
}

/// Spawn the watcher for the process: deadline plus SIGINT/SIGTERM.
pub fn install(token: CancellationToken, deadline: Duration) {
    tokio::spawn(cancel_on(token, deadline, shutdown_signal()));
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
