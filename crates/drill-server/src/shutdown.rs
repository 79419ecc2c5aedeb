//! Graceful shutdown coordination.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Fans a single shutdown signal out to the accept loop and every live session.
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Clone of the cancellation token for a task to select on.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Signal all holders of the token.
    pub fn shutdown(&self) {
        info!("shutdown initiated");
        self.token.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Signal shutdown and wait for tasks, giving up after `timeout`.
    pub async fn graceful_shutdown(&self, handles: Vec<JoinHandle<()>>, timeout: Option<Duration>) {
        self.shutdown();
        let timeout = timeout.unwrap_or(Duration::from_secs(30));
        let all = futures::future::join_all(handles);
        if tokio::time::timeout(timeout, all).await.is_err() {
            warn!(timeout_secs = timeout.as_secs(), "shutdown timed out, abandoning tasks");
        } else {
            info!("graceful shutdown complete");
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
