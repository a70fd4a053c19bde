//! Cancellable worker tasks.
//!
//! Every player runs its frame loop in a [`WorkerTask`]: a spawned
//! future paired with the [`CancellationToken`] it was handed at spawn.
//! Stopping a worker means cancelling the token and joining the handle.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::PlayerError;

/// Events a worker reports when it leaves its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    /// The loop was cancelled from outside.
    Cancelled,
    /// The loop ran out of frames on its own.
    Finished,
}

/// A spawned loop and its cancellation token. `T` is what the loop
/// hands back when it exits.
pub struct WorkerTask<T = TaskEvent> {
    name: &'static str,
    cancel: CancellationToken,
    handle: JoinHandle<T>,
}

impl<T> WorkerTask<T>
where
    T: Send + 'static,
{
    /// Spawns `f` on the runtime with a fresh child of `parent`.
    ///
    /// # Arguments
    ///
    /// * `name` - Label used in logs.
    /// * `parent` - Cancelling this also cancels the worker.
    /// * `f` - Receives the worker's own token and runs the loop.
    pub fn spawn<F, Fut>(name: &'static str, parent: &CancellationToken, f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let cancel = parent.child_token();
        let handle = tokio::spawn(f(cancel.clone()));
        debug!(worker = name, "worker spawned");
        Self {
            name,
            cancel,
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal the worker to stop without waiting for it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the worker to leave its loop.
    pub async fn join(self) -> Result<T, PlayerError> {
        match self.handle.await {
            Ok(output) => {
                debug!(worker = self.name, "worker joined");
                Ok(output)
            }
            Err(e) => {
                warn!(worker = self.name, error = %e, "worker did not finish cleanly");
                Err(e.into())
            }
        }
    }

    /// Cancel, then join.
    pub async fn stop(self) -> Result<T, PlayerError> {
        self.cancel();
        self.join().await
    }
}
