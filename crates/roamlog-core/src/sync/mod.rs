//! Queue drain against the remote system.

use serde::Serialize;

use crate::connectivity::Connectivity;
use crate::error::Result;
use crate::queue::OfflineQueue;
use crate::remote::TripsRemote;
use crate::storage::KeyValueStore;

/// Aggregate result of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub synced: usize,
    pub failed: usize,
}

/// Replays queued mutations when connectivity is available.
///
/// One pass per invocation; the host re-invokes on connectivity-regain
/// or periodically. The coordinator never touches the trip cache —
/// cache consistency is the facade's concern.
pub struct SyncCoordinator<S, C, R> {
    queue: OfflineQueue<S>,
    connectivity: C,
    remote: R,
}

impl<S, C, R> SyncCoordinator<S, C, R>
where
    S: KeyValueStore,
    C: Connectivity,
    R: TripsRemote,
{
    pub const fn new(queue: OfflineQueue<S>, connectivity: C, remote: R) -> Self {
        Self {
            queue,
            connectivity,
            remote,
        }
    }

    /// Walk the queue once, strictly in FIFO order.
    ///
    /// Offline is a no-op, not an error. A failed action stays queued
    /// (with its attempt recorded) and does not block later actions —
    /// best-effort per action, not ordering-with-abort.
    pub async fn sync_queue(&self) -> Result<SyncReport> {
        if !self.connectivity.is_online().await {
            return Ok(SyncReport::default());
        }

        let actions = self.queue.list().await?;
        if actions.is_empty() {
            return Ok(SyncReport::default());
        }

        tracing::info!("Replaying {} queued action(s)", actions.len());

        let mut report = SyncReport::default();
        for action in actions {
            match self.remote.replay(&action).await {
                Ok(()) => {
                    self.queue.remove(&action.id).await?;
                    report.synced += 1;
                    tracing::debug!(kind = %action.kind, endpoint = %action.endpoint, "Replayed queued action");
                }
                Err(error) => {
                    report.failed += 1;
                    let dead_lettered = self.queue.record_failure(&action.id).await?;
                    if dead_lettered {
                        tracing::warn!(
                            kind = %action.kind,
                            endpoint = %action.endpoint,
                            "Gave up on queued action after repeated failures: {error}"
                        );
                    } else {
                        tracing::warn!(
                            kind = %action.kind,
                            endpoint = %action.endpoint,
                            "Queued action replay failed, will retry: {error}"
                        );
                    }
                }
            }
        }

        Ok(report)
    }
}
