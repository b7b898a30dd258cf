//! The sync daemon: revision comparison and periodic full reload
//!
//! Cooperating processes share a hive by bumping the persisted semaphore
//! revision on every metadata mutation. The synchronizer compares that
//! revision against the locally cached snapshot and, when they diverge,
//! reloads the whole graph and swaps it in atomically. A background task
//! runs the same routine on a timer; errors are logged and the next tick
//! retries.

use crate::loader::load_graph;
use crate::state::SharedHive;
use hive_core::Result;
use hive_directory::MetadataGateways;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Default background sync period.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of one synchronization pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Persisted revision matched the cached snapshot; nothing reloaded
    Unchanged {
        revision: i64,
    },
    /// The graph was reloaded and swapped in
    Reloaded {
        from_revision: i64,
        to_revision: i64,
    },
}

/// Event broadcast after a successful reload. Best-effort, in-process only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncEvent {
    /// A new graph snapshot was swapped in
    GraphReloaded {
        from_revision: i64,
        to_revision: i64,
    },
}

/// Handle to a spawned background sync task.
///
/// Dropping the handle stops the task; [`SyncHandle::shutdown`] stops it and
/// waits for it to finish.
#[derive(Debug)]
pub struct SyncHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Signal the task to stop and wait for it to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// Reconciles the in-memory graph with the persisted gateways.
#[derive(Debug)]
pub struct Synchronizer {
    gateways: MetadataGateways,
    state: Arc<SharedHive>,
    events: broadcast::Sender<SyncEvent>,
}

impl Synchronizer {
    /// Create a synchronizer over the given gateways and shared state
    pub fn new(gateways: MetadataGateways, state: Arc<SharedHive>) -> Arc<Self> {
        // Small buffer; consumers should treat events as best-effort.
        let (events, _) = broadcast::channel(32);
        Arc::new(Self {
            gateways,
            state,
            events,
        })
    }

    /// The shared state this synchronizer maintains
    pub fn state(&self) -> &Arc<SharedHive> {
        &self.state
    }

    /// Subscribe to reload events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Compare the persisted revision against the cached snapshot and reload
    /// when they diverge.
    ///
    /// Returns without touching the graph when revision and status both
    /// match. Two concurrent calls converge to the same final graph: the
    /// swap refuses to move backwards in revision.
    pub async fn force_synchronize(&self) -> Result<SyncOutcome> {
        let cached = self.state.snapshot();
        if let Some(persisted) = self.gateways.semaphore.load_semaphore().await? {
            if persisted.revision == cached.revision && persisted.status == cached.status {
                return Ok(SyncOutcome::Unchanged {
                    revision: cached.revision,
                });
            }
        }
        // Revision diverged (or schema just appeared): full reload.
        let graph = load_graph(&self.gateways).await?;
        let to_revision = graph.revision;
        let from_revision = cached.revision;
        if self.state.swap(graph) {
            tracing::debug!(from_revision, to_revision, "hive metadata reloaded");
            let _ = self.events.send(SyncEvent::GraphReloaded {
                from_revision,
                to_revision,
            });
        }
        Ok(SyncOutcome::Reloaded {
            from_revision,
            to_revision,
        })
    }

    /// Spawn the periodic background sync task.
    ///
    /// Any error is logged and swallowed; the next tick retries.
    pub fn spawn(self: &Arc<Self>, interval: Duration) -> SyncHandle {
        let synchronizer = Arc::clone(self);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            return;
                        }
                    }
                }
                if let Err(e) = synchronizer.force_synchronize().await {
                    tracing::warn!("hive sync tick failed: {}", e);
                }
            }
        });
        SyncHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}
