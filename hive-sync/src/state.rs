//! Shared snapshot holder for the in-memory metadata graph
//!
//! The graph is replaced wholesale: readers clone an `Arc` to the current
//! snapshot and keep it for the duration of one operation, so they see
//! either the old or the new complete graph, never a partial one.

use hive_core::{HiveGraph, Status};
use parking_lot::RwLock;
use std::sync::Arc;

/// Copy-on-write holder of the current [`HiveGraph`].
#[derive(Debug)]
pub struct SharedHive {
    graph: RwLock<Arc<HiveGraph>>,
}

impl SharedHive {
    /// Start from an empty graph at revision zero
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            graph: RwLock::new(Arc::new(HiveGraph::empty())),
        })
    }

    /// The current snapshot
    pub fn snapshot(&self) -> Arc<HiveGraph> {
        Arc::clone(&self.graph.read())
    }

    /// Revision of the current snapshot
    pub fn revision(&self) -> i64 {
        self.graph.read().revision
    }

    /// Hive-wide status of the current snapshot
    pub fn status(&self) -> Status {
        self.graph.read().status
    }

    /// Atomically replace the snapshot.
    ///
    /// Refuses to move backwards: a reload that raced a newer one and lost
    /// is dropped, returning `false`. Equal revisions replace, so status
    /// flips at an unchanged revision take effect.
    pub fn swap(&self, next: HiveGraph) -> bool {
        let mut graph = self.graph.write();
        if next.revision < graph.revision {
            return false;
        }
        *graph = Arc::new(next);
        true
    }
}

impl Default for SharedHive {
    fn default() -> Self {
        Self {
            graph: RwLock::new(Arc::new(HiveGraph::empty())),
        }
    }
}
