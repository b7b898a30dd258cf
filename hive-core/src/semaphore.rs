//! Semaphore records: per-key and hive-wide coordination state

use crate::ids::ObjectId;
use crate::status::{Lockable, Status};
use serde::{Deserialize, Serialize};

/// Status record binding one partition key to one node.
///
/// A primary key maps to at least one semaphore; secondary keys inherit
/// semaphores transitively through their resource row. A key is effectively
/// read-only when any of its semaphores (or their nodes, or the hive) is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeySemaphore {
    /// Id of the node holding the key
    pub node_id: ObjectId,
    /// Writability of this key on that node
    pub status: Status,
}

impl KeySemaphore {
    /// Create a new semaphore
    pub fn new(node_id: ObjectId, status: Status) -> Self {
        Self { node_id, status }
    }
}

impl Lockable for KeySemaphore {
    fn status(&self) -> Status {
        self.status
    }
}

/// The global coordination record: revision counter plus hive-wide status.
///
/// A single row in the hive metadata database. The revision is bumped exactly
/// once per metadata mutation committed through the facade; cooperating
/// processes compare it against their cached value to detect change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiveSemaphore {
    /// Monotonically non-decreasing change counter
    pub revision: i64,
    /// Hive-wide writability
    pub status: Status,
}

impl HiveSemaphore {
    /// Create a new semaphore record
    pub fn new(revision: i64, status: Status) -> Self {
        Self { revision, status }
    }

    /// Initial record for a freshly installed hive
    pub fn initial() -> Self {
        Self {
            revision: 0,
            status: Status::Writable,
        }
    }

    /// Bump the revision by one
    pub fn increment_revision(&mut self) {
        self.revision += 1;
    }
}

impl Lockable for HiveSemaphore {
    fn status(&self) -> Status {
        self.status
    }
}
