//! Connection acquisition against data nodes
//!
//! The hive hands out caller-owned connections to the node holding a key.
//! The actual driver sits behind [`ConnectionSource`]; the hive only decides
//! which node to talk to and whether the connection may write.

use async_trait::async_trait;
use hive_core::{HiveError, ObjectId, Result};
use parking_lot::RwLock;
use std::fmt::Debug;
use std::sync::Arc;

/// What the caller intends to do with the connection.
///
/// `Copy` — small enum, pass by value at call sites.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessType {
    /// Read-only access; permitted regardless of lock state
    Read,
    /// Read-write access; requires hive, node, and key to be writable
    ReadWrite,
}

/// A caller-owned connection to one data node.
///
/// The hive does not pool or release these; scoped acquisition with
/// guaranteed release is the caller's responsibility.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeConnection {
    /// Id of the node this connection points at
    pub node_id: ObjectId,
    /// Connect string the connection was opened against
    pub uri: String,
    /// True if the connection was opened in read-only mode
    pub read_only: bool,
}

/// Opens connections against node URIs.
#[async_trait]
pub trait ConnectionSource: Send + Sync + Debug {
    /// Open a connection to `uri`, in read-only mode if requested.
    ///
    /// Driver failures surface as `Persistence`.
    async fn open(&self, uri: &str, read_only: bool) -> Result<NodeConnection>;
}

/// In-memory connection source for testing.
///
/// Records every open and can be told to fail, following the mock-client
/// pattern used in the sync tests.
#[derive(Debug, Default)]
pub struct MemoryConnectionSource {
    opened: RwLock<Vec<(String, bool)>>,
    fail: RwLock<bool>,
}

impl MemoryConnectionSource {
    /// Create a source that succeeds every open
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every subsequent open fail (or succeed again)
    pub fn set_failing(&self, fail: bool) {
        *self.fail.write() = fail;
    }

    /// Every `(uri, read_only)` pair opened so far
    pub fn opened(&self) -> Vec<(String, bool)> {
        self.opened.read().clone()
    }
}

#[async_trait]
impl ConnectionSource for MemoryConnectionSource {
    async fn open(&self, uri: &str, read_only: bool) -> Result<NodeConnection> {
        if *self.fail.read() {
            return Err(HiveError::persistence(format!(
                "connection to {} refused",
                uri
            )));
        }
        self.opened.write().push((uri.to_string(), read_only));
        Ok(NodeConnection {
            node_id: hive_core::NEW_OBJECT_ID,
            uri: uri.to_string(),
            read_only,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_source_records_opens() {
        let source = MemoryConnectionSource::new();
        source.open("db://a", true).await.unwrap();
        source.open("db://b", false).await.unwrap();
        assert_eq!(
            source.opened(),
            vec![("db://a".to_string(), true), ("db://b".to_string(), false)]
        );
    }

    #[tokio::test]
    async fn test_memory_source_failure_injection() {
        let source = MemoryConnectionSource::new();
        source.set_failing(true);
        assert!(source.open("db://a", false).await.is_err());
        source.set_failing(false);
        assert!(source.open("db://a", false).await.is_ok());
    }
}
