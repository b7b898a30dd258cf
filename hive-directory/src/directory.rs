//! The per-dimension key-routing directory
//!
//! One directory per partition dimension owns three families of tables:
//!
//! | Table | Key | Value |
//! |---|---|---|
//! | `primary_index` | partition key | node id, read-only flag, last updated |
//! | `resource_index_{R}` | resource id | partition key, last updated |
//! | `secondary_index_{R}.{S}` | secondary key | resource id, last updated |
//!
//! Directory operations are mechanical: they enforce row uniqueness and
//! referential checks but never consult the lock engine. Writability
//! enforcement lives in the facade.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hive_core::{KeySemaphore, KeyValue, Node, ObjectId, PartitionDimension, Resource, Result, SecondaryIndex};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

/// One row of a dimension's `primary_index` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryIndexRow {
    /// Node holding this partition key
    pub node_id: ObjectId,
    /// Per-key read-only flag
    pub read_only: bool,
    /// When this row last changed
    pub last_updated: DateTime<Utc>,
}

impl PrimaryIndexRow {
    /// A fresh writable row on the given node
    pub fn new(node_id: ObjectId) -> Self {
        Self {
            node_id,
            read_only: false,
            last_updated: Utc::now(),
        }
    }

    /// The semaphore view of this row
    pub fn semaphore(&self) -> KeySemaphore {
        KeySemaphore::new(self.node_id, hive_core::Status::from_read_only(self.read_only))
    }
}

/// One row of a `resource_index_{R}` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIndexRow {
    /// Partition key this resource id lives under
    pub primary_key: KeyValue,
    /// When this row last changed
    pub last_updated: DateTime<Utc>,
}

impl ResourceIndexRow {
    /// A fresh row pointing at the given partition key
    pub fn new(primary_key: KeyValue) -> Self {
        Self {
            primary_key,
            last_updated: Utc::now(),
        }
    }
}

/// One row of a `secondary_index_{R}.{S}` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryIndexRow {
    /// Resource id this secondary key points at
    pub resource_id: KeyValue,
    /// When this row last changed
    pub last_updated: DateTime<Utc>,
}

impl SecondaryIndexRow {
    /// A fresh row pointing at the given resource id
    pub fn new(resource_id: KeyValue) -> Self {
        Self {
            resource_id,
            last_updated: Utc::now(),
        }
    }
}

/// Key-routing operations for one partition dimension.
#[async_trait]
pub trait Directory: Send + Sync + Debug {
    /// Add a `(key, node, writable)` row to the primary index.
    ///
    /// Fails `DuplicateKey` if any row already exists for the key.
    async fn insert_primary_index_key(&self, node: &Node, key: &KeyValue) -> Result<()>;

    /// Add a resource row binding `resource_id` to `primary_key`.
    ///
    /// No-op for partitioning resources (their id *is* the partition key).
    /// Fails `MissingParent` if `primary_key` has no primary row, and
    /// `DuplicateKey` if the resource id is already present.
    async fn insert_resource_id(
        &self,
        resource: &Resource,
        resource_id: &KeyValue,
        primary_key: &KeyValue,
    ) -> Result<()>;

    /// Add a secondary row binding `secondary_key` to `resource_id`.
    ///
    /// Fails `MissingParent` if the resource id is unknown, and
    /// `DuplicateKey` if the `(secondary_key, resource_id)` pair already
    /// exists.
    async fn insert_secondary_index_key(
        &self,
        index: &SecondaryIndex,
        resource: &Resource,
        secondary_key: &KeyValue,
        resource_id: &KeyValue,
    ) -> Result<()>;

    /// Semaphores of a partition key; empty signals an unknown key
    async fn key_semaphores_of_primary_index_key(&self, key: &KeyValue)
        -> Result<Vec<KeySemaphore>>;

    /// Semaphores of a resource id.
    ///
    /// For a partitioning resource this defers to the primary lookup with
    /// the id as the partition key; otherwise it joins
    /// resource id → partition key → semaphores.
    async fn key_semaphores_of_resource_id(
        &self,
        resource: &Resource,
        resource_id: &KeyValue,
    ) -> Result<Vec<KeySemaphore>>;

    /// Semaphores of a secondary key, joining
    /// secondary key → resource ids → partition keys → semaphores.
    ///
    /// May return multiple semaphores when the secondary key points at
    /// multiple resources.
    async fn key_semaphores_of_secondary_index_key(
        &self,
        index: &SecondaryIndex,
        resource: &Resource,
        secondary_key: &KeyValue,
    ) -> Result<Vec<KeySemaphore>>;

    /// The partition key a resource id lives under, if the row exists.
    ///
    /// Identity for partitioning resources.
    async fn primary_index_key_of_resource_id(
        &self,
        resource: &Resource,
        resource_id: &KeyValue,
    ) -> Result<Option<KeyValue>>;

    /// All resource ids of a resource living under a partition key
    async fn resource_ids_of_primary_index_key(
        &self,
        resource: &Resource,
        key: &KeyValue,
    ) -> Result<Vec<KeyValue>>;

    /// All secondary keys of an index pointing at a resource id
    async fn secondary_index_keys_of_resource_id(
        &self,
        index: &SecondaryIndex,
        resource_id: &KeyValue,
    ) -> Result<Vec<KeyValue>>;

    /// True if the partition key has at least one primary row
    async fn does_primary_index_key_exist(&self, key: &KeyValue) -> Result<bool>;

    /// True if the resource id has a row (primary row for partitioning
    /// resources)
    async fn does_resource_id_exist(
        &self,
        resource: &Resource,
        resource_id: &KeyValue,
    ) -> Result<bool>;

    /// True if the `(secondary_key, resource_id)` pair exists in the index
    async fn does_secondary_index_key_exist(
        &self,
        index: &SecondaryIndex,
        secondary_key: &KeyValue,
        resource_id: &KeyValue,
    ) -> Result<bool>;

    /// Flip the read-only flag on every primary row of the key.
    ///
    /// Fails `NotFound` for an unknown key.
    async fn update_primary_index_key_read_only(
        &self,
        key: &KeyValue,
        read_only: bool,
    ) -> Result<()>;

    /// Repoint a resource id at a new partition key.
    ///
    /// Fails `NotFound` if the resource row is absent and `MissingParent` if
    /// the new partition key has no primary row.
    async fn update_primary_index_key_of_resource_id(
        &self,
        resource: &Resource,
        resource_id: &KeyValue,
        new_primary_key: &KeyValue,
    ) -> Result<()>;

    /// Remove all primary rows of a key. Fails `NotFound` if absent.
    async fn delete_primary_index_key(&self, key: &KeyValue) -> Result<()>;

    /// Remove a resource row. Fails `NotFound` if absent.
    async fn delete_resource_id(&self, resource: &Resource, resource_id: &KeyValue) -> Result<()>;

    /// Remove one `(secondary_key, resource_id)` pair. Fails `NotFound` if
    /// absent.
    async fn delete_secondary_index_key(
        &self,
        index: &SecondaryIndex,
        secondary_key: &KeyValue,
        resource_id: &KeyValue,
    ) -> Result<()>;

    /// Remove every secondary row (across all of the resource's indexes)
    /// pointing at a resource id. Idempotent.
    async fn delete_all_secondary_index_keys_of_resource_id(
        &self,
        resource: &Resource,
        resource_id: &KeyValue,
    ) -> Result<()>;
}

/// Opens per-dimension [`Directory`] handles over shared storage.
///
/// Handles opened for the same dimension at different times see the same
/// rows; the synchronizer re-opens directories as dimensions come and go.
pub trait DirectoryProvider: Send + Sync + Debug {
    /// Open (or re-open) the directory of a dimension
    fn open(&self, dimension: &PartitionDimension) -> Arc<dyn Directory>;

    /// Drop the directory tables of a deleted dimension
    fn discard(&self, dimension_name: &str);
}
