//! Name-resolving, lock-enforcing wrapper around one dimension's directory
//!
//! The directory itself is mechanical; this facade resolves resource and
//! index names against the current graph snapshot and runs the lock engine
//! before every mutating call. One facade per partition dimension.

use hive_core::{
    lock, Assigner, HiveError, HiveStats, KeySemaphore, KeyValue, Node, ObjectId,
    PartitionDimension, Resource, Result, SecondaryIndex,
};
use hive_directory::Directory;
use hive_sync::SharedHive;
use std::sync::Arc;

/// Per-dimension directory operations with names instead of entities.
#[derive(Clone, Debug)]
pub struct DirectoryFacade {
    dimension: String,
    state: Arc<SharedHive>,
    directory: Arc<dyn Directory>,
    assigner: Arc<dyn Assigner>,
    stats: Option<Arc<HiveStats>>,
}

impl DirectoryFacade {
    pub(crate) fn new(
        dimension: impl Into<String>,
        state: Arc<SharedHive>,
        directory: Arc<dyn Directory>,
        assigner: Arc<dyn Assigner>,
        stats: Option<Arc<HiveStats>>,
    ) -> Self {
        Self {
            dimension: dimension.into(),
            state,
            directory,
            assigner,
            stats,
        }
    }

    /// Name of the dimension this facade routes
    pub fn dimension(&self) -> &str {
        &self.dimension
    }

    /// The mechanical directory underneath
    pub fn directory(&self) -> &Arc<dyn Directory> {
        &self.directory
    }

    fn record_read(&self) {
        if let Some(stats) = &self.stats {
            stats.record_directory_read();
        }
    }

    fn record_write(&self) {
        if let Some(stats) = &self.stats {
            stats.record_directory_write();
        }
    }

    fn with_dimension<T>(
        &self,
        f: impl FnOnce(&PartitionDimension) -> Result<T>,
    ) -> Result<T> {
        let snapshot = self.state.snapshot();
        f(snapshot.require_dimension(&self.dimension)?)
    }

    fn resolve_resource(&self, resource: &str) -> Result<Resource> {
        self.with_dimension(|dim| {
            dim.resource(resource).cloned().ok_or_else(|| {
                HiveError::not_found(format!(
                    "resource '{}' in partition dimension '{}'",
                    resource, self.dimension
                ))
            })
        })
    }

    fn resolve_secondary_index(
        &self,
        resource: &str,
        index: &str,
    ) -> Result<(Resource, SecondaryIndex)> {
        let resource = self.resolve_resource(resource)?;
        let index = resource.secondary_index(index).cloned().ok_or_else(|| {
            HiveError::not_found(format!(
                "secondary index '{}' on resource '{}'",
                index, resource.name
            ))
        })?;
        Ok((resource, index))
    }

    /// Lock check across hive, node, and key scopes for a semaphore set
    fn require_writable(
        &self,
        semaphores: &[KeySemaphore],
        key: &KeyValue,
        operation: &str,
    ) -> Result<()> {
        let snapshot = self.state.snapshot();
        let dimension = snapshot.require_dimension(&self.dimension)?;
        lock::require_semaphores_writable(
            snapshot.status,
            semaphores,
            |id| dimension.node_by_id(id),
            key,
            operation,
        )
    }

    /// Lock check across hive and node scopes only.
    ///
    /// Used when flipping a key's own read-only flag, which must be allowed
    /// while the key is read-only.
    fn require_nodes_writable(
        &self,
        semaphores: &[KeySemaphore],
        operation: &str,
    ) -> Result<()> {
        let snapshot = self.state.snapshot();
        let dimension = snapshot.require_dimension(&self.dimension)?;
        lock::require_hive_writable(snapshot.status, operation)?;
        for semaphore in semaphores {
            let node = dimension.node_by_id(semaphore.node_id).ok_or_else(|| {
                HiveError::not_found(format!(
                    "{}: node id {} is not in dimension '{}'",
                    operation, semaphore.node_id, self.dimension
                ))
            })?;
            lock::require_node_writable(node, operation)?;
        }
        Ok(())
    }

    /// Insert a new partition key: choose a writable node and add the row.
    pub async fn insert_primary_index_key(&self, key: &KeyValue) -> Result<Node> {
        let node = self.with_dimension(|dim| {
            lock::require_hive_writable(self.state.status(), "inserting primary index key")?;
            let writable = dim.writable_nodes();
            let node = self.assigner.choose(&writable, key)?;
            lock::require_node_writable(node, "inserting primary index key")?;
            Ok(node.clone())
        })?;
        self.record_write();
        self.directory.insert_primary_index_key(&node, key).await?;
        Ok(node)
    }

    /// Insert a resource id under an existing partition key.
    ///
    /// For a partitioning resource this is a primary-key insertion: the id
    /// is the partition key.
    pub async fn insert_resource_id(
        &self,
        resource: &str,
        resource_id: &KeyValue,
        primary_key: &KeyValue,
    ) -> Result<()> {
        let resolved = self.resolve_resource(resource)?;
        if resolved.is_partitioning {
            self.insert_primary_index_key(primary_key).await?;
            return Ok(());
        }
        let semaphores = self
            .directory
            .key_semaphores_of_primary_index_key(primary_key)
            .await?;
        self.require_writable(&semaphores, primary_key, "inserting resource id")?;
        self.record_write();
        self.directory
            .insert_resource_id(&resolved, resource_id, primary_key)
            .await
    }

    /// Insert a secondary index key pointing at an existing resource id.
    pub async fn insert_secondary_index_key(
        &self,
        resource: &str,
        index: &str,
        secondary_key: &KeyValue,
        resource_id: &KeyValue,
    ) -> Result<()> {
        let (resolved, index) = self.resolve_secondary_index(resource, index)?;
        let semaphores = self
            .directory
            .key_semaphores_of_resource_id(&resolved, resource_id)
            .await?;
        self.require_writable(&semaphores, resource_id, "inserting secondary index key")?;
        self.record_write();
        self.directory
            .insert_secondary_index_key(&index, &resolved, secondary_key, resource_id)
            .await
    }

    /// Flip the read-only flag of a partition key.
    ///
    /// Checks the hive and node scopes only, so a read-only key can be made
    /// writable again.
    pub async fn update_primary_index_key_read_only(
        &self,
        key: &KeyValue,
        read_only: bool,
    ) -> Result<()> {
        let semaphores = self
            .directory
            .key_semaphores_of_primary_index_key(key)
            .await?;
        if semaphores.is_empty() {
            return Err(HiveError::not_found(format!(
                "partition key {} in dimension '{}'",
                key, self.dimension
            )));
        }
        self.require_nodes_writable(&semaphores, "updating primary index key read-only")?;
        self.record_write();
        self.directory
            .update_primary_index_key_read_only(key, read_only)
            .await
    }

    /// Repoint a resource id at a new partition key.
    pub async fn update_primary_index_key_of_resource_id(
        &self,
        resource: &str,
        resource_id: &KeyValue,
        new_primary_key: &KeyValue,
    ) -> Result<()> {
        let resolved = self.resolve_resource(resource)?;
        if resolved.is_partitioning {
            return Err(HiveError::not_found(format!(
                "resource '{}' is partitioning; its id is the partition key and has no resource rows",
                resolved.name
            )));
        }
        let semaphores = self
            .directory
            .key_semaphores_of_primary_index_key(new_primary_key)
            .await?;
        self.require_writable(&semaphores, new_primary_key, "updating primary key of resource id")?;
        self.record_write();
        self.directory
            .update_primary_index_key_of_resource_id(&resolved, resource_id, new_primary_key)
            .await
    }

    /// Delete a partition key, cascading over its resource rows and their
    /// secondary rows.
    pub async fn delete_primary_index_key(&self, key: &KeyValue) -> Result<()> {
        if !self.directory.does_primary_index_key_exist(key).await? {
            return Err(HiveError::not_found(format!(
                "partition key {} in dimension '{}'",
                key, self.dimension
            )));
        }
        let semaphores = self
            .directory
            .key_semaphores_of_primary_index_key(key)
            .await?;
        self.require_writable(&semaphores, key, "deleting primary index key")?;

        let resources = self.with_dimension(|dim| Ok(dim.resources.clone()))?;
        for resource in &resources {
            let ids = self
                .directory
                .resource_ids_of_primary_index_key(resource, key)
                .await?;
            for id in ids {
                self.directory
                    .delete_all_secondary_index_keys_of_resource_id(resource, &id)
                    .await?;
                if !resource.is_partitioning {
                    self.directory.delete_resource_id(resource, &id).await?;
                }
            }
        }
        self.record_write();
        self.directory.delete_primary_index_key(key).await
    }

    /// Delete a resource id and its secondary rows.
    pub async fn delete_resource_id(&self, resource: &str, resource_id: &KeyValue) -> Result<()> {
        let resolved = self.resolve_resource(resource)?;
        if resolved.is_partitioning {
            return Err(HiveError::not_found(format!(
                "resource '{}' is partitioning; delete its ids as primary index keys",
                resolved.name
            )));
        }
        if !self
            .directory
            .does_resource_id_exist(&resolved, resource_id)
            .await?
        {
            return Err(HiveError::not_found(format!(
                "resource id {} of resource '{}'",
                resource_id, resolved.name
            )));
        }
        let semaphores = self
            .directory
            .key_semaphores_of_resource_id(&resolved, resource_id)
            .await?;
        self.require_writable(&semaphores, resource_id, "deleting resource id")?;
        self.record_write();
        self.directory
            .delete_all_secondary_index_keys_of_resource_id(&resolved, resource_id)
            .await?;
        self.directory.delete_resource_id(&resolved, resource_id).await
    }

    /// Delete one secondary key → resource id pair.
    pub async fn delete_secondary_index_key(
        &self,
        resource: &str,
        index: &str,
        secondary_key: &KeyValue,
        resource_id: &KeyValue,
    ) -> Result<()> {
        let (resolved, index) = self.resolve_secondary_index(resource, index)?;
        if !self
            .directory
            .does_secondary_index_key_exist(&index, secondary_key, resource_id)
            .await?
        {
            return Err(HiveError::not_found(format!(
                "secondary key {} of index '{}' pointing at resource id {}",
                secondary_key, index.name, resource_id
            )));
        }
        let semaphores = self
            .directory
            .key_semaphores_of_resource_id(&resolved, resource_id)
            .await?;
        self.require_writable(&semaphores, resource_id, "deleting secondary index key")?;
        self.record_write();
        self.directory
            .delete_secondary_index_key(&index, secondary_key, resource_id)
            .await
    }

    /// Semaphores of a partition key; empty signals an unknown key
    pub async fn key_semaphores_of_primary_index_key(
        &self,
        key: &KeyValue,
    ) -> Result<Vec<KeySemaphore>> {
        self.record_read();
        self.directory.key_semaphores_of_primary_index_key(key).await
    }

    /// Semaphores of a resource id
    pub async fn key_semaphores_of_resource_id(
        &self,
        resource: &str,
        resource_id: &KeyValue,
    ) -> Result<Vec<KeySemaphore>> {
        let resolved = self.resolve_resource(resource)?;
        self.record_read();
        self.directory
            .key_semaphores_of_resource_id(&resolved, resource_id)
            .await
    }

    /// Semaphores of a secondary key
    pub async fn key_semaphores_of_secondary_index_key(
        &self,
        resource: &str,
        index: &str,
        secondary_key: &KeyValue,
    ) -> Result<Vec<KeySemaphore>> {
        let (resolved, index) = self.resolve_secondary_index(resource, index)?;
        self.record_read();
        self.directory
            .key_semaphores_of_secondary_index_key(&index, &resolved, secondary_key)
            .await
    }

    /// Node ids holding a partition key
    pub async fn node_ids_of_primary_index_key(&self, key: &KeyValue) -> Result<Vec<ObjectId>> {
        Ok(self
            .key_semaphores_of_primary_index_key(key)
            .await?
            .iter()
            .map(|s| s.node_id)
            .collect())
    }

    /// Node ids holding a resource id
    pub async fn node_ids_of_resource_id(
        &self,
        resource: &str,
        resource_id: &KeyValue,
    ) -> Result<Vec<ObjectId>> {
        Ok(self
            .key_semaphores_of_resource_id(resource, resource_id)
            .await?
            .iter()
            .map(|s| s.node_id)
            .collect())
    }

    /// Node ids reachable from a secondary key
    pub async fn node_ids_of_secondary_index_key(
        &self,
        resource: &str,
        index: &str,
        secondary_key: &KeyValue,
    ) -> Result<Vec<ObjectId>> {
        Ok(self
            .key_semaphores_of_secondary_index_key(resource, index, secondary_key)
            .await?
            .iter()
            .map(|s| s.node_id)
            .collect())
    }

    /// The partition key a resource id lives under
    pub async fn primary_index_key_of_resource_id(
        &self,
        resource: &str,
        resource_id: &KeyValue,
    ) -> Result<Option<KeyValue>> {
        let resolved = self.resolve_resource(resource)?;
        self.record_read();
        self.directory
            .primary_index_key_of_resource_id(&resolved, resource_id)
            .await
    }

    /// All secondary keys of an index pointing at a resource id
    pub async fn secondary_index_keys_of_resource_id(
        &self,
        resource: &str,
        index: &str,
        resource_id: &KeyValue,
    ) -> Result<Vec<KeyValue>> {
        let (_, index) = self.resolve_secondary_index(resource, index)?;
        self.record_read();
        self.directory
            .secondary_index_keys_of_resource_id(&index, resource_id)
            .await
    }

    /// Hive OR node OR any-semaphore composition of the effective lock state
    fn effective_read_only(&self, semaphores: &[KeySemaphore]) -> Result<bool> {
        let snapshot = self.state.snapshot();
        let dimension = snapshot.require_dimension(&self.dimension)?;
        let any_locked = semaphores.iter().any(|s| {
            !s.status.is_writable()
                || dimension
                    .node_by_id(s.node_id)
                    .is_some_and(|n| !n.status.is_writable())
        });
        Ok(!snapshot.status.is_writable() || any_locked)
    }

    /// Effective read-only state of a partition key: hive OR node OR any
    /// semaphore. Fails `NotFound` for an unknown key.
    pub async fn read_only_of_primary_index_key(&self, key: &KeyValue) -> Result<bool> {
        let semaphores = self.key_semaphores_of_primary_index_key(key).await?;
        if semaphores.is_empty() {
            return Err(HiveError::not_found(format!(
                "partition key {} in dimension '{}'",
                key, self.dimension
            )));
        }
        self.effective_read_only(&semaphores)
    }

    /// Effective read-only state of a resource id. Fails `NotFound` for an
    /// unknown id.
    pub async fn read_only_of_resource_id(
        &self,
        resource: &str,
        resource_id: &KeyValue,
    ) -> Result<bool> {
        let semaphores = self
            .key_semaphores_of_resource_id(resource, resource_id)
            .await?;
        if semaphores.is_empty() {
            return Err(HiveError::not_found(format!(
                "resource id {} of resource '{}'",
                resource_id, resource
            )));
        }
        self.effective_read_only(&semaphores)
    }

    /// True if the partition key exists
    pub async fn does_primary_index_key_exist(&self, key: &KeyValue) -> Result<bool> {
        self.record_read();
        self.directory.does_primary_index_key_exist(key).await
    }

    /// True if the resource id exists
    pub async fn does_resource_id_exist(
        &self,
        resource: &str,
        resource_id: &KeyValue,
    ) -> Result<bool> {
        let resolved = self.resolve_resource(resource)?;
        self.record_read();
        self.directory.does_resource_id_exist(&resolved, resource_id).await
    }

    /// True if the `(secondary_key, resource_id)` pair exists
    pub async fn does_secondary_index_key_exist(
        &self,
        resource: &str,
        index: &str,
        secondary_key: &KeyValue,
        resource_id: &KeyValue,
    ) -> Result<bool> {
        let (_, index) = self.resolve_secondary_index(resource, index)?;
        self.record_read();
        self.directory
            .does_secondary_index_key_exist(&index, secondary_key, resource_id)
            .await
    }
}
