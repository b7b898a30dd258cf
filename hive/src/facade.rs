//! The hive facade: public metadata CRUD, key routing, and connections
//!
//! One [`Hive`] instance is shared across all threads of a process; multiple
//! processes may share the same hive database and converge through the sync
//! daemon. Every metadata mutation runs the lock engine, validates
//! uniqueness, persists through a gateway, bumps the persisted revision, and
//! re-synchronizes the in-memory graph.

use crate::config::HiveConfig;
use crate::connection::{AccessType, ConnectionSource, MemoryConnectionSource, NodeConnection};
use crate::directory_facade::DirectoryFacade;
use hive_core::{
    lock, Assigner, HashAssigner, HiveError, HiveGraph, HiveSemaphore, HiveStats, KeySemaphore,
    KeyValue, Node, PartitionDimension, Resource, Result, SecondaryIndex, StatsSnapshot, Status,
};
use hive_directory::{
    Directory, DirectoryProvider, MemoryDirectoryProvider, MemoryMetadataStore, MetadataGateways,
};
use hive_sync::{SharedHive, SyncHandle, Synchronizer};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A loaded hive: the directory coordination layer of one sharded deployment.
pub struct Hive {
    config: HiveConfig,
    state: Arc<SharedHive>,
    gateways: MetadataGateways,
    provider: Arc<dyn DirectoryProvider>,
    directories: RwLock<HashMap<String, Arc<dyn Directory>>>,
    assigner: Arc<dyn Assigner>,
    connections: Arc<dyn ConnectionSource>,
    stats: Option<Arc<HiveStats>>,
    synchronizer: Arc<Synchronizer>,
}

impl std::fmt::Debug for Hive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hive")
            .field("uri", &self.config.uri)
            .field("revision", &self.state.revision())
            .field("status", &self.state.status())
            .field("dimensions", &self.state.snapshot().dimension_names())
            .finish()
    }
}

impl Hive {
    /// Load a hive from its persisted metadata.
    ///
    /// Fails `MetadataMissing` when the semaphore row is absent — the schema
    /// has not been installed at the target URI. The background sync daemon
    /// is not started here; call [`Hive::spawn_sync_daemon`].
    pub async fn load(
        config: HiveConfig,
        gateways: MetadataGateways,
        provider: Arc<dyn DirectoryProvider>,
        connections: Arc<dyn ConnectionSource>,
    ) -> Result<Arc<Self>> {
        Self::load_with_assigner(
            config,
            gateways,
            provider,
            connections,
            Arc::new(HashAssigner::new()),
        )
        .await
    }

    /// Load a hive with a custom node-assignment policy.
    pub async fn load_with_assigner(
        config: HiveConfig,
        gateways: MetadataGateways,
        provider: Arc<dyn DirectoryProvider>,
        connections: Arc<dyn ConnectionSource>,
        assigner: Arc<dyn Assigner>,
    ) -> Result<Arc<Self>> {
        tracing::debug!(uri = %config.uri, "loading hive");
        let state = SharedHive::new();
        let graph = hive_sync::load_graph(&gateways).await?;
        state.swap(graph);

        let stats = config
            .performance_monitoring
            .then(|| Arc::new(HiveStats::new()));
        let synchronizer = Synchronizer::new(gateways.clone(), Arc::clone(&state));

        let hive = Arc::new(Self {
            config,
            state,
            gateways,
            provider,
            directories: RwLock::new(HashMap::new()),
            assigner,
            connections,
            stats,
            synchronizer,
        });
        hive.reconcile_directories();
        Ok(hive)
    }

    /// Load a hive wired to fresh in-memory backends.
    ///
    /// Installs the metadata schema first, so the load always succeeds.
    /// Intended for tests and single-process embedding.
    pub async fn load_in_memory(uri: impl Into<String>) -> Result<Arc<Self>> {
        let store = MemoryMetadataStore::new();
        store.install();
        Self::load(
            HiveConfig::new(uri).with_performance_monitoring(),
            store.gateways(),
            MemoryDirectoryProvider::new(),
            MemoryConnectionSource::new(),
        )
        .await
    }

    /// Start the background sync daemon at the configured interval.
    ///
    /// The returned handle owns the task; shut it down cooperatively.
    pub fn spawn_sync_daemon(&self) -> SyncHandle {
        self.synchronizer.spawn(self.config.sync_interval)
    }

    /// This instance's configuration
    pub fn config(&self) -> &HiveConfig {
        &self.config
    }

    /// The current graph snapshot
    pub fn snapshot(&self) -> Arc<HiveGraph> {
        self.state.snapshot()
    }

    /// Cached revision of this instance
    pub fn revision(&self) -> i64 {
        self.state.revision()
    }

    /// Hive-wide status of the cached snapshot
    pub fn status(&self) -> Status {
        self.state.status()
    }

    /// Counter snapshot, if performance monitoring is enabled
    pub fn stats(&self) -> Option<StatsSnapshot> {
        self.stats.as_ref().map(|s| s.snapshot())
    }

    /// Explicitly reconcile with the persisted metadata, rather than waiting
    /// for the periodic daemon.
    pub async fn sync(&self) -> Result<()> {
        self.synchronizer.force_synchronize().await?;
        self.reconcile_directories();
        Ok(())
    }

    /// Rebuild the per-dimension directory map against the current snapshot:
    /// open directories for new dimensions, drop handles for removed ones.
    fn reconcile_directories(&self) {
        let snapshot = self.state.snapshot();
        let names: HashSet<String> = snapshot.dimension_names().into_iter().collect();
        let mut directories = self.directories.write();
        directories.retain(|name, _| names.contains(name));
        for dimension in &snapshot.dimensions {
            directories
                .entry(dimension.name.clone())
                .or_insert_with(|| self.provider.open(dimension));
        }
    }

    /// The directory facade of a dimension
    pub fn directory(&self, dimension: &str) -> Result<DirectoryFacade> {
        self.state.snapshot().require_dimension(dimension)?;
        let directory = self
            .directories
            .read()
            .get(dimension)
            .cloned()
            .ok_or_else(|| {
                HiveError::not_found(format!("directory for partition dimension '{}'", dimension))
            })?;
        Ok(DirectoryFacade::new(
            dimension,
            Arc::clone(&self.state),
            directory,
            Arc::clone(&self.assigner),
            self.stats.clone(),
        ))
    }

    /// Bump the persisted revision and reconcile caches.
    ///
    /// Called after every successful gateway mutation. If the bump fails the
    /// persisted row still exists without a revision bump; the next sync
    /// picks it up through a full reload.
    async fn commit_mutation(&self) -> Result<()> {
        self.gateways.semaphore.increment_and_persist().await?;
        self.sync().await
    }

    fn require_writable_hive(&self, operation: &str) -> Result<()> {
        lock::require_hive_writable(self.state.status(), operation)
    }

    // ------------------------------------------------------------------
    // Partition dimension CRUD
    // ------------------------------------------------------------------

    /// Add a partition dimension to the hive.
    ///
    /// A dimension without an index URI defaults to the hive URI. Returns
    /// the persisted dimension with its id set.
    pub async fn add_partition_dimension(
        &self,
        mut dimension: PartitionDimension,
    ) -> Result<PartitionDimension> {
        self.require_writable_hive("creating a new partition dimension")?;
        if self.state.snapshot().dimension(&dimension.name).is_some() {
            return Err(HiveError::duplicate_name(format!(
                "partition dimension '{}' already exists",
                dimension.name
            )));
        }
        if dimension.index_uri.is_none() {
            dimension.index_uri = Some(self.config.uri.clone());
        }
        let id = self.gateways.dimensions.create_dimension(&dimension).await?;
        self.commit_mutation().await?;
        self.state
            .snapshot()
            .require_dimension(&dimension.name)
            .map(Clone::clone)
            .map_err(|_| HiveError::persistence(format!("dimension id {} vanished after create", id)))
    }

    /// Update a persisted partition dimension's own columns.
    ///
    /// Child nodes, resources, and indexes persist through their own
    /// operations.
    pub async fn update_partition_dimension(&self, dimension: &PartitionDimension) -> Result<()> {
        self.require_writable_hive("updating partition dimension")?;
        let snapshot = self.state.snapshot();
        if snapshot.dimension_by_id(dimension.id).is_none() {
            return Err(HiveError::not_found(format!(
                "partition dimension id {}",
                dimension.id
            )));
        }
        if snapshot
            .dimensions
            .iter()
            .any(|d| d.id != dimension.id && d.name == dimension.name)
        {
            return Err(HiveError::duplicate_name(format!(
                "partition dimension '{}' already exists",
                dimension.name
            )));
        }
        self.gateways.dimensions.update_dimension(dimension).await?;
        self.commit_mutation().await
    }

    /// Delete a partition dimension and everything under it.
    pub async fn delete_partition_dimension(&self, name: &str) -> Result<()> {
        self.require_writable_hive("deleting partition dimension")?;
        let dimension = self.state.snapshot().require_dimension(name)?.clone();

        // Child rows first, then the dimension row itself.
        for resource in &dimension.resources {
            for index in &resource.secondary_indexes {
                self.gateways
                    .secondary_indexes
                    .delete_secondary_index(index.id)
                    .await?;
            }
            self.gateways.resources.delete_resource(resource.id).await?;
        }
        for node in &dimension.nodes {
            self.gateways.nodes.delete_node(node.id).await?;
        }
        self.gateways.dimensions.delete_dimension(dimension.id).await?;
        self.provider.discard(name);
        self.commit_mutation().await
    }

    // ------------------------------------------------------------------
    // Node CRUD
    // ------------------------------------------------------------------

    /// Add a node to a partition dimension.
    pub async fn add_node(&self, dimension: &str, mut node: Node) -> Result<Node> {
        self.require_writable_hive("creating a new node")?;
        let owner = self.state.snapshot().require_dimension(dimension)?.clone();
        if owner.node(&node.name).is_some() {
            return Err(HiveError::duplicate_name(format!(
                "node '{}' already exists in partition dimension '{}'",
                node.name, dimension
            )));
        }
        node.dimension_id = owner.id;
        let id = self.gateways.nodes.create_node(&node).await?;
        self.commit_mutation().await?;
        self.state
            .snapshot()
            .require_node(dimension, &node.name)
            .map(Clone::clone)
            .map_err(|_| HiveError::persistence(format!("node id {} vanished after create", id)))
    }

    /// Update a persisted node.
    pub async fn update_node(&self, node: &Node) -> Result<()> {
        self.require_writable_hive("updating node")?;
        let snapshot = self.state.snapshot();
        let owner = snapshot
            .dimension_by_id(node.dimension_id)
            .ok_or_else(|| {
                HiveError::not_found(format!("partition dimension id {}", node.dimension_id))
            })?;
        if owner.node_by_id(node.id).is_none() {
            return Err(HiveError::not_found(format!("node id {}", node.id)));
        }
        if owner.nodes.iter().any(|n| n.id != node.id && n.name == node.name) {
            return Err(HiveError::duplicate_name(format!(
                "node '{}' already exists in partition dimension '{}'",
                node.name, owner.name
            )));
        }
        self.gateways.nodes.update_node(node).await?;
        self.commit_mutation().await
    }

    /// Delete a node from a dimension.
    pub async fn delete_node(&self, dimension: &str, node: &str) -> Result<()> {
        self.require_writable_hive("deleting node")?;
        let node = self.state.snapshot().require_node(dimension, node)?.clone();
        self.gateways.nodes.delete_node(node.id).await?;
        self.commit_mutation().await
    }

    /// Persist a node's writability status.
    pub async fn update_node_status(
        &self,
        dimension: &str,
        node: &str,
        status: Status,
    ) -> Result<()> {
        let mut node = self.state.snapshot().require_node(dimension, node)?.clone();
        node.status = status;
        self.update_node(&node).await
    }

    // ------------------------------------------------------------------
    // Resource CRUD
    // ------------------------------------------------------------------

    /// Add a resource to a partition dimension.
    pub async fn add_resource(&self, dimension: &str, mut resource: Resource) -> Result<Resource> {
        self.require_writable_hive("creating a new resource")?;
        let owner = self.state.snapshot().require_dimension(dimension)?.clone();
        if owner.resource(&resource.name).is_some() {
            return Err(HiveError::duplicate_name(format!(
                "resource '{}' already exists in partition dimension '{}'",
                resource.name, dimension
            )));
        }
        resource.dimension_id = owner.id;
        let id = self.gateways.resources.create_resource(&resource).await?;
        self.commit_mutation().await?;
        self.state
            .snapshot()
            .require_resource(dimension, &resource.name)
            .map(Clone::clone)
            .map_err(|_| HiveError::persistence(format!("resource id {} vanished after create", id)))
    }

    /// Update a persisted resource's own columns.
    pub async fn update_resource(&self, resource: &Resource) -> Result<()> {
        self.require_writable_hive("updating resource")?;
        let snapshot = self.state.snapshot();
        let owner = snapshot
            .dimension_by_id(resource.dimension_id)
            .ok_or_else(|| {
                HiveError::not_found(format!("partition dimension id {}", resource.dimension_id))
            })?;
        if !owner.resources.iter().any(|r| r.id == resource.id) {
            return Err(HiveError::not_found(format!("resource id {}", resource.id)));
        }
        if owner
            .resources
            .iter()
            .any(|r| r.id != resource.id && r.name == resource.name)
        {
            return Err(HiveError::duplicate_name(format!(
                "resource '{}' already exists in partition dimension '{}'",
                resource.name, owner.name
            )));
        }
        self.gateways.resources.update_resource(resource).await?;
        self.commit_mutation().await
    }

    /// Delete a resource and its secondary indexes.
    pub async fn delete_resource(&self, dimension: &str, resource: &str) -> Result<()> {
        self.require_writable_hive("deleting resource")?;
        let resource = self
            .state
            .snapshot()
            .require_resource(dimension, resource)?
            .clone();
        for index in &resource.secondary_indexes {
            self.gateways
                .secondary_indexes
                .delete_secondary_index(index.id)
                .await?;
        }
        self.gateways.resources.delete_resource(resource.id).await?;
        self.commit_mutation().await
    }

    // ------------------------------------------------------------------
    // Secondary index CRUD
    // ------------------------------------------------------------------

    /// Add a secondary index to a resource.
    pub async fn add_secondary_index(
        &self,
        dimension: &str,
        resource: &str,
        mut index: SecondaryIndex,
    ) -> Result<SecondaryIndex> {
        self.require_writable_hive("creating a new secondary index")?;
        let owner = self
            .state
            .snapshot()
            .require_resource(dimension, resource)?
            .clone();
        if owner.secondary_index(&index.name).is_some() {
            return Err(HiveError::duplicate_name(format!(
                "secondary index '{}' already exists on resource '{}'",
                index.name, resource
            )));
        }
        index.resource_id = owner.id;
        let id = self
            .gateways
            .secondary_indexes
            .create_secondary_index(&index)
            .await?;
        self.commit_mutation().await?;
        self.state
            .snapshot()
            .require_secondary_index(dimension, resource, &index.name)
            .map(Clone::clone)
            .map_err(|_| {
                HiveError::persistence(format!("secondary index id {} vanished after create", id))
            })
    }

    /// Update a persisted secondary index.
    pub async fn update_secondary_index(&self, index: &SecondaryIndex) -> Result<()> {
        self.require_writable_hive("updating secondary index")?;
        let snapshot = self.state.snapshot();
        let owner = snapshot
            .dimensions
            .iter()
            .flat_map(|d| d.resources.iter())
            .find(|r| r.id == index.resource_id)
            .ok_or_else(|| HiveError::not_found(format!("resource id {}", index.resource_id)))?;
        if !owner.secondary_indexes.iter().any(|i| i.id == index.id) {
            return Err(HiveError::not_found(format!("secondary index id {}", index.id)));
        }
        if owner
            .secondary_indexes
            .iter()
            .any(|i| i.id != index.id && i.name == index.name)
        {
            return Err(HiveError::duplicate_name(format!(
                "secondary index '{}' already exists on resource '{}'",
                index.name, owner.name
            )));
        }
        self.gateways
            .secondary_indexes
            .update_secondary_index(index)
            .await?;
        self.commit_mutation().await
    }

    /// Delete a secondary index from a resource.
    pub async fn delete_secondary_index(
        &self,
        dimension: &str,
        resource: &str,
        index: &str,
    ) -> Result<()> {
        self.require_writable_hive("deleting secondary index")?;
        let index = self
            .state
            .snapshot()
            .require_secondary_index(dimension, resource, index)?
            .clone();
        self.gateways
            .secondary_indexes
            .delete_secondary_index(index.id)
            .await?;
        self.commit_mutation().await
    }

    // ------------------------------------------------------------------
    // Status control
    // ------------------------------------------------------------------

    /// Persist the hive-wide status and refresh the local snapshot.
    ///
    /// The single writer path for the semaphore's status column; the
    /// revision is left untouched.
    pub async fn update_hive_status(&self, status: Status) -> Result<()> {
        let current = self
            .gateways
            .semaphore
            .load_semaphore()
            .await?
            .ok_or_else(|| {
                HiveError::metadata_missing("hive semaphore row not found; run the installer")
            })?;
        self.gateways
            .semaphore
            .update_semaphore(&HiveSemaphore::new(current.revision, status))
            .await?;
        self.sync().await
    }

    // ------------------------------------------------------------------
    // Key CRUD (delegates to the per-dimension directory facade)
    // ------------------------------------------------------------------

    /// Insert a new partition key, returning the node it was assigned to.
    pub async fn insert_primary_index_key(&self, dimension: &str, key: &KeyValue) -> Result<Node> {
        self.directory(dimension)?.insert_primary_index_key(key).await
    }

    /// Insert a resource id under an existing partition key.
    pub async fn insert_resource_id(
        &self,
        dimension: &str,
        resource: &str,
        resource_id: &KeyValue,
        primary_key: &KeyValue,
    ) -> Result<()> {
        self.directory(dimension)?
            .insert_resource_id(resource, resource_id, primary_key)
            .await
    }

    /// Insert a secondary index key pointing at an existing resource id.
    pub async fn insert_secondary_index_key(
        &self,
        dimension: &str,
        resource: &str,
        index: &str,
        secondary_key: &KeyValue,
        resource_id: &KeyValue,
    ) -> Result<()> {
        self.directory(dimension)?
            .insert_secondary_index_key(resource, index, secondary_key, resource_id)
            .await
    }

    /// Flip the read-only flag of a partition key.
    pub async fn update_primary_index_key_read_only(
        &self,
        dimension: &str,
        key: &KeyValue,
        read_only: bool,
    ) -> Result<()> {
        self.directory(dimension)?
            .update_primary_index_key_read_only(key, read_only)
            .await
    }

    /// Delete a partition key and cascade over its resource and secondary
    /// rows.
    pub async fn delete_primary_index_key(&self, dimension: &str, key: &KeyValue) -> Result<()> {
        self.directory(dimension)?.delete_primary_index_key(key).await
    }

    // ------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------

    /// Open a connection to the node holding a partition key.
    pub async fn connection_for_primary_key(
        &self,
        dimension: &str,
        key: &KeyValue,
        access: AccessType,
    ) -> Result<NodeConnection> {
        let result = self.try_connection_for_primary_key(dimension, key, access).await;
        self.record_connection_outcome(&result, access);
        result
    }

    /// Open a connection to a node reachable from a secondary key.
    pub async fn connection_for_secondary_key(
        &self,
        dimension: &str,
        resource: &str,
        index: &str,
        secondary_key: &KeyValue,
        access: AccessType,
    ) -> Result<NodeConnection> {
        let result = async {
            let semaphores = self
                .directory(dimension)?
                .key_semaphores_of_secondary_index_key(resource, index, secondary_key)
                .await?;
            self.open_connection(dimension, semaphores, secondary_key, access)
                .await
        }
        .await;
        self.record_connection_outcome(&result, access);
        result
    }

    /// Open a connection to the node holding a resource id.
    pub async fn connection_for_resource_id(
        &self,
        dimension: &str,
        resource: &str,
        resource_id: &KeyValue,
        access: AccessType,
    ) -> Result<NodeConnection> {
        let result = async {
            let semaphores = self
                .directory(dimension)?
                .key_semaphores_of_resource_id(resource, resource_id)
                .await?;
            self.open_connection(dimension, semaphores, resource_id, access)
                .await
        }
        .await;
        self.record_connection_outcome(&result, access);
        result
    }

    async fn try_connection_for_primary_key(
        &self,
        dimension: &str,
        key: &KeyValue,
        access: AccessType,
    ) -> Result<NodeConnection> {
        let semaphores = self
            .directory(dimension)?
            .key_semaphores_of_primary_index_key(key)
            .await?;
        self.open_connection(dimension, semaphores, key, access).await
    }

    async fn open_connection(
        &self,
        dimension: &str,
        mut semaphores: Vec<KeySemaphore>,
        key: &KeyValue,
        access: AccessType,
    ) -> Result<NodeConnection> {
        if semaphores.is_empty() {
            return Err(HiveError::not_found(format!(
                "key {} in partition dimension '{}'",
                key, dimension
            )));
        }
        // Deterministic choice when a key lives on several nodes.
        semaphores.sort_by_key(|s| s.node_id);

        let snapshot = self.state.snapshot();
        let owner = snapshot.require_dimension(dimension)?;
        if access == AccessType::ReadWrite {
            lock::require_semaphores_writable(
                snapshot.status,
                &semaphores,
                |id| owner.node_by_id(id),
                key,
                "opening read-write connection",
            )?;
        }
        let node = owner
            .node_by_id(semaphores[0].node_id)
            .ok_or_else(|| {
                HiveError::not_found(format!(
                    "node id {} in partition dimension '{}'",
                    semaphores[0].node_id, dimension
                ))
            })?;

        let mut connection = self
            .connections
            .open(&node.uri, access == AccessType::Read)
            .await?;
        connection.node_id = node.id;
        Ok(connection)
    }

    fn record_connection_outcome(&self, result: &Result<NodeConnection>, access: AccessType) {
        let Some(stats) = &self.stats else { return };
        match result {
            Ok(_) => match access {
                AccessType::Read => stats.record_read_connection(),
                AccessType::ReadWrite => stats.record_write_connection(),
            },
            Err(_) => stats.record_connection_failure(),
        }
    }
}
