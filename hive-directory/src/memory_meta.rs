//! In-memory metadata store for testing
//!
//! Implements all five gateway traits over `parking_lot::RwLock` tables with
//! an atomic id sequence. Thread-safe and suitable for multi-threaded async
//! runtimes. `install()` seeds the singleton semaphore row the way the
//! schema installer would; a hive loaded against an uninstalled store fails
//! `MetadataMissing`.

use crate::gateway::{
    DimensionGateway, HiveSemaphoreGateway, MetadataGateways, NodeGateway, ResourceGateway,
    SecondaryIndexGateway,
};
use async_trait::async_trait;
use hive_core::{
    is_persisted, HiveError, HiveSemaphore, Node, ObjectId, PartitionDimension, Resource, Result,
    SecondaryIndex,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

/// In-memory hive metadata database.
pub struct MemoryMetadataStore {
    next_id: AtomicI32,
    dimensions: RwLock<HashMap<ObjectId, PartitionDimension>>,
    resources: RwLock<HashMap<ObjectId, Resource>>,
    secondary_indexes: RwLock<HashMap<ObjectId, SecondaryIndex>>,
    nodes: RwLock<HashMap<ObjectId, Node>>,
    semaphore: RwLock<Option<HiveSemaphore>>,
}

impl Default for MemoryMetadataStore {
    fn default() -> Self {
        Self {
            next_id: AtomicI32::new(1),
            dimensions: RwLock::new(HashMap::new()),
            resources: RwLock::new(HashMap::new()),
            secondary_indexes: RwLock::new(HashMap::new()),
            nodes: RwLock::new(HashMap::new()),
            semaphore: RwLock::new(None),
        }
    }
}

impl Debug for MemoryMetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryMetadataStore")
            .field("dimension_count", &self.dimensions.read().len())
            .field("resource_count", &self.resources.read().len())
            .field("secondary_index_count", &self.secondary_indexes.read().len())
            .field("node_count", &self.nodes.read().len())
            .field("installed", &self.semaphore.read().is_some())
            .finish()
    }
}

impl MemoryMetadataStore {
    /// Create a new, uninstalled store
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed the singleton semaphore row. Idempotent.
    pub fn install(&self) {
        let mut semaphore = self.semaphore.write();
        if semaphore.is_none() {
            *semaphore = Some(HiveSemaphore::initial());
        }
    }

    /// Gateway handles sharing this store
    pub fn gateways(self: &Arc<Self>) -> MetadataGateways {
        MetadataGateways {
            dimensions: Arc::clone(self) as Arc<dyn DimensionGateway>,
            resources: Arc::clone(self) as Arc<dyn ResourceGateway>,
            secondary_indexes: Arc::clone(self) as Arc<dyn SecondaryIndexGateway>,
            nodes: Arc::clone(self) as Arc<dyn NodeGateway>,
            semaphore: Arc::clone(self) as Arc<dyn HiveSemaphoreGateway>,
        }
    }

    fn allocate_id(&self) -> ObjectId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn require_persisted(id: ObjectId, what: &str) -> Result<()> {
        if is_persisted(id) {
            Ok(())
        } else {
            Err(HiveError::persistence(format!(
                "{} has not been persisted (id = 0)",
                what
            )))
        }
    }
}

#[async_trait]
impl DimensionGateway for MemoryMetadataStore {
    async fn create_dimension(&self, dimension: &PartitionDimension) -> Result<ObjectId> {
        let mut dimensions = self.dimensions.write();
        if dimensions.values().any(|d| d.name == dimension.name) {
            return Err(HiveError::duplicate_name(format!(
                "partition dimension '{}' already exists",
                dimension.name
            )));
        }
        let id = self.allocate_id();
        // The dimension table holds scalar columns only; resources and nodes
        // persist through their own gateways.
        let row = PartitionDimension {
            id,
            resources: Vec::new(),
            nodes: Vec::new(),
            ..dimension.clone()
        };
        dimensions.insert(id, row);
        Ok(id)
    }

    async fn update_dimension(&self, dimension: &PartitionDimension) -> Result<()> {
        Self::require_persisted(dimension.id, "partition dimension")?;
        let mut dimensions = self.dimensions.write();
        if !dimensions.contains_key(&dimension.id) {
            return Err(HiveError::not_found(format!(
                "partition dimension id {}",
                dimension.id
            )));
        }
        if dimensions
            .values()
            .any(|d| d.id != dimension.id && d.name == dimension.name)
        {
            return Err(HiveError::duplicate_name(format!(
                "partition dimension '{}' already exists",
                dimension.name
            )));
        }
        let row = PartitionDimension {
            resources: Vec::new(),
            nodes: Vec::new(),
            ..dimension.clone()
        };
        dimensions.insert(dimension.id, row);
        Ok(())
    }

    async fn delete_dimension(&self, id: ObjectId) -> Result<()> {
        Self::require_persisted(id, "partition dimension")?;
        if self.dimensions.write().remove(&id).is_none() {
            return Err(HiveError::not_found(format!("partition dimension id {}", id)));
        }
        Ok(())
    }

    async fn load_all_dimensions(&self) -> Result<Vec<PartitionDimension>> {
        let mut rows: Vec<_> = self.dimensions.read().values().cloned().collect();
        rows.sort_by_key(|d| d.id);
        Ok(rows)
    }
}

#[async_trait]
impl ResourceGateway for MemoryMetadataStore {
    async fn create_resource(&self, resource: &Resource) -> Result<ObjectId> {
        Self::require_persisted(resource.dimension_id, "owning partition dimension")?;
        let mut resources = self.resources.write();
        if resources
            .values()
            .any(|r| r.dimension_id == resource.dimension_id && r.name == resource.name)
        {
            return Err(HiveError::duplicate_name(format!(
                "resource '{}' already exists in dimension id {}",
                resource.name, resource.dimension_id
            )));
        }
        let id = self.allocate_id();
        let row = Resource {
            id,
            secondary_indexes: Vec::new(),
            ..resource.clone()
        };
        resources.insert(id, row);
        Ok(id)
    }

    async fn update_resource(&self, resource: &Resource) -> Result<()> {
        Self::require_persisted(resource.id, "resource")?;
        let mut resources = self.resources.write();
        if !resources.contains_key(&resource.id) {
            return Err(HiveError::not_found(format!("resource id {}", resource.id)));
        }
        if resources.values().any(|r| {
            r.id != resource.id
                && r.dimension_id == resource.dimension_id
                && r.name == resource.name
        }) {
            return Err(HiveError::duplicate_name(format!(
                "resource '{}' already exists in dimension id {}",
                resource.name, resource.dimension_id
            )));
        }
        let row = Resource {
            secondary_indexes: Vec::new(),
            ..resource.clone()
        };
        resources.insert(resource.id, row);
        Ok(())
    }

    async fn delete_resource(&self, id: ObjectId) -> Result<()> {
        Self::require_persisted(id, "resource")?;
        if self.resources.write().remove(&id).is_none() {
            return Err(HiveError::not_found(format!("resource id {}", id)));
        }
        Ok(())
    }

    async fn load_all_resources(&self) -> Result<Vec<Resource>> {
        let mut rows: Vec<_> = self.resources.read().values().cloned().collect();
        rows.sort_by_key(|r| r.id);
        Ok(rows)
    }
}

#[async_trait]
impl SecondaryIndexGateway for MemoryMetadataStore {
    async fn create_secondary_index(&self, index: &SecondaryIndex) -> Result<ObjectId> {
        Self::require_persisted(index.resource_id, "owning resource")?;
        let mut indexes = self.secondary_indexes.write();
        if indexes
            .values()
            .any(|i| i.resource_id == index.resource_id && i.name == index.name)
        {
            return Err(HiveError::duplicate_name(format!(
                "secondary index '{}' already exists on resource id {}",
                index.name, index.resource_id
            )));
        }
        let id = self.allocate_id();
        indexes.insert(
            id,
            SecondaryIndex {
                id,
                ..index.clone()
            },
        );
        Ok(id)
    }

    async fn update_secondary_index(&self, index: &SecondaryIndex) -> Result<()> {
        Self::require_persisted(index.id, "secondary index")?;
        let mut indexes = self.secondary_indexes.write();
        if !indexes.contains_key(&index.id) {
            return Err(HiveError::not_found(format!("secondary index id {}", index.id)));
        }
        if indexes
            .values()
            .any(|i| i.id != index.id && i.resource_id == index.resource_id && i.name == index.name)
        {
            return Err(HiveError::duplicate_name(format!(
                "secondary index '{}' already exists on resource id {}",
                index.name, index.resource_id
            )));
        }
        indexes.insert(index.id, index.clone());
        Ok(())
    }

    async fn delete_secondary_index(&self, id: ObjectId) -> Result<()> {
        Self::require_persisted(id, "secondary index")?;
        if self.secondary_indexes.write().remove(&id).is_none() {
            return Err(HiveError::not_found(format!("secondary index id {}", id)));
        }
        Ok(())
    }

    async fn load_all_secondary_indexes(&self) -> Result<Vec<SecondaryIndex>> {
        let mut rows: Vec<_> = self.secondary_indexes.read().values().cloned().collect();
        rows.sort_by_key(|i| i.id);
        Ok(rows)
    }
}

#[async_trait]
impl NodeGateway for MemoryMetadataStore {
    async fn create_node(&self, node: &Node) -> Result<ObjectId> {
        Self::require_persisted(node.dimension_id, "owning partition dimension")?;
        let mut nodes = self.nodes.write();
        if nodes
            .values()
            .any(|n| n.dimension_id == node.dimension_id && n.name == node.name)
        {
            return Err(HiveError::duplicate_name(format!(
                "node '{}' already exists in dimension id {}",
                node.name, node.dimension_id
            )));
        }
        let id = self.allocate_id();
        nodes.insert(id, Node { id, ..node.clone() });
        Ok(id)
    }

    async fn update_node(&self, node: &Node) -> Result<()> {
        Self::require_persisted(node.id, "node")?;
        let mut nodes = self.nodes.write();
        if !nodes.contains_key(&node.id) {
            return Err(HiveError::not_found(format!("node id {}", node.id)));
        }
        if nodes
            .values()
            .any(|n| n.id != node.id && n.dimension_id == node.dimension_id && n.name == node.name)
        {
            return Err(HiveError::duplicate_name(format!(
                "node '{}' already exists in dimension id {}",
                node.name, node.dimension_id
            )));
        }
        nodes.insert(node.id, node.clone());
        Ok(())
    }

    async fn delete_node(&self, id: ObjectId) -> Result<()> {
        Self::require_persisted(id, "node")?;
        if self.nodes.write().remove(&id).is_none() {
            return Err(HiveError::not_found(format!("node id {}", id)));
        }
        Ok(())
    }

    async fn load_all_nodes(&self) -> Result<Vec<Node>> {
        let mut rows: Vec<_> = self.nodes.read().values().cloned().collect();
        rows.sort_by_key(|n| n.id);
        Ok(rows)
    }
}

#[async_trait]
impl HiveSemaphoreGateway for MemoryMetadataStore {
    async fn load_semaphore(&self) -> Result<Option<HiveSemaphore>> {
        Ok(*self.semaphore.read())
    }

    async fn update_semaphore(&self, semaphore: &HiveSemaphore) -> Result<()> {
        let mut row = self.semaphore.write();
        if row.is_none() {
            return Err(HiveError::metadata_missing(
                "hive semaphore row has not been installed",
            ));
        }
        *row = Some(*semaphore);
        Ok(())
    }

    async fn increment_and_persist(&self) -> Result<HiveSemaphore> {
        let mut row = self.semaphore.write();
        match row.as_mut() {
            Some(semaphore) => {
                semaphore.increment_revision();
                Ok(*semaphore)
            }
            None => Err(HiveError::metadata_missing(
                "hive semaphore row has not been installed",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::{KeyType, Status};

    #[tokio::test]
    async fn test_create_assigns_ids_and_rejects_duplicates() {
        let store = MemoryMetadataStore::new();
        let dim = PartitionDimension::new("user", KeyType::Integer);

        let id = store.create_dimension(&dim).await.unwrap();
        assert!(id > 0);
        let err = store.create_dimension(&dim).await.unwrap_err();
        assert!(matches!(err, HiveError::DuplicateName(_)));
    }

    #[tokio::test]
    async fn test_update_unpersisted_is_persistence_error() {
        let store = MemoryMetadataStore::new();
        let dim = PartitionDimension::new("user", KeyType::Integer);
        let err = store.update_dimension(&dim).await.unwrap_err();
        assert!(matches!(err, HiveError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let store = MemoryMetadataStore::new();
        let err = store.delete_node(42).await.unwrap_err();
        assert!(matches!(err, HiveError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_resource_names_allowed_across_dimensions() {
        let store = MemoryMetadataStore::new();
        let d1 = store
            .create_dimension(&PartitionDimension::new("user", KeyType::Integer))
            .await
            .unwrap();
        let d2 = store
            .create_dimension(&PartitionDimension::new("order", KeyType::Integer))
            .await
            .unwrap();

        let mut res = Resource::new("weather", KeyType::Integer, false);
        res.dimension_id = d1;
        store.create_resource(&res).await.unwrap();
        res.dimension_id = d2;
        // Same name under a different dimension is fine
        store.create_resource(&res).await.unwrap();
        res.dimension_id = d1;
        assert!(store.create_resource(&res).await.is_err());
    }

    #[tokio::test]
    async fn test_semaphore_requires_install() {
        let store = MemoryMetadataStore::new();
        assert!(store.load_semaphore().await.unwrap().is_none());
        assert!(matches!(
            store.increment_and_persist().await.unwrap_err(),
            HiveError::MetadataMissing(_)
        ));

        store.install();
        let sem = store.increment_and_persist().await.unwrap();
        assert_eq!(sem.revision, 1);
        assert_eq!(sem.status, Status::Writable);

        store
            .update_semaphore(&HiveSemaphore::new(1, Status::ReadOnly))
            .await
            .unwrap();
        assert_eq!(
            store.load_semaphore().await.unwrap().unwrap().status,
            Status::ReadOnly
        );
    }

    #[tokio::test]
    async fn test_load_all_is_sorted_and_childless() {
        let store = MemoryMetadataStore::new();
        let mut dim = PartitionDimension::new("user", KeyType::Integer);
        dim.nodes.push(Node::new("n1", "db://a"));
        let id = store.create_dimension(&dim).await.unwrap();

        let rows = store.load_all_dimensions().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        // Children persist through their own gateways, not this table
        assert!(rows[0].nodes.is_empty());
    }
}
