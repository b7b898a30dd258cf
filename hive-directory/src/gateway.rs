//! Persistence gateways for the hive metadata database
//!
//! One narrow CRUD trait per metadata table. Gateways are mechanical: they
//! enforce row-level uniqueness and existence but never consult the lock
//! engine; that is the facade's job. `create_*` assigns and returns the row
//! id; `load_all_*` returns flat rows without children attached (composition
//! happens in the graph loader).
//!
//! Common semantics:
//! - `create_*` fails `DuplicateName` if a row with the same (parent, name)
//!   already exists
//! - `update_*` / `delete_*` fail `NotFound` for a missing id
//! - any operation receiving `NEW_OBJECT_ID` fails `Persistence`
//! - driver failures surface as `Persistence` with the driver message

use async_trait::async_trait;
use hive_core::{HiveSemaphore, Node, ObjectId, PartitionDimension, Resource, Result, SecondaryIndex};
use std::fmt::Debug;
use std::sync::Arc;

/// CRUD over the `partition_dimension` table.
#[async_trait]
pub trait DimensionGateway: Send + Sync + Debug {
    /// Insert a new dimension row, returning the assigned id
    async fn create_dimension(&self, dimension: &PartitionDimension) -> Result<ObjectId>;

    /// Update an existing dimension row
    async fn update_dimension(&self, dimension: &PartitionDimension) -> Result<()>;

    /// Delete a dimension row by id
    async fn delete_dimension(&self, id: ObjectId) -> Result<()>;

    /// Load all dimension rows (no resources or nodes attached)
    async fn load_all_dimensions(&self) -> Result<Vec<PartitionDimension>>;
}

/// CRUD over the `resource` table.
#[async_trait]
pub trait ResourceGateway: Send + Sync + Debug {
    /// Insert a new resource row, returning the assigned id
    async fn create_resource(&self, resource: &Resource) -> Result<ObjectId>;

    /// Update an existing resource row
    async fn update_resource(&self, resource: &Resource) -> Result<()>;

    /// Delete a resource row by id
    async fn delete_resource(&self, id: ObjectId) -> Result<()>;

    /// Load all resource rows (no secondary indexes attached)
    async fn load_all_resources(&self) -> Result<Vec<Resource>>;
}

/// CRUD over the `secondary_index` table.
#[async_trait]
pub trait SecondaryIndexGateway: Send + Sync + Debug {
    /// Insert a new secondary index row, returning the assigned id
    async fn create_secondary_index(&self, index: &SecondaryIndex) -> Result<ObjectId>;

    /// Update an existing secondary index row
    async fn update_secondary_index(&self, index: &SecondaryIndex) -> Result<()>;

    /// Delete a secondary index row by id
    async fn delete_secondary_index(&self, id: ObjectId) -> Result<()>;

    /// Load all secondary index rows
    async fn load_all_secondary_indexes(&self) -> Result<Vec<SecondaryIndex>>;
}

/// CRUD over the `node` table.
#[async_trait]
pub trait NodeGateway: Send + Sync + Debug {
    /// Insert a new node row, returning the assigned id
    async fn create_node(&self, node: &Node) -> Result<ObjectId>;

    /// Update an existing node row
    async fn update_node(&self, node: &Node) -> Result<()>;

    /// Delete a node row by id
    async fn delete_node(&self, id: ObjectId) -> Result<()>;

    /// Load all node rows
    async fn load_all_nodes(&self) -> Result<Vec<Node>>;
}

/// Access to the singleton `hive_semaphore` row.
#[async_trait]
pub trait HiveSemaphoreGateway: Send + Sync + Debug {
    /// Load the semaphore row; `None` means the hive schema is not installed
    async fn load_semaphore(&self) -> Result<Option<HiveSemaphore>>;

    /// Overwrite the semaphore row.
    ///
    /// Fails `MetadataMissing` if the row has never been installed.
    async fn update_semaphore(&self, semaphore: &HiveSemaphore) -> Result<()>;

    /// Atomically bump the revision by one and persist, returning the new
    /// record.
    ///
    /// Fails `MetadataMissing` if the row has never been installed.
    async fn increment_and_persist(&self) -> Result<HiveSemaphore>;
}

/// The five gateway handles a hive instance works through.
///
/// Grouped so the loader and synchronizer can take one value instead of five.
#[derive(Clone, Debug)]
pub struct MetadataGateways {
    pub dimensions: Arc<dyn DimensionGateway>,
    pub resources: Arc<dyn ResourceGateway>,
    pub secondary_indexes: Arc<dyn SecondaryIndexGateway>,
    pub nodes: Arc<dyn NodeGateway>,
    pub semaphore: Arc<dyn HiveSemaphoreGateway>,
}
