//! Metadata entities: dimensions, resources, secondary indexes, and nodes
//!
//! Pure data with identity and deep structural equality. Children hold only
//! the parent's row id, never an owning back-pointer; name resolution goes
//! through [`crate::graph::HiveGraph`]. An entity with `id == NEW_OBJECT_ID`
//! has not been persisted yet; the gateway assigns the real id on create.

use crate::ids::{ObjectId, NEW_OBJECT_ID};
use crate::key::KeyType;
use crate::status::{Lockable, Status};
use serde::{Deserialize, Serialize};

/// A named partitioning axis.
///
/// Owns its resources and nodes. A hive typically has one dimension;
/// multiple are permitted, each with its own directory tables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionDimension {
    /// Row id; `NEW_OBJECT_ID` until persisted
    pub id: ObjectId,
    /// Name, unique within the hive
    pub name: String,
    /// Type code of the partition key column
    pub key_type: KeyType,
    /// URI of the directory database; `None` defaults to the hive URI
    pub index_uri: Option<String>,
    /// Entity classes partitioned along this axis
    pub resources: Vec<Resource>,
    /// Physical shards of this axis
    pub nodes: Vec<Node>,
}

impl PartitionDimension {
    /// Create an unpersisted dimension with no resources or nodes
    pub fn new(name: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            id: NEW_OBJECT_ID,
            name: name.into(),
            key_type,
            index_uri: None,
            resources: Vec::new(),
            nodes: Vec::new(),
        }
    }

    /// Look up a resource by name
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Look up a node by name
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Look up a node by id
    pub fn node_by_id(&self, id: ObjectId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Nodes currently accepting writes
    pub fn writable_nodes(&self) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| n.status.is_writable())
            .collect()
    }
}

/// A named entity class partitioned along a dimension.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Row id; `NEW_OBJECT_ID` until persisted
    pub id: ObjectId,
    /// Owning dimension's row id
    pub dimension_id: ObjectId,
    /// Name, unique within the dimension
    pub name: String,
    /// Type code of the resource id column
    pub key_type: KeyType,
    /// If true, the resource's id *is* the partition key: its
    /// primary-key-of-resource-id mapping is the identity function and no
    /// resource rows are stored for it
    pub is_partitioning: bool,
    /// Attribute indexes on this resource
    pub secondary_indexes: Vec<SecondaryIndex>,
}

impl Resource {
    /// Create an unpersisted resource with no secondary indexes
    pub fn new(name: impl Into<String>, key_type: KeyType, is_partitioning: bool) -> Self {
        Self {
            id: NEW_OBJECT_ID,
            dimension_id: NEW_OBJECT_ID,
            name: name.into(),
            key_type,
            is_partitioning,
            secondary_indexes: Vec::new(),
        }
    }

    /// Look up a secondary index by name
    pub fn secondary_index(&self, name: &str) -> Option<&SecondaryIndex> {
        self.secondary_indexes.iter().find(|i| i.name == name)
    }
}

/// A named attribute index on a resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryIndex {
    /// Row id; `NEW_OBJECT_ID` until persisted
    pub id: ObjectId,
    /// Owning resource's row id
    pub resource_id: ObjectId,
    /// Name, unique within the resource
    pub name: String,
    /// Type code of the indexed column
    pub column_type: KeyType,
}

impl SecondaryIndex {
    /// Create an unpersisted secondary index
    pub fn new(name: impl Into<String>, column_type: KeyType) -> Self {
        Self {
            id: NEW_OBJECT_ID,
            resource_id: NEW_OBJECT_ID,
            name: name.into(),
            column_type,
        }
    }
}

/// A physical shard of a partition dimension.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Row id; `NEW_OBJECT_ID` until persisted
    pub id: ObjectId,
    /// Owning dimension's row id
    pub dimension_id: ObjectId,
    /// Name, unique within the dimension
    pub name: String,
    /// Connect string of the shard database
    pub uri: String,
    /// Writability of this shard
    pub status: Status,
}

impl Node {
    /// Create an unpersisted writable node
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id: NEW_OBJECT_ID,
            dimension_id: NEW_OBJECT_ID,
            name: name.into(),
            uri: uri.into(),
            status: Status::Writable,
        }
    }

    /// Create an unpersisted node with an explicit status
    pub fn with_status(name: impl Into<String>, uri: impl Into<String>, status: Status) -> Self {
        Self {
            status,
            ..Self::new(name, uri)
        }
    }
}

impl Lockable for Node {
    fn status(&self) -> Status {
        self.status
    }
}
