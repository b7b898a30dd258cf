//! The immutable in-memory snapshot of a hive's metadata
//!
//! A [`HiveGraph`] is assembled from the persisted gateways and swapped in
//! wholesale by the synchronizer. Readers hold an `Arc` to one snapshot for
//! the duration of an operation and never observe a partially updated graph.

use crate::error::{HiveError, Result};
use crate::ids::ObjectId;
use crate::meta::{Node, PartitionDimension, Resource, SecondaryIndex};
use crate::status::Status;
use serde::{Deserialize, Serialize};

/// Snapshot of the complete metadata model at one revision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiveGraph {
    /// Revision this snapshot was loaded at
    pub revision: i64,
    /// Hive-wide writability at that revision
    pub status: Status,
    /// All partition dimensions with their resources and nodes attached
    pub dimensions: Vec<PartitionDimension>,
}

impl HiveGraph {
    /// An empty writable graph at revision zero
    pub fn empty() -> Self {
        Self {
            revision: 0,
            status: Status::Writable,
            dimensions: Vec::new(),
        }
    }

    /// Look up a dimension by name
    pub fn dimension(&self, name: &str) -> Option<&PartitionDimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    /// Look up a dimension by name, erroring if absent
    pub fn require_dimension(&self, name: &str) -> Result<&PartitionDimension> {
        self.dimension(name)
            .ok_or_else(|| HiveError::not_found(format!("partition dimension '{}'", name)))
    }

    /// Look up a dimension by id
    pub fn dimension_by_id(&self, id: ObjectId) -> Option<&PartitionDimension> {
        self.dimensions.iter().find(|d| d.id == id)
    }

    /// Look up a resource within a dimension, erroring if either is absent
    pub fn require_resource(&self, dimension: &str, resource: &str) -> Result<&Resource> {
        self.require_dimension(dimension)?
            .resource(resource)
            .ok_or_else(|| {
                HiveError::not_found(format!(
                    "resource '{}' in partition dimension '{}'",
                    resource, dimension
                ))
            })
    }

    /// Look up a secondary index within a resource, erroring if absent
    pub fn require_secondary_index(
        &self,
        dimension: &str,
        resource: &str,
        index: &str,
    ) -> Result<&SecondaryIndex> {
        self.require_resource(dimension, resource)?
            .secondary_index(index)
            .ok_or_else(|| {
                HiveError::not_found(format!(
                    "secondary index '{}' on resource '{}'",
                    index, resource
                ))
            })
    }

    /// Look up a node by name within a dimension, erroring if absent
    pub fn require_node(&self, dimension: &str, node: &str) -> Result<&Node> {
        self.require_dimension(dimension)?.node(node).ok_or_else(|| {
            HiveError::not_found(format!(
                "node '{}' in partition dimension '{}'",
                node, dimension
            ))
        })
    }

    /// Resolve a node by id within a dimension, erroring if absent
    pub fn require_node_by_id(&self, dimension: &str, id: ObjectId) -> Result<&Node> {
        self.require_dimension(dimension)?
            .node_by_id(id)
            .ok_or_else(|| {
                HiveError::not_found(format!(
                    "node id {} in partition dimension '{}'",
                    id, dimension
                ))
            })
    }

    /// The dimension owning a given resource row id, if any
    pub fn dimension_of_resource(&self, resource_id: ObjectId) -> Option<&PartitionDimension> {
        self.dimensions
            .iter()
            .find(|d| d.resources.iter().any(|r| r.id == resource_id))
    }

    /// Names of all dimensions, in graph order
    pub fn dimension_names(&self) -> Vec<String> {
        self.dimensions.iter().map(|d| d.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyType;

    fn graph_with_dimension() -> HiveGraph {
        let mut dim = PartitionDimension::new("user", KeyType::Integer);
        dim.id = 1;
        let mut res = Resource::new("weather", KeyType::Integer, false);
        res.id = 10;
        res.dimension_id = 1;
        res.secondary_indexes.push(SecondaryIndex {
            id: 20,
            resource_id: 10,
            ..SecondaryIndex::new("city", KeyType::Text)
        });
        dim.resources.push(res);
        let mut node = Node::new("n1", "db://a");
        node.id = 30;
        node.dimension_id = 1;
        dim.nodes.push(node);

        HiveGraph {
            revision: 5,
            status: Status::Writable,
            dimensions: vec![dim],
        }
    }

    #[test]
    fn test_require_lookups_resolve() {
        let graph = graph_with_dimension();
        assert!(graph.require_dimension("user").is_ok());
        assert!(graph.require_resource("user", "weather").is_ok());
        assert!(graph
            .require_secondary_index("user", "weather", "city")
            .is_ok());
        assert_eq!(graph.require_node_by_id("user", 30).unwrap().name, "n1");
    }

    #[test]
    fn test_require_lookups_error_with_names() {
        let graph = graph_with_dimension();
        let err = graph.require_resource("user", "absent").unwrap_err();
        assert!(matches!(err, HiveError::NotFound(_)));
        assert!(format!("{}", err).contains("absent"));
    }

    #[test]
    fn test_dimension_of_resource() {
        let graph = graph_with_dimension();
        assert_eq!(graph.dimension_of_resource(10).unwrap().name, "user");
        assert!(graph.dimension_of_resource(99).is_none());
    }
}
