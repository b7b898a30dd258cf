//! Assembles a [`HiveGraph`] from the persisted metadata gateways

use hive_core::{HiveError, HiveGraph, Result};
use hive_directory::MetadataGateways;
use std::collections::HashMap;

/// Load the complete metadata graph from the gateways.
///
/// Fails `MetadataMissing` when the singleton semaphore row is absent — the
/// hive schema has not been installed at the target URI. Child rows are
/// attached to their parents by id; rows whose parent is gone are dropped.
pub async fn load_graph(gateways: &MetadataGateways) -> Result<HiveGraph> {
    let semaphore = gateways
        .semaphore
        .load_semaphore()
        .await?
        .ok_or_else(|| {
            HiveError::metadata_missing("hive semaphore row not found; run the installer")
        })?;

    let mut dimensions = gateways.dimensions.load_all_dimensions().await?;
    let mut resources = gateways.resources.load_all_resources().await?;
    let indexes = gateways.secondary_indexes.load_all_secondary_indexes().await?;
    let nodes = gateways.nodes.load_all_nodes().await?;

    let mut indexes_by_resource: HashMap<_, Vec<_>> = HashMap::new();
    for index in indexes {
        indexes_by_resource.entry(index.resource_id).or_default().push(index);
    }
    for resource in &mut resources {
        resource.secondary_indexes = indexes_by_resource.remove(&resource.id).unwrap_or_default();
    }

    let mut resources_by_dimension: HashMap<_, Vec<_>> = HashMap::new();
    for resource in resources {
        resources_by_dimension
            .entry(resource.dimension_id)
            .or_default()
            .push(resource);
    }
    let mut nodes_by_dimension: HashMap<_, Vec<_>> = HashMap::new();
    for node in nodes {
        nodes_by_dimension.entry(node.dimension_id).or_default().push(node);
    }

    for dimension in &mut dimensions {
        dimension.resources = resources_by_dimension.remove(&dimension.id).unwrap_or_default();
        dimension.nodes = nodes_by_dimension.remove(&dimension.id).unwrap_or_default();
    }

    Ok(HiveGraph {
        revision: semaphore.revision,
        status: semaphore.status,
        dimensions,
    })
}
