//! In-memory directory implementation for testing
//!
//! Stores all directory rows in `parking_lot::RwLock` maps held behind an
//! `Arc`, so handles opened for the same dimension at different times share
//! rows, the way re-opened database-backed directories would.

use crate::directory::{
    Directory, DirectoryProvider, PrimaryIndexRow, ResourceIndexRow, SecondaryIndexRow,
};
use async_trait::async_trait;
use chrono::Utc;
use hive_core::{
    HiveError, KeySemaphore, KeyValue, Node, ObjectId, PartitionDimension, Resource, Result,
    SecondaryIndex,
};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;

/// Directory tables of one partition dimension.
#[derive(Default)]
struct DimensionTables {
    /// partition key → rows (a key may exist on multiple nodes)
    primary: RwLock<HashMap<KeyValue, Vec<PrimaryIndexRow>>>,
    /// resource row id → (resource id value → row)
    resource: RwLock<HashMap<ObjectId, HashMap<KeyValue, ResourceIndexRow>>>,
    /// secondary index row id → (secondary key → rows)
    secondary: RwLock<HashMap<ObjectId, HashMap<KeyValue, Vec<SecondaryIndexRow>>>>,
}

/// In-memory [`Directory`] for one dimension.
#[derive(Clone)]
pub struct MemoryDirectory {
    dimension: String,
    tables: Arc<DimensionTables>,
}

impl Debug for MemoryDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDirectory")
            .field("dimension", &self.dimension)
            .field("primary_key_count", &self.tables.primary.read().len())
            .finish()
    }
}

impl MemoryDirectory {
    /// A standalone directory, not shared through a provider
    pub fn new(dimension: impl Into<String>) -> Self {
        Self {
            dimension: dimension.into(),
            tables: Arc::new(DimensionTables::default()),
        }
    }

    /// Name of the dimension this directory routes
    pub fn dimension(&self) -> &str {
        &self.dimension
    }

    fn semaphores_of_primary(&self, key: &KeyValue) -> Vec<KeySemaphore> {
        self.tables
            .primary
            .read()
            .get(key)
            .map(|rows| rows.iter().map(PrimaryIndexRow::semaphore).collect())
            .unwrap_or_default()
    }

    fn resource_row_primary_key(
        &self,
        resource: &Resource,
        resource_id: &KeyValue,
    ) -> Option<KeyValue> {
        self.tables
            .resource
            .read()
            .get(&resource.id)
            .and_then(|rows| rows.get(resource_id))
            .map(|row| row.primary_key.clone())
    }

    fn resource_id_known(&self, resource: &Resource, resource_id: &KeyValue) -> bool {
        if resource.is_partitioning {
            self.tables.primary.read().contains_key(resource_id)
        } else {
            self.tables
                .resource
                .read()
                .get(&resource.id)
                .is_some_and(|rows| rows.contains_key(resource_id))
        }
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn insert_primary_index_key(&self, node: &Node, key: &KeyValue) -> Result<()> {
        let mut primary = self.tables.primary.write();
        if primary.contains_key(key) {
            return Err(HiveError::duplicate_key(format!(
                "partition key {} already exists in dimension '{}'",
                key, self.dimension
            )));
        }
        primary.insert(key.clone(), vec![PrimaryIndexRow::new(node.id)]);
        Ok(())
    }

    async fn insert_resource_id(
        &self,
        resource: &Resource,
        resource_id: &KeyValue,
        primary_key: &KeyValue,
    ) -> Result<()> {
        if resource.is_partitioning {
            // The resource id is the partition key; there is no resource row.
            return Ok(());
        }
        if !self.tables.primary.read().contains_key(primary_key) {
            return Err(HiveError::missing_parent(format!(
                "partition key {} does not exist in dimension '{}'",
                primary_key, self.dimension
            )));
        }
        let mut table = self.tables.resource.write();
        let rows = table.entry(resource.id).or_default();
        if rows.contains_key(resource_id) {
            return Err(HiveError::duplicate_key(format!(
                "resource id {} already exists for resource '{}'",
                resource_id, resource.name
            )));
        }
        rows.insert(resource_id.clone(), ResourceIndexRow::new(primary_key.clone()));
        Ok(())
    }

    async fn insert_secondary_index_key(
        &self,
        index: &SecondaryIndex,
        resource: &Resource,
        secondary_key: &KeyValue,
        resource_id: &KeyValue,
    ) -> Result<()> {
        if !self.resource_id_known(resource, resource_id) {
            return Err(HiveError::missing_parent(format!(
                "resource id {} of resource '{}' does not exist",
                resource_id, resource.name
            )));
        }
        let mut table = self.tables.secondary.write();
        let rows = table.entry(index.id).or_default().entry(secondary_key.clone()).or_default();
        if rows.iter().any(|r| &r.resource_id == resource_id) {
            return Err(HiveError::duplicate_key(format!(
                "secondary key {} already points at resource id {} in index '{}'",
                secondary_key, resource_id, index.name
            )));
        }
        rows.push(SecondaryIndexRow::new(resource_id.clone()));
        Ok(())
    }

    async fn key_semaphores_of_primary_index_key(
        &self,
        key: &KeyValue,
    ) -> Result<Vec<KeySemaphore>> {
        Ok(self.semaphores_of_primary(key))
    }

    async fn key_semaphores_of_resource_id(
        &self,
        resource: &Resource,
        resource_id: &KeyValue,
    ) -> Result<Vec<KeySemaphore>> {
        if resource.is_partitioning {
            return Ok(self.semaphores_of_primary(resource_id));
        }
        Ok(self
            .resource_row_primary_key(resource, resource_id)
            .map(|key| self.semaphores_of_primary(&key))
            .unwrap_or_default())
    }

    async fn key_semaphores_of_secondary_index_key(
        &self,
        index: &SecondaryIndex,
        resource: &Resource,
        secondary_key: &KeyValue,
    ) -> Result<Vec<KeySemaphore>> {
        let resource_ids: Vec<KeyValue> = self
            .tables
            .secondary
            .read()
            .get(&index.id)
            .and_then(|rows| rows.get(secondary_key))
            .map(|rows| rows.iter().map(|r| r.resource_id.clone()).collect())
            .unwrap_or_default();

        let mut seen = HashSet::new();
        let mut semaphores = Vec::new();
        for resource_id in resource_ids {
            for semaphore in self
                .key_semaphores_of_resource_id(resource, &resource_id)
                .await?
            {
                if seen.insert(semaphore) {
                    semaphores.push(semaphore);
                }
            }
        }
        Ok(semaphores)
    }

    async fn primary_index_key_of_resource_id(
        &self,
        resource: &Resource,
        resource_id: &KeyValue,
    ) -> Result<Option<KeyValue>> {
        if resource.is_partitioning {
            // Identity: the resource id is the partition key.
            return Ok(self
                .tables
                .primary
                .read()
                .contains_key(resource_id)
                .then(|| resource_id.clone()));
        }
        Ok(self.resource_row_primary_key(resource, resource_id))
    }

    async fn resource_ids_of_primary_index_key(
        &self,
        resource: &Resource,
        key: &KeyValue,
    ) -> Result<Vec<KeyValue>> {
        if resource.is_partitioning {
            return Ok(self
                .tables
                .primary
                .read()
                .contains_key(key)
                .then(|| key.clone())
                .into_iter()
                .collect());
        }
        Ok(self
            .tables
            .resource
            .read()
            .get(&resource.id)
            .map(|rows| {
                rows.iter()
                    .filter(|(_, row)| &row.primary_key == key)
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn secondary_index_keys_of_resource_id(
        &self,
        index: &SecondaryIndex,
        resource_id: &KeyValue,
    ) -> Result<Vec<KeyValue>> {
        Ok(self
            .tables
            .secondary
            .read()
            .get(&index.id)
            .map(|rows| {
                rows.iter()
                    .filter(|(_, entries)| entries.iter().any(|r| &r.resource_id == resource_id))
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn does_primary_index_key_exist(&self, key: &KeyValue) -> Result<bool> {
        Ok(self.tables.primary.read().contains_key(key))
    }

    async fn does_resource_id_exist(
        &self,
        resource: &Resource,
        resource_id: &KeyValue,
    ) -> Result<bool> {
        Ok(self.resource_id_known(resource, resource_id))
    }

    async fn does_secondary_index_key_exist(
        &self,
        index: &SecondaryIndex,
        secondary_key: &KeyValue,
        resource_id: &KeyValue,
    ) -> Result<bool> {
        Ok(self
            .tables
            .secondary
            .read()
            .get(&index.id)
            .and_then(|rows| rows.get(secondary_key))
            .is_some_and(|rows| rows.iter().any(|r| &r.resource_id == resource_id)))
    }

    async fn update_primary_index_key_read_only(
        &self,
        key: &KeyValue,
        read_only: bool,
    ) -> Result<()> {
        let mut primary = self.tables.primary.write();
        let rows = primary.get_mut(key).ok_or_else(|| {
            HiveError::not_found(format!(
                "partition key {} in dimension '{}'",
                key, self.dimension
            ))
        })?;
        let now = Utc::now();
        for row in rows {
            row.read_only = read_only;
            row.last_updated = now;
        }
        Ok(())
    }

    async fn update_primary_index_key_of_resource_id(
        &self,
        resource: &Resource,
        resource_id: &KeyValue,
        new_primary_key: &KeyValue,
    ) -> Result<()> {
        if !self.tables.primary.read().contains_key(new_primary_key) {
            return Err(HiveError::missing_parent(format!(
                "partition key {} does not exist in dimension '{}'",
                new_primary_key, self.dimension
            )));
        }
        let mut table = self.tables.resource.write();
        let row = table
            .get_mut(&resource.id)
            .and_then(|rows| rows.get_mut(resource_id))
            .ok_or_else(|| {
                HiveError::not_found(format!(
                    "resource id {} of resource '{}'",
                    resource_id, resource.name
                ))
            })?;
        row.primary_key = new_primary_key.clone();
        row.last_updated = Utc::now();
        Ok(())
    }

    async fn delete_primary_index_key(&self, key: &KeyValue) -> Result<()> {
        if self.tables.primary.write().remove(key).is_none() {
            return Err(HiveError::not_found(format!(
                "partition key {} in dimension '{}'",
                key, self.dimension
            )));
        }
        Ok(())
    }

    async fn delete_resource_id(&self, resource: &Resource, resource_id: &KeyValue) -> Result<()> {
        let removed = self
            .tables
            .resource
            .write()
            .get_mut(&resource.id)
            .and_then(|rows| rows.remove(resource_id));
        if removed.is_none() {
            return Err(HiveError::not_found(format!(
                "resource id {} of resource '{}'",
                resource_id, resource.name
            )));
        }
        Ok(())
    }

    async fn delete_secondary_index_key(
        &self,
        index: &SecondaryIndex,
        secondary_key: &KeyValue,
        resource_id: &KeyValue,
    ) -> Result<()> {
        let mut table = self.tables.secondary.write();
        let rows = table
            .get_mut(&index.id)
            .and_then(|keys| keys.get_mut(secondary_key));
        let Some(rows) = rows else {
            return Err(HiveError::not_found(format!(
                "secondary key {} in index '{}'",
                secondary_key, index.name
            )));
        };
        let before = rows.len();
        rows.retain(|r| &r.resource_id != resource_id);
        if rows.len() == before {
            return Err(HiveError::not_found(format!(
                "secondary key {} pointing at resource id {} in index '{}'",
                secondary_key, resource_id, index.name
            )));
        }
        if rows.is_empty() {
            if let Some(keys) = table.get_mut(&index.id) {
                keys.remove(secondary_key);
            }
        }
        Ok(())
    }

    async fn delete_all_secondary_index_keys_of_resource_id(
        &self,
        resource: &Resource,
        resource_id: &KeyValue,
    ) -> Result<()> {
        let mut table = self.tables.secondary.write();
        for index in &resource.secondary_indexes {
            if let Some(keys) = table.get_mut(&index.id) {
                keys.retain(|_, rows| {
                    rows.retain(|r| &r.resource_id != resource_id);
                    !rows.is_empty()
                });
            }
        }
        Ok(())
    }
}

/// Opens [`MemoryDirectory`] handles over tables shared per dimension name.
#[derive(Debug, Default)]
pub struct MemoryDirectoryProvider {
    tables: RwLock<HashMap<String, Arc<DimensionTables>>>,
}

impl Debug for DimensionTables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DimensionTables")
            .field("primary_key_count", &self.primary.read().len())
            .finish()
    }
}

impl MemoryDirectoryProvider {
    /// Create an empty provider
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl DirectoryProvider for MemoryDirectoryProvider {
    fn open(&self, dimension: &PartitionDimension) -> Arc<dyn Directory> {
        let tables = {
            let mut map = self.tables.write();
            Arc::clone(
                map.entry(dimension.name.clone())
                    .or_insert_with(|| Arc::new(DimensionTables::default())),
            )
        };
        Arc::new(MemoryDirectory {
            dimension: dimension.name.clone(),
            tables,
        })
    }

    fn discard(&self, dimension_name: &str) {
        self.tables.write().remove(dimension_name);
    }
}
