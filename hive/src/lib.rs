//! Horizontal-partitioning directory for sharded deployments
//!
//! Applications ask "where does the record with partition key K live?" and
//! the hive answers with a connection to the correct shard. It also records
//! secondary-index keys so records can be located by attributes other than
//! the partition key, and enforces read-only locking at three granularities
//! (whole hive, individual node, individual partition key) so operators can
//! freeze writes during migrations.
//!
//! # Example
//!
//! ```
//! use hive::{AccessType, Hive};
//! use hive_core::{KeyType, KeyValue, Node, PartitionDimension};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> hive_core::Result<()> {
//! let hive = Hive::load_in_memory("hive://example").await?;
//! hive.add_partition_dimension(PartitionDimension::new("user", KeyType::Integer))
//!     .await?;
//! hive.add_node("user", Node::new("n1", "db://a")).await?;
//!
//! hive.insert_primary_index_key("user", &KeyValue::from(42)).await?;
//! let conn = hive
//!     .connection_for_primary_key("user", &KeyValue::from(42), AccessType::Read)
//!     .await?;
//! assert!(conn.read_only);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod directory_facade;
pub mod facade;

pub use config::HiveConfig;
pub use connection::{AccessType, ConnectionSource, MemoryConnectionSource, NodeConnection};
pub use directory_facade::DirectoryFacade;
pub use facade::Hive;

pub use hive_core::{
    Assigner, HashAssigner, HiveError, HiveGraph, HiveSemaphore, HiveStats, KeySemaphore, KeyType,
    KeyValue, LockScope, Node, ObjectId, PartitionDimension, Resource, Result, SecondaryIndex,
    Status, NEW_OBJECT_ID,
};
pub use hive_directory::{
    Directory, DirectoryProvider, MemoryDirectoryProvider, MemoryMetadataStore, MetadataGateways,
};
pub use hive_sync::{SharedHive, SyncEvent, SyncHandle, SyncOutcome, Synchronizer};
