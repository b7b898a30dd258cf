//! Persistence gateways and key-routing directory for the hive
//!
//! This crate owns the two persisted halves of a hive:
//!
//! - The **metadata gateways**: narrow CRUD traits over the hive metadata
//!   tables (`partition_dimension`, `resource`, `secondary_index`, `node`,
//!   and the singleton `hive_semaphore` row)
//! - The **directory**: per-dimension key-routing tables mapping partition
//!   keys to nodes, resource ids to partition keys, and secondary keys to
//!   resource ids
//!
//! Both come with in-memory implementations suitable for tests and
//! single-process embedding. Database-backed implementations plug in behind
//! the same traits.

pub mod directory;
pub mod gateway;
pub mod memory_directory;
pub mod memory_meta;

pub use directory::{
    Directory, DirectoryProvider, PrimaryIndexRow, ResourceIndexRow, SecondaryIndexRow,
};
pub use gateway::{
    DimensionGateway, HiveSemaphoreGateway, MetadataGateways, NodeGateway, ResourceGateway,
    SecondaryIndexGateway,
};
pub use memory_directory::{MemoryDirectory, MemoryDirectoryProvider};
pub use memory_meta::MemoryMetadataStore;
