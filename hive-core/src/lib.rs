//! Core types for the hive sharding directory
//!
//! A hive maps application-level keys to the physical database nodes of a
//! sharded deployment. This crate holds the pieces every other hive crate
//! builds on:
//!
//! - The metadata model: [`PartitionDimension`], [`Resource`],
//!   [`SecondaryIndex`], [`Node`], and the immutable [`HiveGraph`] snapshot
//! - Coordination records: [`KeySemaphore`] and [`HiveSemaphore`]
//! - The lock engine predicates composing hive, node, and key writability
//! - The [`Assigner`] policy choosing a node for each new partition key
//! - The shared [`HiveError`] domain error and observability counters

pub mod assigner;
pub mod error;
pub mod graph;
pub mod ids;
pub mod key;
pub mod lock;
pub mod meta;
pub mod semaphore;
pub mod stats;
pub mod status;

pub use assigner::{Assigner, HashAssigner};
pub use error::{HiveError, LockScope, Result};
pub use graph::HiveGraph;
pub use ids::{is_persisted, ObjectId, NEW_OBJECT_ID};
pub use key::{KeyType, KeyValue};
pub use meta::{Node, PartitionDimension, Resource, SecondaryIndex};
pub use semaphore::{HiveSemaphore, KeySemaphore};
pub use stats::{HiveStats, StatsSnapshot};
pub use status::{Lockable, Status};
