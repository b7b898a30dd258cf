//! Revision-driven synchronization between processes sharing a hive
//!
//! Every metadata mutation committed through the hive facade bumps the
//! persisted semaphore revision. This crate watches that revision: when the
//! persisted value diverges from the locally cached snapshot, the whole
//! metadata graph is reloaded from the gateways and swapped in atomically.
//!
//! - [`SharedHive`]: copy-on-write holder of the current [`hive_core::HiveGraph`]
//! - [`load_graph`]: gateway rows → composed graph
//! - [`Synchronizer`]: revision comparison, reload, and the background timer

pub mod daemon;
pub mod loader;
pub mod state;

pub use daemon::{SyncEvent, SyncHandle, SyncOutcome, Synchronizer, DEFAULT_SYNC_INTERVAL};
pub use loader::load_graph;
pub use state::SharedHive;
