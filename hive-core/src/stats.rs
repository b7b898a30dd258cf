//! Connection and directory counters for the optional observability sink

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic operation counters for one hive instance.
///
/// All counters are relaxed atomics; they are observability data, not
/// synchronization points.
#[derive(Debug, Default)]
pub struct HiveStats {
    new_read_connections: AtomicU64,
    new_write_connections: AtomicU64,
    connection_failures: AtomicU64,
    directory_read_count: AtomicU64,
    directory_write_count: AtomicU64,
}

/// Point-in-time view of the counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub new_read_connections: u64,
    pub new_write_connections: u64,
    pub connection_failures: u64,
    pub directory_read_count: u64,
    pub directory_write_count: u64,
}

impl HiveStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully opened read connection
    pub fn record_read_connection(&self) {
        self.new_read_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successfully opened read-write connection
    pub fn record_write_connection(&self) {
        self.new_write_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed connection attempt (driver, lock, or SQL failure)
    pub fn record_connection_failure(&self) {
        self.connection_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a directory read operation
    pub fn record_directory_read(&self) {
        self.directory_read_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a directory write operation
    pub fn record_directory_write(&self) {
        self.directory_write_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            new_read_connections: self.new_read_connections.load(Ordering::Relaxed),
            new_write_connections: self.new_write_connections.load(Ordering::Relaxed),
            connection_failures: self.connection_failures.load(Ordering::Relaxed),
            directory_read_count: self.directory_read_count.load(Ordering::Relaxed),
            directory_write_count: self.directory_write_count.load(Ordering::Relaxed),
        }
    }
}
