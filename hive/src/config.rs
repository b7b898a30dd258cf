//! Configuration for a hive instance
//!
//! One explicit struct passed at load time; no module-level state or
//! environment lookups.

use hive_sync::DEFAULT_SYNC_INTERVAL;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bootstrap configuration for [`crate::Hive::load`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiveConfig {
    /// URI of the hive metadata database
    pub uri: String,

    /// Enable the connection and directory counters
    pub performance_monitoring: bool,

    /// Period of the background sync daemon
    #[serde(with = "duration_millis")]
    pub sync_interval: Duration,
}

impl HiveConfig {
    /// Configuration with defaults: monitoring off, 1 s sync period
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            performance_monitoring: false,
            sync_interval: DEFAULT_SYNC_INTERVAL,
        }
    }

    /// Enable performance monitoring
    pub fn with_performance_monitoring(mut self) -> Self {
        self.performance_monitoring = true;
        self
    }

    /// Override the background sync period
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        (value.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
