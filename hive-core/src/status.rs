//! Writability status shared by the hive, nodes, and partition keys
//!
//! All three lock scopes are flat two-state machines over the same enum;
//! effective writability is the AND of the scopes (see the lock engine).

use serde::{Deserialize, Serialize};

/// Writability of a lockable scope.
///
/// `Copy` — small enum, pass by value at call sites.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Writes are permitted
    Writable,
    /// Writes are refused; reads still succeed
    ReadOnly,
}

impl Status {
    /// True if this status permits writes
    pub fn is_writable(&self) -> bool {
        matches!(self, Status::Writable)
    }

    /// Build a status from a persisted `read_only` column
    pub fn from_read_only(read_only: bool) -> Self {
        if read_only {
            Status::ReadOnly
        } else {
            Status::Writable
        }
    }

    /// The persisted `read_only` column value for this status
    pub fn as_read_only(&self) -> bool {
        matches!(self, Status::ReadOnly)
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Writable
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Writable => write!(f, "writable"),
            Status::ReadOnly => write!(f, "read-only"),
        }
    }
}

/// Anything with a writability status.
pub trait Lockable {
    /// Current status of this scope
    fn status(&self) -> Status;
}
