//! Error types shared across the hive crates

use thiserror::Error;

/// Result type alias using [`HiveError`]
pub type Result<T> = std::result::Result<T, HiveError>;

/// Which lock scope refused a write.
///
/// `Copy` — small enum, pass by value at call sites.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LockScope {
    /// The hive-wide semaphore is read-only
    Hive,
    /// A data node is read-only
    Node,
    /// An individual partition key is read-only
    Key,
}

impl std::fmt::Display for LockScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockScope::Hive => write!(f, "hive"),
            LockScope::Node => write!(f, "node"),
            LockScope::Key => write!(f, "key"),
        }
    }
}

/// Domain error for all hive operations
///
/// One enum with a kind discriminant rather than per-operation error types;
/// gateway errors bubble up unchanged and the facade wraps them with context.
#[derive(Error, Debug)]
pub enum HiveError {
    /// Named entity or key absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// A sibling entity already carries this name
    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    /// A directory row already exists for this key
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// A referenced parent row (primary key or resource id) does not exist
    #[error("Missing parent: {0}")]
    MissingParent(String),

    /// The lock engine refused the operation; carries the refusing scope
    #[error("Read-only ({scope}): {reason}")]
    ReadOnly { scope: LockScope, reason: String },

    /// The assigner was asked to choose from an empty node set
    #[error("No writable node: {0}")]
    NoWritableNode(String),

    /// Storage driver failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Hive schema not installed at the target URI
    #[error("Hive metadata missing: {0}")]
    MetadataMissing(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HiveError {
    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a duplicate name error
    pub fn duplicate_name(msg: impl Into<String>) -> Self {
        Self::DuplicateName(msg.into())
    }

    /// Create a duplicate key error
    pub fn duplicate_key(msg: impl Into<String>) -> Self {
        Self::DuplicateKey(msg.into())
    }

    /// Create a missing parent error
    pub fn missing_parent(msg: impl Into<String>) -> Self {
        Self::MissingParent(msg.into())
    }

    /// Create a read-only error for the given scope
    pub fn read_only(scope: LockScope, reason: impl Into<String>) -> Self {
        Self::ReadOnly {
            scope,
            reason: reason.into(),
        }
    }

    /// Create a no writable node error
    pub fn no_writable_node(msg: impl Into<String>) -> Self {
        Self::NoWritableNode(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a metadata missing error
    pub fn metadata_missing(msg: impl Into<String>) -> Self {
        Self::MetadataMissing(msg.into())
    }

    /// True if this error is a lock refusal (any scope)
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::ReadOnly { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_display_carries_scope() {
        let err = HiveError::read_only(LockScope::Node, "node n1 is read-only");
        assert_eq!(format!("{}", err), "Read-only (node): node n1 is read-only");
        assert!(err.is_read_only());
    }

    #[test]
    fn test_constructors() {
        assert!(matches!(
            HiveError::not_found("user"),
            HiveError::NotFound(_)
        ));
        assert!(matches!(
            HiveError::duplicate_key("42"),
            HiveError::DuplicateKey(_)
        ));
        assert!(!HiveError::persistence("boom").is_read_only());
    }
}
