//! The lock engine: effective-writability checks across the three scopes
//!
//! A key is effectively writable iff the hive is writable AND, for every
//! semaphore the directory returns for that key, the semaphore's node is
//! writable AND the semaphore itself is writable. The checks here are
//! advisory predicates over persisted state; they never retry.

use crate::error::{HiveError, LockScope, Result};
use crate::meta::Node;
use crate::semaphore::KeySemaphore;
use crate::status::Status;
use std::fmt::Display;

/// Require the hive-wide status to permit writes.
pub fn require_hive_writable(hive_status: Status, operation: &str) -> Result<()> {
    if hive_status.is_writable() {
        Ok(())
    } else {
        Err(HiveError::read_only(
            LockScope::Hive,
            format!("{}: the hive is currently read-only", operation),
        ))
    }
}

/// Require a node to permit writes.
pub fn require_node_writable(node: &Node, operation: &str) -> Result<()> {
    if node.status.is_writable() {
        Ok(())
    } else {
        Err(HiveError::read_only(
            LockScope::Node,
            format!("{}: node '{}' is currently read-only", operation, node.name),
        ))
    }
}

/// Require a single key semaphore to permit writes.
pub fn require_semaphore_writable(
    semaphore: &KeySemaphore,
    key: &dyn Display,
    operation: &str,
) -> Result<()> {
    if semaphore.status.is_writable() {
        Ok(())
    } else {
        Err(HiveError::read_only(
            LockScope::Key,
            format!("{}: key {} is currently read-only", operation, key),
        ))
    }
}

/// Require writability across all three scopes for a key's semaphore set.
///
/// `node_of` resolves a semaphore's node id to the node; a semaphore whose
/// node is unknown to the current graph fails the node check as not found.
/// Any non-writable element fails the whole predicate.
pub fn require_semaphores_writable<'a, F>(
    hive_status: Status,
    semaphores: &[KeySemaphore],
    node_of: F,
    key: &dyn Display,
    operation: &str,
) -> Result<()>
where
    F: Fn(crate::ids::ObjectId) -> Option<&'a Node>,
{
    require_hive_writable(hive_status, operation)?;
    for semaphore in semaphores {
        let node = node_of(semaphore.node_id).ok_or_else(|| {
            HiveError::not_found(format!(
                "{}: node id {} referenced by key {} is not in the hive",
                operation, semaphore.node_id, key
            ))
        })?;
        require_node_writable(node, operation)?;
        require_semaphore_writable(semaphore, key, operation)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;

    fn node(id: i32, status: Status) -> Node {
        Node {
            id,
            dimension_id: 1,
            name: format!("n{}", id),
            uri: format!("db://n{}", id),
            status,
        }
    }

    #[test]
    fn test_hive_read_only_blocks() {
        let err = require_hive_writable(Status::ReadOnly, "inserting key").unwrap_err();
        assert!(matches!(
            err,
            HiveError::ReadOnly {
                scope: LockScope::Hive,
                ..
            }
        ));
    }

    #[test]
    fn test_all_writable_passes() {
        let nodes = vec![node(1, Status::Writable)];
        let semaphores = vec![KeySemaphore::new(1, Status::Writable)];
        let result = require_semaphores_writable(
            Status::Writable,
            &semaphores,
            |id| nodes.iter().find(|n| n.id == id),
            &42,
            "inserting key",
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_any_read_only_semaphore_fails() {
        let nodes = vec![node(1, Status::Writable), node(2, Status::Writable)];
        let semaphores = vec![
            KeySemaphore::new(1, Status::Writable),
            KeySemaphore::new(2, Status::ReadOnly),
        ];
        let err = require_semaphores_writable(
            Status::Writable,
            &semaphores,
            |id| nodes.iter().find(|n| n.id == id),
            &42,
            "deleting key",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            HiveError::ReadOnly {
                scope: LockScope::Key,
                ..
            }
        ));
    }

    #[test]
    fn test_read_only_node_fails_before_key() {
        let nodes = vec![node(1, Status::ReadOnly)];
        let semaphores = vec![KeySemaphore::new(1, Status::ReadOnly)];
        let err = require_semaphores_writable(
            Status::Writable,
            &semaphores,
            |id| nodes.iter().find(|n| n.id == id),
            &42,
            "deleting key",
        )
        .unwrap_err();
        // Node scope reported first: the node check precedes the key check
        assert!(matches!(
            err,
            HiveError::ReadOnly {
                scope: LockScope::Node,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_node_is_not_found() {
        let semaphores = vec![KeySemaphore::new(9, Status::Writable)];
        let err = require_semaphores_writable(
            Status::Writable,
            &semaphores,
            |_| None,
            &42,
            "updating key",
        )
        .unwrap_err();
        assert!(matches!(err, HiveError::NotFound(_)));
    }
}
