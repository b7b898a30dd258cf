//! Node assignment policy for new partition keys
//!
//! On every primary-key insertion the facade selects the dimension's writable
//! nodes and asks the assigner to pick one. Assignment must be deterministic
//! for the same (sorted node ids, key) input so that cooperating processes
//! agree on placement without coordination.

use crate::error::{HiveError, Result};
use crate::key::KeyValue;
use crate::meta::Node;
use std::fmt::Debug;

/// Pluggable node-selection policy.
pub trait Assigner: Send + Sync + Debug {
    /// Choose one node from a non-empty set of writable nodes.
    ///
    /// Implementations must never return a node that is not writable and
    /// must be deterministic for the same `(sorted node ids, key)` input.
    /// Fails `NoWritableNode` when `writable_nodes` is empty.
    fn choose<'a>(&self, writable_nodes: &[&'a Node], key: &KeyValue) -> Result<&'a Node>;
}

/// Default assigner: hash of the key, modulo the id-sorted node list.
///
/// Sorting by id first makes the choice independent of discovery order, so
/// every process sharing the hive computes the same placement.
#[derive(Clone, Copy, Debug, Default)]
pub struct HashAssigner;

impl HashAssigner {
    /// Create a new hash assigner
    pub fn new() -> Self {
        Self
    }
}

impl Assigner for HashAssigner {
    fn choose<'a>(&self, writable_nodes: &[&'a Node], key: &KeyValue) -> Result<&'a Node> {
        if writable_nodes.is_empty() {
            return Err(HiveError::no_writable_node(format!(
                "no writable node available for key {}",
                key
            )));
        }

        let mut sorted: Vec<&Node> = writable_nodes.to_vec();
        sorted.sort_by_key(|n| n.id);

        let idx = (key.route_hash() % sorted.len() as u64) as usize;
        Ok(sorted[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;

    fn node(id: i32, name: &str) -> Node {
        Node {
            id,
            dimension_id: 1,
            name: name.to_string(),
            uri: format!("db://{}", name),
            status: Status::Writable,
        }
    }

    #[test]
    fn test_choose_is_deterministic() {
        let (a, b, c) = (node(1, "a"), node(2, "b"), node(3, "c"));
        let assigner = HashAssigner::new();
        let key = KeyValue::from(42);

        let first = assigner.choose(&[&a, &b, &c], &key).unwrap().id;
        let second = assigner.choose(&[&c, &a, &b], &key).unwrap().id;
        // Same choice regardless of input order
        assert_eq!(first, second);
    }

    #[test]
    fn test_choose_spreads_keys() {
        let (a, b, c) = (node(1, "a"), node(2, "b"), node(3, "c"));
        let assigner = HashAssigner::new();

        let mut chosen = std::collections::HashSet::new();
        for k in 0..64i64 {
            chosen.insert(assigner.choose(&[&a, &b, &c], &KeyValue::from(k)).unwrap().id);
        }
        // 64 keys over 3 nodes should hit more than one node
        assert!(chosen.len() > 1);
    }

    #[test]
    fn test_empty_input_fails() {
        let assigner = HashAssigner::new();
        let err = assigner.choose(&[], &KeyValue::from(1)).unwrap_err();
        assert!(matches!(err, HiveError::NoWritableNode(_)));
    }
}
