//! Dynamically typed key values routed through the directory
//!
//! Directory tables are declared with a SQL type code per key column; the
//! values that flow through lookups and inserts are [`KeyValue`]s carrying
//! the matching variant.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// SQL type code of a key column.
///
/// `Copy` — small enum, pass by value at call sites.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    /// Integer key column
    Integer,
    /// Character key column
    Text,
    /// Date key column
    Date,
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyType::Integer => write!(f, "integer"),
            KeyType::Text => write!(f, "text"),
            KeyType::Date => write!(f, "date"),
        }
    }
}

/// A key value: a partition key, a resource id, or a secondary index key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyValue {
    /// Integer value
    Int(i64),
    /// Character value
    Text(String),
    /// Date value
    Date(NaiveDate),
}

impl KeyValue {
    /// The column type code this value matches
    pub fn key_type(&self) -> KeyType {
        match self {
            KeyValue::Int(_) => KeyType::Integer,
            KeyValue::Text(_) => KeyType::Text,
            KeyValue::Date(_) => KeyType::Date,
        }
    }

    /// Stable hash used for deterministic node assignment.
    ///
    /// Must produce identical results across processes sharing a hive, so it
    /// uses `DefaultHasher::new()` (fixed keys) rather than a randomized
    /// `RandomState`.
    pub fn route_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

impl std::fmt::Display for KeyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyValue::Int(v) => write!(f, "{}", v),
            KeyValue::Text(v) => write!(f, "{}", v),
            KeyValue::Date(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for KeyValue {
    fn from(v: i64) -> Self {
        KeyValue::Int(v)
    }
}

impl From<i32> for KeyValue {
    fn from(v: i32) -> Self {
        KeyValue::Int(v as i64)
    }
}

impl From<&str> for KeyValue {
    fn from(v: &str) -> Self {
        KeyValue::Text(v.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(v: String) -> Self {
        KeyValue::Text(v)
    }
}

impl From<NaiveDate> for KeyValue {
    fn from(v: NaiveDate) -> Self {
        KeyValue::Date(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_type_of_value() {
        assert_eq!(KeyValue::from(42).key_type(), KeyType::Integer);
        assert_eq!(KeyValue::from("NY").key_type(), KeyType::Text);
    }

    #[test]
    fn test_route_hash_is_deterministic() {
        let a = KeyValue::from("user-7");
        let b = KeyValue::from("user-7");
        assert_eq!(a.route_hash(), b.route_hash());
        assert_ne!(a.route_hash(), KeyValue::from("user-8").route_hash());
    }

    #[test]
    fn test_int_and_text_do_not_collide() {
        // "42" the string and 42 the integer are distinct keys
        assert_ne!(KeyValue::from(42), KeyValue::from("42"));
    }

    #[test]
    fn test_display() {
        assert_eq!(KeyValue::from(42).to_string(), "42");
        assert_eq!(KeyValue::from("NY").to_string(), "NY");
    }
}
