//! Record identities.
//!
//! A record is identified by its type name plus the stringified values of its
//! primary-key attributes, in declaration order. Two records with equal
//! identities represent the same remote row.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered mapping of primary-key attribute name to stringified value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrimaryKey(Vec<(String, String)>);

impl PrimaryKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a key part. Order of insertion is the declaration order.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Attribute names making up the key.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    /// Stringified values making up the key.
    pub fn values(&self) -> Vec<String> {
        self.0.iter().map(|(_, value)| value.clone()).collect()
    }

    /// Looks up the value of a single key part.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for PrimaryKey {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Canonical identity of a record: type name plus primary-key values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    pub record_type: String,
    pub key: Vec<String>,
}

impl Identity {
    pub fn new(record_type: impl Into<String>, key: Vec<String>) -> Self {
        Self {
            record_type: record_type.into(),
            key,
        }
    }

    /// Builds an identity from a type name and its resolved primary key.
    pub fn from_primary_key(record_type: impl Into<String>, primary_key: &PrimaryKey) -> Self {
        Self::new(record_type, primary_key.values())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.record_type, self.key.join(", "))
    }
}
