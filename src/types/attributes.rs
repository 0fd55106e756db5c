//! Attribute snapshot type.
//!
//! [`Attributes`] is the unit the cache stores and hands out: an ordered
//! mapping of attribute name to JSON value. The engine replaces its
//! snapshot wholesale on every successful update and always hands readers
//! a copy, so no reader ever observes a half-applied update.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MuninError, Result};

/// An ordered attribute-name → value map.
///
/// ```rust
/// # use munin::Attributes;
/// let mut attrs = Attributes::new();
/// attrs.set("temp", 20)?;
/// attrs.set("state", "on")?;
/// assert_eq!(attrs.len(), 2);
/// # Ok::<(), munin::MuninError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, Value>);

impl Attributes {
    /// Create an empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an attribute set from a JSON object string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set an attribute, replacing any existing value for the same key.
    ///
    /// An empty key is rejected with [`MuninError::InvalidInput`] — a
    /// keyless attribute is unreachable by any later read, so the mistake
    /// is surfaced to the caller rather than swallowed.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        if key.is_empty() {
            return Err(MuninError::InvalidInput(
                "attribute key must not be empty".into(),
            ));
        }
        self.0.insert(key, value.into());
        Ok(())
    }

    /// Look up an attribute by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Remove an attribute, returning its previous value if present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Whether the set carries no attributes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
