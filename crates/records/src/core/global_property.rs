//! Global property resolution.
//!
//! Site-configurable vocabulary (for example which concept represents a
//! "severe" reaction) is stored as named global properties. Consumers take a
//! [`GlobalPropertyResolver`] by reference rather than reading a process-wide
//! registry.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::StorageResult;

/// Resolves named configuration keys to their current values.
pub trait GlobalPropertyResolver: Send + Sync {
    /// Returns the value of `key`, or `None` if the property is not set.
    fn get_global_property(&self, key: &str) -> StorageResult<Option<String>>;
}

/// A mutable store of global properties.
pub trait GlobalPropertyStore: GlobalPropertyResolver {
    /// Sets `key` to `value`, replacing any previous value.
    fn set_global_property(&self, key: &str, value: &str) -> StorageResult<()>;
}

/// In-memory global properties.
#[derive(Debug, Default)]
pub struct InMemoryGlobalProperties {
    properties: RwLock<HashMap<String, String>>,
}

impl InMemoryGlobalProperties {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with the given properties.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let properties = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            properties: RwLock::new(properties),
        }
    }
}

impl GlobalPropertyResolver for InMemoryGlobalProperties {
    fn get_global_property(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.properties.read().get(key).cloned())
    }
}

impl GlobalPropertyStore for InMemoryGlobalProperties {
    fn set_global_property(&self, key: &str, value: &str) -> StorageResult<()> {
        self.properties
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
