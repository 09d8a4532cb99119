//! Run-scoped result store.
//!
//! One map behind a lock, shared by cloning the handle. Writes are
//! last-write-wins. A key that was never written is [`StoreError::Missing`];
//! a key holding an empty value is present.

use crate::error::StoreError;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Well-known keys written by the ingestion and enrichment entry points.
pub mod keys {
    pub const PDF_CONTENT: &str = "pdf_content";
    pub const DOCUMENT_STRUCTURE: &str = "document_structure";
    pub const CHUNKS: &str = "chunks";
    pub const PRESENTATION_CHUNKS: &str = "presentation_chunks";
    pub const SLIDES: &str = "slides";
    pub const SLIDE_RESULTS: &str = "slide_results";
}

#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    inner: Arc<RwLock<HashMap<String, Value>>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialise and store `value` under `key`, replacing any previous value.
    pub fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value).map_err(|source| StoreError::Serialization {
            key: key.to_string(),
            source,
        })?;
        self.put_value(key, value);
        Ok(())
    }

    pub fn put_value(&self, key: &str, value: Value) {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if map.insert(key.to_string(), value).is_some() {
            debug!("Store key '{}' overwritten", key);
        }
    }

    pub fn get(&self, key: &str) -> Result<Value, StoreError> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(key).cloned().ok_or_else(|| StoreError::Missing {
            key: key.to_string(),
        })
    }

    /// Fetch and deserialise.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, StoreError> {
        let value = self.get(key)?;
        serde_json::from_value(value).map_err(|source| StoreError::Serialization {
            key: key.to_string(),
            source,
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    /// Drop everything; used at the end of a run.
    pub fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_differs_from_empty() {
        let store = ResultStore::new();
        store.put(keys::CHUNKS, &Vec::<String>::new()).unwrap();
        assert_eq!(store.get(keys::CHUNKS).unwrap(), json!([]));
        assert!(matches!(
            store.get(keys::SLIDES),
            Err(StoreError::Missing { ref key }) if key == "slides"
        ));
    }

    #[test]
    fn last_write_wins_across_clones() {
        let store = ResultStore::new();
        let other = store.clone();
        store.put("k", &1).unwrap();
        other.put("k", &2).unwrap();
        assert_eq!(store.get_as::<i32>("k").unwrap(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_as_reports_type_mismatch() {
        let store = ResultStore::new();
        store.put_value("k", json!("text"));
        assert!(matches!(
            store.get_as::<Vec<u32>>("k"),
            Err(StoreError::Serialization { .. })
        ));
    }

    #[test]
    fn keys_remove_clear() {
        let store = ResultStore::new();
        store.put_value("b", json!(1));
        store.put_value("a", json!(2));
        assert_eq!(store.keys(), vec!["a", "b"]);
        assert_eq!(store.remove("a"), Some(json!(2)));
        assert!(!store.contains("a"));
        store.clear();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn concurrent_writers() {
        let store = ResultStore::new();
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.put(&format!("slide_{i}"), &i).unwrap() })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.len(), 16);
    }
}
