use crate::error::StoreError;
use crate::services::store::DocumentStore;
use async_trait::async_trait;
use dashmap::DashMap;
use mongodb::bson::{oid::ObjectId, Document};

/// In-process store with the same observable behavior as the MongoDB
/// backend: `_id` is assigned on insert and placed first, and the latest
/// document is the last one inserted. Nothing survives a restart.
///
/// A caller-supplied `_id` is kept but does not affect ordering, whereas
/// MongoDB orders by `_id`. Form submissions never carry one, so the two
/// backends agree for everything the HTTP surface can write.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn fetch_latest(&self, collection: &str) -> Result<Document, StoreError> {
        self.collections
            .get(collection)
            .and_then(|docs| docs.last().cloned())
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
            })
    }

    async fn insert(&self, collection: &str, document: &Document) -> Result<(), StoreError> {
        let mut stored = Document::new();
        let id = match document.get("_id") {
            Some(id) => id.clone(),
            None => ObjectId::new().into(),
        };
        stored.insert("_id", id);
        for (key, value) in document.iter().filter(|(key, _)| key.as_str() != "_id") {
            stored.insert(key.clone(), value.clone());
        }

        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(stored);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;
    use std::sync::Arc;

    #[tokio::test]
    async fn empty_collection_is_not_found() {
        let store = MemoryStore::new();
        let err = store.fetch_latest("never-written").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn latest_is_last_inserted() {
        let store = MemoryStore::new();
        store.insert("people", &doc! { "name": "d1" }).await.unwrap();
        store.insert("people", &doc! { "name": "d2" }).await.unwrap();

        let latest = store.fetch_latest("people").await.unwrap();
        assert_eq!(latest.get_str("name").unwrap(), "d2");
        assert_eq!(store.len("people"), 2);
    }

    #[tokio::test]
    async fn id_is_placed_first_and_order_preserved() {
        let store = MemoryStore::new();
        store
            .insert("people", &doc! { "b": "1", "a": "2", "c": "3" })
            .await
            .unwrap();

        let latest = store.fetch_latest("people").await.unwrap();
        let keys: Vec<&str> = latest.keys().map(String::as_str).collect();
        assert_eq!(keys, ["_id", "b", "a", "c"]);
    }

    #[tokio::test]
    async fn same_document_twice_creates_two_entries() {
        let store = MemoryStore::new();
        let data = doc! { "name": "magnus" };
        store.insert("people", &data).await.unwrap();
        store.insert("people", &data).await.unwrap();
        assert_eq!(store.len("people"), 2);
    }

    #[tokio::test]
    async fn concurrent_inserts_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.insert("counter", &doc! { "n": i }).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.len("counter"), 32);
        assert!(store.is_empty("other"));
    }
}
