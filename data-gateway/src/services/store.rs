use crate::error::StoreError;
use async_trait::async_trait;
use mongodb::bson::Document;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Backend capability the gateway needs from a document store.
///
/// Implementations must be safe to share across every in-flight request.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Liveness probe.
    async fn ping(&self) -> Result<(), StoreError>;

    /// The document with the greatest store-assigned `_id` in `collection`.
    async fn fetch_latest(&self, collection: &str) -> Result<Document, StoreError>;

    /// Append `document` to `collection`, creating the collection on first
    /// write. Not idempotent.
    async fn insert(&self, collection: &str, document: &Document) -> Result<(), StoreError>;

    /// Best-effort release of backend resources at shutdown.
    async fn disconnect(&self) {}
}

/// Document access keyed by caller-supplied collection names.
///
/// Every operation runs under a deadline; once it elapses the operation is
/// abandoned with [`StoreError::Timeout`]. An abandoned insert may or may not
/// have reached the store.
#[derive(Clone)]
pub struct DataService {
    store: Arc<dyn DocumentStore>,
}

impl DataService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub async fn ping(&self, deadline: Duration) -> Result<(), StoreError> {
        within(deadline, self.store.ping()).await
    }

    pub async fn fetch_latest(
        &self,
        collection: &str,
        deadline: Duration,
    ) -> Result<Document, StoreError> {
        validate_collection(collection)?;
        within(deadline, self.store.fetch_latest(collection)).await
    }

    pub async fn insert(
        &self,
        collection: &str,
        document: &Document,
        deadline: Duration,
    ) -> Result<(), StoreError> {
        validate_collection(collection)?;
        within(deadline, self.store.insert(collection, document)).await?;
        tracing::debug!(collection = %collection, fields = document.len(), "Document inserted");
        Ok(())
    }
}

async fn within<T, F>(deadline: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| StoreError::Timeout(deadline))?
}

// MongoDB namespaces cannot be empty or contain NUL; anything else is passed
// through untouched.
fn validate_collection(collection: &str) -> Result<(), StoreError> {
    if collection.is_empty() || collection.contains('\0') {
        return Err(StoreError::InvalidCollection(collection.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryStore;
    use mongodb::bson::doc;

    struct SlowStore;

    #[async_trait]
    impl DocumentStore for SlowStore {
        async fn ping(&self) -> Result<(), StoreError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }

        async fn fetch_latest(&self, _collection: &str) -> Result<Document, StoreError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Document::new())
        }

        async fn insert(&self, _collection: &str, _document: &Document) -> Result<(), StoreError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    const DEADLINE: Duration = Duration::from_secs(1);

    #[tokio::test(start_paused = true)]
    async fn elapsed_deadline_is_a_timeout() {
        let service = DataService::new(Arc::new(SlowStore));

        let err = service.fetch_latest("people", DEADLINE).await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout(d) if d == DEADLINE));

        let err = service
            .insert("people", &doc! { "name": "magnus" }, DEADLINE)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Timeout(_)));

        assert!(matches!(
            service.ping(DEADLINE).await,
            Err(StoreError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn rejects_unusable_collection_names() {
        let service = DataService::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            service.fetch_latest("", DEADLINE).await,
            Err(StoreError::InvalidCollection(_))
        ));
        assert!(matches!(
            service.insert("a\0b", &Document::new(), DEADLINE).await,
            Err(StoreError::InvalidCollection(_))
        ));
    }

    #[tokio::test]
    async fn insert_then_fetch_returns_same_fields() {
        let service = DataService::new(Arc::new(MemoryStore::new()));
        let data = doc! { "name": "magnus", "age": 123 };

        service.insert("people", &data, DEADLINE).await.unwrap();
        let latest = service.fetch_latest("people", DEADLINE).await.unwrap();

        assert_eq!(latest.len(), 3);
        assert_eq!(latest.get_str("name").unwrap(), "magnus");
        assert_eq!(latest.get_i32("age").unwrap(), 123);
        assert!(latest.get_object_id("_id").is_ok());
        // The caller's document is not touched by the insert.
        assert!(!data.contains_key("_id"));
    }
}
