use crate::config::{CONNECT_TIMEOUT, PING_TIMEOUT};
use crate::error::{ConnectionError, StoreError};
use crate::services::store::DocumentStore;
use async_trait::async_trait;
use mongodb::{
    bson::{doc, Document},
    options::{ClientOptions, FindOneOptions, ReadPreference, SelectionCriteria},
    Client as MongoClient, Collection, Database,
};

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    /// Open a client and verify it can reach a server.
    ///
    /// Establishing the session (URI parsing and SRV/DNS resolution
    /// included) is bounded by [`CONNECT_TIMEOUT`]; the liveness probe that
    /// follows gets its own [`PING_TIMEOUT`]. There is no retry.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, ConnectionError> {
        tracing::info!(database = %database, "Connecting to MongoDB");

        let client = tokio::time::timeout(CONNECT_TIMEOUT, async {
            let options = ClientOptions::parse(uri).await?;
            MongoClient::with_options(options)
        })
        .await
        .map_err(|_| {
            ConnectionError::Establish(anyhow::anyhow!("timed out after {:?}", CONNECT_TIMEOUT))
        })?
        .map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            ConnectionError::Establish(anyhow::Error::new(e))
        })?;

        let db = client.database(database);
        let mongo = Self { client, db };

        tokio::time::timeout(PING_TIMEOUT, mongo.run_ping())
            .await
            .map_err(|_| {
                ConnectionError::Liveness(anyhow::anyhow!("timed out after {:?}", PING_TIMEOUT))
            })?
            .map_err(|e| {
                tracing::error!("MongoDB liveness probe failed: {}", e);
                ConnectionError::Liveness(anyhow::Error::new(e))
            })?;

        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(mongo)
    }

    async fn run_ping(&self) -> Result<(), mongodb::error::Error> {
        let criteria = SelectionCriteria::ReadPreference(ReadPreference::PrimaryPreferred {
            options: Default::default(),
        });
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, criteria)
            .await?;
        Ok(())
    }

    pub fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl DocumentStore for MongoDb {
    async fn ping(&self) -> Result<(), StoreError> {
        self.run_ping().await.map_err(|e| {
            tracing::error!("MongoDB health check failed: {}", e);
            StoreError::from(e)
        })
    }

    async fn fetch_latest(&self, collection: &str) -> Result<Document, StoreError> {
        let options = FindOneOptions::builder().sort(doc! { "_id": -1 }).build();

        self.collection(collection)
            .find_one(doc! {}, options)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
            })
    }

    async fn insert(&self, collection: &str, document: &Document) -> Result<(), StoreError> {
        self.collection(collection).insert_one(document, None).await?;
        Ok(())
    }

    async fn disconnect(&self) {
        tracing::info!("Disconnecting from MongoDB");
        self.client.clone().shutdown().await;
    }
}
