#![allow(dead_code)]

use async_trait::async_trait;
use axum::{body::Body, http::Request, Router};
use data_gateway::config::GatewayConfig;
use data_gateway::error::StoreError;
use data_gateway::services::{DocumentStore, MemoryStore};
use data_gateway::startup::{build_router, AppState, Application};
use http_body_util::BodyExt;
use mongodb::bson::Document;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

pub fn test_config(port: u16) -> GatewayConfig {
    let common = CoreConfig {
        port,
        ..CoreConfig::default()
    };
    GatewayConfig::from_lookup(common, |key| match key {
        "MONGO_URI" => Some("mongodb://localhost:27017".to_string()),
        "STORE_BACKEND" => Some("memory".to_string()),
        "REQUEST_TIMEOUT_SECS" => Some("2".to_string()),
        _ => None,
    })
    .expect("Failed to build test configuration")
}

/// Router over `store`, driven in-process with `oneshot`.
pub fn router(store: Arc<dyn DocumentStore>) -> Router {
    build_router(AppState::new(test_config(0), store))
}

pub async fn send(router: &Router, request: Request<Body>) -> (u16, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status().as_u16();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", FORM_CONTENT_TYPE)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// A store whose every operation fails like an unreachable server.
pub struct UnreachableStore;

#[async_trait]
impl DocumentStore for UnreachableStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Timeout(Duration::from_millis(10)))
    }

    async fn fetch_latest(&self, _collection: &str) -> Result<Document, StoreError> {
        Err(StoreError::Timeout(Duration::from_millis(10)))
    }

    async fn insert(&self, _collection: &str, _document: &Document) -> Result<(), StoreError> {
        Err(StoreError::Timeout(Duration::from_millis(10)))
    }
}

/// A store that never answers within any request deadline.
pub struct HungStore;

#[async_trait]
impl DocumentStore for HungStore {
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

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let store = Arc::new(MemoryStore::new());

        let app = Application::with_store(test_config(0), store.clone())
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/healthcheck", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            store,
        }
    }
}
