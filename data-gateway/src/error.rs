use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use service_core::error::AppError;
use std::time::Duration;
use thiserror::Error;

/// Startup failure while opening the store connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to start connection to mongo db: {0}")]
    Establish(anyhow::Error),

    #[error("failed to ping mongo db: {0}")]
    Liveness(anyhow::Error),
}

impl From<ConnectionError> for AppError {
    fn from(err: ConnectionError) -> Self {
        AppError::DatabaseError(anyhow::Error::new(err))
    }
}

/// Runtime failure of a store read or write.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no documents in collection {collection}")]
    NotFound { collection: String },

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid collection name: {0:?}")]
    InvalidCollection(String),

    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Malformed `application/x-www-form-urlencoded` request body.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("unsupported content type {0:?}")]
    UnsupportedContentType(String),

    #[error("form body is not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid URL escape {0:?}")]
    InvalidEscape(String),

    #[error("invalid semicolon separator in form data")]
    Semicolon,

    #[error(transparent)]
    Decode(#[from] serde_urlencoded::de::Error),
}

/// Per-request failure, rendered as a plain-text body embedding the cause.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("failed to connect to db: {0}")]
    Read(StoreError),

    #[error("failed to marshal data: {0}")]
    Marshal(#[from] serde_json::Error),

    #[error("failed to handle request: {0}")]
    Form(#[from] FormError),

    #[error("failed to handle request: {0}")]
    Write(StoreError),

    #[error("no collection in path {0:?}")]
    MissingCollection(String),
}

impl HandlerError {
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::Read(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            HandlerError::MissingCollection(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, self.to_string()).into_response()
    }
}
