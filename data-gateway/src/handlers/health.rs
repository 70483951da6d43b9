use crate::services::get_metrics;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};

/// Store liveness. The probe error is logged, never returned to the caller.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.data.ping(state.config.store_timeout).await {
        Ok(()) => (StatusCode::OK, "OK!"),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to connect to db")
        }
    }
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
