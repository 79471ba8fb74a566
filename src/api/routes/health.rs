//! Health check endpoint

use axum::{extract::State, http::StatusCode};

use crate::api::state::ApiState;

/// GET /health
///
/// Fails while the last attempt to read the cluster state failed
pub async fn health_check(State(state): State<ApiState>) -> (StatusCode, String) {
    match state.health.error().await {
        None => (StatusCode::OK, "I am mostly okay, thanks.\n".to_string()),
        Some(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Something is fishy: {error}\n"),
        ),
    }
}
