//! Health check endpoint

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    analysis: &'static str,
    persistence: &'static str,
    active_runs: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

/// GET /health - Check store connectivity and report which features are enabled
pub async fn check(State(state): State<AppState>) -> impl IntoResponse {
    let analysis = if state.dispatcher.is_some() {
        "enabled"
    } else {
        "disabled"
    };
    let active_runs = state.registry.len();

    let (code, status, persistence, reason) = match &state.store {
        None => (StatusCode::OK, "healthy", "disabled", None),
        Some(store) => match store.ping().await {
            Ok(()) => (StatusCode::OK, "healthy", "connected", None),
            Err(e) => {
                tracing::error!(error = %e, "Health check failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "unhealthy",
                    "unreachable",
                    Some(e.to_string()),
                )
            }
        },
    };

    (
        code,
        Json(HealthResponse {
            status,
            analysis,
            persistence,
            active_runs,
            reason,
        }),
    )
}
