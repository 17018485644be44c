pub mod diagnosis;
pub mod health;
pub mod metrics;

use axum::{
    Router, middleware as axum_mw,
    routing::{get, post},
};

use crate::AppState;
use crate::middleware::rate_limit_middleware;

/// Build the questionnaire/analysis routes, nested under `/api`.
///
/// Only submission is rate limited; it is the one route that costs an AI call.
pub fn diagnosis_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/diagnosis",
            post(diagnosis::submit)
                .layer(axum_mw::from_fn(rate_limit_middleware))
                .delete(diagnosis::cancel),
        )
        .route("/diagnosis/status", get(diagnosis::status))
        .route("/diagnosis/result", get(diagnosis::result))
}
