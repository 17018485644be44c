//! symptom-server library crate
//!
//! Exposes `build_app`, `AppState` and the service traits for integration
//! tests. The actual binary entrypoint is in `main.rs`.

pub mod ai;
pub mod analysis;
pub mod config;
pub mod db;
mod error;
mod middleware;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::{Extension, Router, middleware as axum_mw, routing::get};
use chrono::{DateTime, Utc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use ai::{AnalysisService, ClaudeAnalyzer, ClaudeClient};
use analysis::{AnalysisRegistry, AnalysisTask, Dispatcher};
use config::{Config, PollSettings};
use db::{DiagnosisStore, PgDiagnosisStore};

pub use routes::diagnosis::{QUESTIONNAIRE_PATH, RESULT_PATH, SESSION_HEADER};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<AnalysisRegistry>,
    /// `None` when no analysis backend is configured
    pub dispatcher: Option<Dispatcher>,
    pub store: Option<Arc<dyn DiagnosisStore>>,
    pub poll: PollSettings,
}

impl AppState {
    /// Wire state from explicit services.
    pub fn new(
        analyzer: Option<Arc<dyn AnalysisService>>,
        store: Option<Arc<dyn DiagnosisStore>>,
        config: &Config,
    ) -> Self {
        let registry = Arc::new(AnalysisRegistry::new());
        let dispatcher = analyzer.map(|analyzer| {
            let task = AnalysisTask::new(analyzer, store.clone(), config.analysis.clone());
            Dispatcher::new(registry.clone(), task)
        });

        Self {
            registry,
            dispatcher,
            store,
            poll: config.poll.clone(),
        }
    }

    /// Wire state from configuration: Postgres store if `DATABASE_URL` is set,
    /// Claude analyzer if `ANTHROPIC_API_KEY` is set.
    pub async fn from_config(config: &Config) -> Result<Self, String> {
        let store: Option<Arc<dyn DiagnosisStore>> = match &config.database_url {
            Some(url) => {
                let pool = db::create_pool(url)
                    .await
                    .map_err(|e| format!("Failed to create database pool: {e}"))?;
                db::init_schema(&pool)
                    .await
                    .map_err(|e| format!("Failed to initialise schema: {e}"))?;
                Some(Arc::new(PgDiagnosisStore::new(pool)))
            }
            None => None,
        };

        let analyzer: Option<Arc<dyn AnalysisService>> = match &config.anthropic_api_key {
            Some(key) => {
                let mut client = ClaudeClient::new(key.clone(), config.analysis.attempt_timeout)
                    .map_err(|e| e.to_string())?;
                if let Some(model) = &config.anthropic_model {
                    client = client.with_model(model.clone());
                }
                Some(Arc::new(ClaudeAnalyzer::new(client)))
            }
            None => None,
        };

        Ok(Self::new(analyzer, store, config))
    }
}

/// Longest pause between pruning passes
const MAX_PRUNE_PERIOD: Duration = Duration::from_secs(60 * 60);

/// Periodically drop settled runs older than `retention`
pub fn spawn_run_pruner(registry: Arc<AnalysisRegistry>, retention: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let period = (retention / 2).clamp(Duration::from_millis(500), MAX_PRUNE_PERIOD);
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            // No cutoff means nothing can be old enough yet
            let Some(cutoff) = prune_cutoff(chrono::Utc::now(), retention) else {
                continue;
            };
            let removed = registry.prune_settled(cutoff);
            if removed > 0 {
                tracing::debug!(removed, remaining = registry.len(), "Pruned settled analysis runs");
            }
        }
    })
}

/// Start time before which settled runs are dropped
fn prune_cutoff(now: DateTime<Utc>, retention: Duration) -> Option<DateTime<Utc>> {
    let retention = chrono::Duration::from_std(retention).ok()?;
    now.checked_sub_signed(retention)
}

/// Build the full application router with all routes and middleware.
///
/// Extracted from `main()` so integration tests can construct the app
/// without binding to a TCP port.
pub fn build_app(state: AppState, config: &Config) -> Router {
    let rate_limiter = middleware::create_rate_limiter(config.rate_limit_rps);

    let api_routes = Router::new()
        .nest("/api", routes::diagnosis_routes())
        .layer(Extension(rate_limiter));

    // Install Prometheus metrics recorder.
    // Use build_recorder() + set_global_recorder() so that repeated calls
    // (e.g. in integration tests) don't panic; the second install is
    // ignored and we still get a valid handle for /metrics.
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let prometheus_handle = recorder.handle();
    let _ = metrics::set_global_recorder(recorder);

    let public_routes = Router::new()
        .route("/health", get(routes::health::check))
        .route("/metrics", get(routes::metrics::get))
        .layer(Extension(prometheus_handle));

    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(Any)
    };

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .with_state(state)
        .layer(axum_mw::from_fn(middleware::audit_middleware))
        .layer(axum_mw::from_fn(middleware::caller_middleware))
        .layer(axum_mw::from_fn(middleware::request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum_mw::from_fn(middleware::metrics_middleware))
}
