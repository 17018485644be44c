mod repository;

pub use repository::PgDiagnosisStore;

use async_trait::async_trait;
use deadpool_postgres::{Config, Pool, Runtime};
use symptom_core::{AnalysisResult, PersistenceError, Questionnaire};
use tokio_postgres::NoTls;
use uuid::Uuid;

const SCHEMA: &str = include_str!("../../migrations/001_init.sql");

/// Persistence service for diagnosis records.
#[async_trait]
pub trait DiagnosisStore: Send + Sync {
    /// Store the questionnaire for the user behind `token`, returning the record id.
    async fn submit(&self, questionnaire: &Questionnaire, token: &str) -> Result<Uuid, PersistenceError>;

    /// Link an analysis result to a previously stored record.
    async fn save_result(&self, record_id: Uuid, result: &AnalysisResult) -> Result<(), PersistenceError>;

    /// Connectivity check for `/health`
    async fn ping(&self) -> Result<(), PersistenceError>;
}

/// Create a connection pool from a database URL
pub async fn create_pool(database_url: &str) -> Result<Pool, deadpool_postgres::CreatePoolError> {
    let mut cfg = Config::new();
    cfg.url = Some(database_url.to_string());
    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
}

/// Create the tables if they do not exist yet
pub async fn init_schema(pool: &Pool) -> Result<(), PersistenceError> {
    let client = pool.get().await.map_err(pool_error)?;
    client.batch_execute(SCHEMA).await.map_err(db_error)?;
    Ok(())
}

fn pool_error(err: deadpool_postgres::PoolError) -> PersistenceError {
    PersistenceError::Server(format!("Database pool error: {err}"))
}

fn db_error(err: tokio_postgres::Error) -> PersistenceError {
    PersistenceError::Server(format!("Database error: {err}"))
}
