use async_trait::async_trait;
use deadpool_postgres::Pool;
use symptom_core::{AnalysisResult, PersistenceError, Questionnaire};
use uuid::Uuid;

use super::{DiagnosisStore, db_error, pool_error};

/// Postgres-backed diagnosis records
#[derive(Clone)]
pub struct PgDiagnosisStore {
    pool: Pool,
}

impl PgDiagnosisStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Resolve a session token to its user
    async fn user_for_token(&self, token: &str) -> Result<Uuid, PersistenceError> {
        let client = self.pool.get().await.map_err(pool_error)?;
        let row = client
            .query_opt(
                "SELECT user_id FROM user_sessions WHERE token = $1 AND expires_at > now()",
                &[&token],
            )
            .await
            .map_err(db_error)?;

        row.map(|r| r.get(0)).ok_or(PersistenceError::Unauthenticated)
    }
}

#[async_trait]
impl DiagnosisStore for PgDiagnosisStore {
    async fn submit(&self, questionnaire: &Questionnaire, token: &str) -> Result<Uuid, PersistenceError> {
        let user_id = self.user_for_token(token).await?;
        let data = serde_json::to_value(questionnaire)
            .map_err(|e| PersistenceError::Validation(e.to_string()))?;

        let client = self.pool.get().await.map_err(pool_error)?;
        let row = client
            .query_one(
                "INSERT INTO diagnosis_records (id, user_id, questionnaire) \
                 VALUES ($1, $2, $3::jsonb) RETURNING id",
                &[&Uuid::new_v4(), &user_id, &data],
            )
            .await
            .map_err(db_error)?;

        Ok(row.get(0))
    }

    async fn save_result(&self, record_id: Uuid, result: &AnalysisResult) -> Result<(), PersistenceError> {
        let data = serde_json::to_value(result)
            .map_err(|e| PersistenceError::Validation(e.to_string()))?;

        let client = self.pool.get().await.map_err(pool_error)?;
        let inserted = client
            .execute(
                "INSERT INTO diagnosis_results (record_id, result) VALUES ($1, $2::jsonb) \
                 ON CONFLICT (record_id) DO NOTHING",
                &[&record_id, &data],
            )
            .await
            .map_err(db_error)?;

        if inserted == 0 {
            tracing::warn!(record_id = %record_id, "Result already linked to record");
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), PersistenceError> {
        let client = self.pool.get().await.map_err(pool_error)?;
        client.query_one("SELECT 1", &[]).await.map_err(db_error)?;
        Ok(())
    }
}
