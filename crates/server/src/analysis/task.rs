//! Background analysis task: optional persistence, then one analysis call

use std::sync::Arc;

use symptom_core::{AnalysisResult, AnalysisStatus, PersistenceError, Questionnaire, RunError};
use tracing::Instrument;

use super::registry::RunTicket;
use crate::ai::{AnalysisService, retry};
use crate::config::AnalysisSettings;
use crate::db::DiagnosisStore;

#[derive(Clone)]
pub struct AnalysisTask {
    analyzer: Arc<dyn AnalysisService>,
    store: Option<Arc<dyn DiagnosisStore>>,
    settings: AnalysisSettings,
}

impl AnalysisTask {
    pub fn new(
        analyzer: Arc<dyn AnalysisService>,
        store: Option<Arc<dyn DiagnosisStore>>,
        settings: AnalysisSettings,
    ) -> Self {
        Self {
            analyzer,
            store,
            settings,
        }
    }

    /// Drive one run to completion and post its outcome on the ticket's channel.
    ///
    /// Returns early without writing anything if the run is cancelled or
    /// replaced; the in-flight call is dropped with it.
    pub async fn run(self, questionnaire: Questionnaire, token: Option<String>, ticket: RunTicket) {
        let RunTicket {
            run_id,
            status,
            cancelled,
        } = ticket;
        let span = tracing::info_span!("analysis_run", run_id = %run_id);

        async move {
            tokio::select! {
                outcome = self.execute(&questionnaire, token.as_deref()) => {
                    let next = match outcome {
                        Ok(result) => {
                            tracing::info!(
                                conditions = result.conditions.len(),
                                department = %result.recommended_department,
                                "Analysis completed"
                            );
                            metrics::counter!("analysis_runs_total", "outcome" => "completed").increment(1);
                            AnalysisStatus::Completed { result }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Analysis failed");
                            metrics::counter!("analysis_runs_total", "outcome" => "error").increment(1);
                            AnalysisStatus::Error { message: e.user_message() }
                        }
                    };
                    tracing::debug!(status = next.label(), "Posting run status");
                    status.send_replace(next);
                }
                _ = cancelled => {
                    tracing::info!("Analysis run cancelled");
                    metrics::counter!("analysis_runs_total", "outcome" => "cancelled").increment(1);
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        questionnaire: &Questionnaire,
        token: Option<&str>,
    ) -> Result<AnalysisResult, RunError> {
        let record_id = match (&self.store, token) {
            (Some(store), Some(token)) => match store.submit(questionnaire, token).await {
                Ok(id) => {
                    tracing::info!(record_id = %id, "Questionnaire stored");
                    Some(id)
                }
                Err(PersistenceError::Unauthenticated) => {
                    tracing::info!("Token rejected, continuing without a stored record");
                    None
                }
                Err(e) => return Err(e.into()),
            },
            _ => None,
        };

        let analyzer = self.analyzer.as_ref();
        let result = retry::with_retry(&self.settings, move |attempt| {
            tracing::debug!(attempt, "Calling analysis service");
            analyzer.analyze(questionnaire)
        })
        .await?;

        if let (Some(store), Some(record_id)) = (&self.store, record_id) {
            if let Err(e) = store.save_result(record_id, &result).await {
                tracing::warn!(record_id = %record_id, error = %e, "Failed to link result to record");
            }
        }

        Ok(result)
    }
}
