use std::sync::Arc;

use serde::Serialize;
use symptom_core::{Questionnaire, QuestionnaireInput, ValidationErrors};
use uuid::Uuid;

use super::registry::{AnalysisRegistry, SessionId};
use super::task::AnalysisTask;

/// Accepted submission, returned before any analysis work happens
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub session_id: String,
    pub run_id: Uuid,
    pub status: &'static str,
}

/// Validates a questionnaire, marks the session pending and starts exactly one task.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<AnalysisRegistry>,
    task: AnalysisTask,
}

impl Dispatcher {
    pub fn new(registry: Arc<AnalysisRegistry>, task: AnalysisTask) -> Self {
        Self { registry, task }
    }

    /// Must be called from within a Tokio runtime.
    ///
    /// Validation failures return before anything is written, so the session's
    /// previous status is left as it was.
    pub fn submit(
        &self,
        session: &SessionId,
        input: QuestionnaireInput,
        token: Option<String>,
    ) -> Result<Submission, ValidationErrors> {
        let questionnaire = Questionnaire::try_from(input)?;

        let ticket = self.registry.begin(session, questionnaire.clone());
        let run_id = ticket.run_id;
        tracing::info!(
            session = %session,
            run_id = %run_id,
            authenticated = token.is_some(),
            "Questionnaire accepted, analysis pending"
        );

        tokio::spawn(self.task.clone().run(questionnaire, token, ticket));

        Ok(Submission {
            session_id: session.to_string(),
            run_id,
            status: "pending",
        })
    }
}
