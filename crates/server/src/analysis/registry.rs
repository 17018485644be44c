//! Per-session run registry
//!
//! Each session holds at most one run. The run's status travels over a
//! `watch` channel written only by the background task; the registry keeps
//! the receiving end plus the run's cancel handle. Dropping an entry drops
//! the cancel handle, which stops the task.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use symptom_core::{AnalysisStatus, Questionnaire};
use tokio::sync::{oneshot, watch};
use uuid::Uuid;

const MAX_SESSION_ID_LEN: usize = 128;

/// Client-chosen session key, the scope of one status marker
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Accepts 1 to 128 printable ASCII characters without spaces.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let valid = !raw.is_empty()
            && raw.len() <= MAX_SESSION_ID_LEN
            && raw.chars().all(|c| c.is_ascii_graphic());
        valid.then(|| Self(raw.to_string()))
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct RunEntry {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    questionnaire: Questionnaire,
    status: watch::Receiver<AnalysisStatus>,
    _cancel: oneshot::Sender<()>,
}

/// Task-side handles for one run
pub struct RunTicket {
    pub run_id: Uuid,
    /// Single writer of the run's status
    pub status: watch::Sender<AnalysisStatus>,
    /// Resolves when the run is cancelled or replaced
    pub cancelled: oneshot::Receiver<()>,
}

/// Point-in-time view of a session's run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub questionnaire: Questionnaire,
    #[serde(flatten)]
    pub status: AnalysisStatus,
}

#[derive(Default)]
pub struct AnalysisRegistry {
    runs: Mutex<HashMap<SessionId, RunEntry>>,
}

impl AnalysisRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn runs(&self) -> MutexGuard<'_, HashMap<SessionId, RunEntry>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear any previous run for the session and register a new `pending` one.
    ///
    /// The previous run, if still in flight, is cancelled.
    pub fn begin(&self, session: &SessionId, questionnaire: Questionnaire) -> RunTicket {
        let run_id = Uuid::new_v4();
        let (status_tx, status_rx) = watch::channel(AnalysisStatus::Pending);
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let entry = RunEntry {
            run_id,
            started_at: Utc::now(),
            questionnaire,
            status: status_rx,
            _cancel: cancel_tx,
        };

        if let Some(previous) = self.runs().insert(session.clone(), entry) {
            tracing::info!(
                session = %session,
                previous_run = %previous.run_id,
                "Replacing previous analysis run"
            );
        }

        RunTicket {
            run_id,
            status: status_tx,
            cancelled: cancel_rx,
        }
    }

    /// Current status marker; `None` when the session has no run.
    pub fn status(&self, session: &SessionId) -> AnalysisStatus {
        self.runs()
            .get(session)
            .map(|entry| entry.status.borrow().clone())
            .unwrap_or_default()
    }

    pub fn snapshot(&self, session: &SessionId) -> Option<RunSnapshot> {
        self.runs().get(session).map(|entry| RunSnapshot {
            run_id: entry.run_id,
            started_at: entry.started_at,
            questionnaire: entry.questionnaire.clone(),
            status: entry.status.borrow().clone(),
        })
    }

    /// Remove the session's run, cancelling it if still in flight.
    ///
    /// Returns the removed run's id.
    pub fn cancel(&self, session: &SessionId) -> Option<Uuid> {
        self.runs().remove(session).map(|entry| entry.run_id)
    }

    /// Drop settled runs started before `cutoff`. Pending runs are kept.
    pub fn prune_settled(&self, cutoff: DateTime<Utc>) -> usize {
        let mut runs = self.runs();
        let before = runs.len();
        runs.retain(|_, entry| entry.started_at >= cutoff || entry.status.borrow().is_pending());
        before - runs.len()
    }

    pub fn len(&self) -> usize {
        self.runs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symptom_core::QuestionnaireInput;

    fn questionnaire() -> Questionnaire {
        Questionnaire::try_from(QuestionnaireInput {
            name: Some("김철수".into()),
            age: Some(34),
            gender: Some("남성".into()),
            height: Some(175.0),
            weight: Some(70.0),
            main_symptoms: Some("기침".into()),
            symptom_duration: Some("3일".into()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn session_id_parsing() {
        assert!(SessionId::parse("abc-123").is_some());
        assert!(SessionId::parse("  ").is_none());
        assert!(SessionId::parse("has space").is_none());
        assert!(SessionId::parse(&"x".repeat(129)).is_none());
    }

    #[test]
    fn begin_marks_pending_and_task_writes_outcome() {
        let registry = AnalysisRegistry::new();
        let session = SessionId::generate();
        assert_eq!(registry.status(&session), AnalysisStatus::None);

        let ticket = registry.begin(&session, questionnaire());
        assert_eq!(registry.status(&session), AnalysisStatus::Pending);

        ticket.status.send_replace(AnalysisStatus::Error {
            message: "failed".into(),
        });
        assert_eq!(
            registry.status(&session),
            AnalysisStatus::Error {
                message: "failed".into()
            }
        );
    }

    #[tokio::test]
    async fn new_submission_cancels_previous_run() {
        let registry = AnalysisRegistry::new();
        let session = SessionId::generate();

        let first = registry.begin(&session, questionnaire());
        let second = registry.begin(&session, questionnaire());
        assert_ne!(first.run_id, second.run_id);

        // The replaced run's cancel handle is gone
        assert!(first.cancelled.await.is_err());
        // A late write from the replaced run is not visible
        first.status.send_replace(AnalysisStatus::Error {
            message: "late".into(),
        });
        assert_eq!(registry.status(&session), AnalysisStatus::Pending);
        assert_eq!(registry.snapshot(&session).unwrap().run_id, second.run_id);
    }

    #[test]
    fn cancel_clears_marker() {
        let registry = AnalysisRegistry::new();
        let session = SessionId::generate();
        let ticket = registry.begin(&session, questionnaire());

        assert_eq!(registry.cancel(&session), Some(ticket.run_id));
        assert_eq!(registry.status(&session), AnalysisStatus::None);
        assert_eq!(registry.cancel(&session), None);
    }

    #[test]
    fn prune_keeps_pending_runs() {
        let registry = AnalysisRegistry::new();
        let pending = SessionId::generate();
        let settled = SessionId::generate();

        let _pending_ticket = registry.begin(&pending, questionnaire());
        let settled_ticket = registry.begin(&settled, questionnaire());
        settled_ticket.status.send_replace(AnalysisStatus::Error {
            message: "x".into(),
        });

        let removed = registry.prune_settled(Utc::now() + chrono::Duration::seconds(1));
        assert_eq!(removed, 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.status(&pending).is_pending());
    }
}
