//! Result poller: waits on a session's status marker with a bounded wait

use std::time::Duration;

use symptom_core::{AnalysisResult, AnalysisStatus};
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::PollSettings;

/// Anything the poller can re-read a status from
pub trait StatusSource {
    fn current(&self) -> AnalysisStatus;
}

impl<F> StatusSource for F
where
    F: Fn() -> AnalysisStatus,
{
    fn current(&self) -> AnalysisStatus {
        self()
    }
}

/// What the result view should do next
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// No run for this session: send the user back to the questionnaire
    NoSubmission,
    Completed(AnalysisResult),
    /// The run failed; carries the user-facing message
    Failed(String),
    /// Still pending at the ceiling: offer cancel or keep waiting
    StillPending { waited: Duration },
}

/// Re-read the status every `interval` until it settles or `ceiling` elapses.
///
/// The first read happens immediately, so a settled run answers without delay.
pub async fn poll_until_settled(source: &impl StatusSource, settings: &PollSettings) -> PollOutcome {
    let started = Instant::now();
    let mut ticker = tokio::time::interval(settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match source.current() {
            AnalysisStatus::None => return PollOutcome::NoSubmission,
            AnalysisStatus::Completed { result } => return PollOutcome::Completed(result),
            AnalysisStatus::Error { message } => return PollOutcome::Failed(message),
            AnalysisStatus::Pending => {
                let waited = started.elapsed();
                if waited >= settings.ceiling {
                    tracing::debug!(waited_ms = waited.as_millis() as u64, "Poll ceiling reached");
                    return PollOutcome::StillPending { waited };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use symptom_core::analysis::AnalysisPayload;

    fn settings() -> PollSettings {
        PollSettings::default()
    }

    fn result() -> AnalysisResult {
        let payload: AnalysisPayload = serde_json::from_value(serde_json::json!({
            "results": [{"name": "감기", "description": "d", "riskLevel": "low",
                         "symptoms": ["기침"], "managementTips": ["휴식"]}],
            "recommendedDepartments": ["내과"],
            "supplements": [{"name": "아연", "description": "d", "benefits": ["면역"],
                             "matchingSymptoms": ["기침"]}]
        }))
        .unwrap();
        payload.try_into().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn missing_run_redirects_immediately() {
        let outcome = poll_until_settled(&|| AnalysisStatus::None, &settings()).await;
        assert_eq!(outcome, PollOutcome::NoSubmission);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_run_answers_without_waiting() {
        let started = Instant::now();
        let outcome = poll_until_settled(&|| AnalysisStatus::Completed { result: result() }, &settings()).await;
        assert_eq!(outcome, PollOutcome::Completed(result()));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn observes_transition_within_one_interval() {
        let reads = AtomicU32::new(0);
        let settled_at = Mutex::new(None);
        let started = Instant::now();

        // Settles on the 4th read, i.e. at t=3s
        let source = || {
            if reads.fetch_add(1, Ordering::SeqCst) < 3 {
                AnalysisStatus::Pending
            } else {
                settled_at.lock().unwrap().get_or_insert(started.elapsed());
                AnalysisStatus::Error {
                    message: "failed".into(),
                }
            }
        };

        let outcome = poll_until_settled(&source, &settings()).await;
        assert_eq!(outcome, PollOutcome::Failed("failed".into()));
        assert_eq!(reads.load(Ordering::SeqCst), 4);
        let settled_at = settled_at.lock().unwrap().unwrap();
        assert!(settled_at <= Duration::from_secs(3) + Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn ceiling_offers_cancel_or_wait() {
        let outcome = poll_until_settled(&|| AnalysisStatus::Pending, &settings()).await;
        match outcome {
            PollOutcome::StillPending { waited } => {
                assert!(waited >= Duration::from_secs(60));
                assert!(waited < Duration::from_secs(61));
            }
            other => panic!("expected StillPending, got {other:?}"),
        }
    }
}
