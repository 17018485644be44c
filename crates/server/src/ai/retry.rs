//! Sequential retry with linear backoff for analysis calls

use std::future::Future;
use std::time::Duration;

use symptom_core::AnalysisError;

use crate::config::AnalysisSettings;

/// Run `op` until it succeeds, fails permanently, or attempts run out.
///
/// Each attempt is bounded by `settings.attempt_timeout`; an elapsed attempt
/// counts as `AnalysisError::Timeout`. Before attempt n (n >= 2) the loop
/// sleeps `(n - 1) * backoff_step`. Attempts never overlap.
pub async fn with_retry<T, F, Fut>(settings: &AnalysisSettings, mut op: F) -> Result<T, AnalysisError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AnalysisError>>,
{
    let max_attempts = settings.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let outcome = match tokio::time::timeout(settings.attempt_timeout, op(attempt)).await {
            Ok(result) => result,
            Err(_) => Err(AnalysisError::Timeout),
        };

        match outcome {
            Ok(value) => {
                metrics::counter!("analysis_attempts_total", "outcome" => "success").increment(1);
                return Ok(value);
            }
            Err(e) => {
                metrics::counter!("analysis_attempts_total", "outcome" => e.kind()).increment(1);

                if !e.is_retryable() || attempt >= max_attempts {
                    tracing::warn!(attempt, error = %e, "Analysis call failed, giving up");
                    return Err(e);
                }

                let delay = backoff(settings.backoff_step, attempt);
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Analysis call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Delay after `failed_attempt` fails, i.e. before attempt `failed_attempt + 1`
fn backoff(step: Duration, failed_attempt: u32) -> Duration {
    step.saturating_mul(failed_attempt)
}
