//! Questionnaire submission and result handlers

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value as JsonValue;
use symptom_core::{AnalysisResult, AnalysisStatus, QuestionnaireInput};

use crate::AppState;
use crate::analysis::{PollOutcome, SessionId, Submission, poll_until_settled};
use crate::error::{AppError, ErrorBody};
use crate::middleware::Caller;

/// Header carrying the client's session key
pub const SESSION_HEADER: &str = "X-Session-Id";

/// Where the client should go to fill in the questionnaire again
pub const QUESTIONNAIRE_PATH: &str = "/questionnaire";

pub const RESULT_PATH: &str = "/api/diagnosis/result";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    #[serde(flatten)]
    submission: Submission,
    result_url: &'static str,
}

/// Result view state, tagged by `status`
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResultView {
    None {
        redirect: &'static str,
    },
    Completed {
        result: AnalysisResult,
    },
    Error {
        message: String,
        redirect: &'static str,
    },
    Pending {
        #[serde(rename = "waitedSecs")]
        waited_secs: u64,
        /// `wait` = request the result again, `cancel` = DELETE the run
        options: [&'static str; 2],
    },
}

impl IntoResponse for ResultView {
    fn into_response(self) -> Response {
        let status = match &self {
            ResultView::None { .. } => StatusCode::NOT_FOUND,
            ResultView::Completed { .. } => StatusCode::OK,
            ResultView::Error { .. } => StatusCode::BAD_GATEWAY,
            ResultView::Pending { .. } => StatusCode::ACCEPTED,
        };
        (status, Json(self)).into_response()
    }
}

impl From<PollOutcome> for ResultView {
    fn from(outcome: PollOutcome) -> Self {
        match outcome {
            PollOutcome::NoSubmission => ResultView::None {
                redirect: QUESTIONNAIRE_PATH,
            },
            PollOutcome::Completed(result) => ResultView::Completed { result },
            PollOutcome::Failed(message) => ResultView::Error {
                message,
                redirect: QUESTIONNAIRE_PATH,
            },
            PollOutcome::StillPending { waited } => ResultView::Pending {
                waited_secs: waited.as_secs(),
                options: ["wait", "cancel"],
            },
        }
    }
}

/// Session from the request header. `Ok(None)` when absent.
fn session_from(headers: &HeaderMap) -> Result<Option<SessionId>, AppError> {
    match headers.get(SESSION_HEADER) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .ok()
            .and_then(SessionId::parse)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid {SESSION_HEADER} header"))),
    }
}

/// POST /api/diagnosis - Accept a questionnaire and start analysis in the background
///
/// Answers `202 Accepted` as soon as the run is registered as pending; the
/// analysis itself never delays this response.
pub async fn submit(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
    body: Result<Json<JsonValue>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let dispatcher = state
        .dispatcher
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("ANTHROPIC_API_KEY not configured".to_string()))?;

    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let input = QuestionnaireInput::from_json(body)?;
    let session = session_from(&headers)?.unwrap_or_else(SessionId::generate);
    let submission = dispatcher.submit(&session, input, caller.token)?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::LOCATION, HeaderValue::from_static(RESULT_PATH));
    if let Ok(value) = HeaderValue::from_str(session.as_str()) {
        response_headers.insert(SESSION_HEADER, value);
    }

    Ok((
        StatusCode::ACCEPTED,
        response_headers,
        Json(SubmitResponse {
            submission,
            result_url: RESULT_PATH,
        }),
    ))
}

/// GET /api/diagnosis/status - Current status marker, without waiting
pub async fn status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let snapshot = session_from(&headers)?.and_then(|s| state.registry.snapshot(&s));

    Ok(match snapshot {
        Some(snapshot) => Json(snapshot).into_response(),
        None => Json(AnalysisStatus::None).into_response(),
    })
}

/// GET /api/diagnosis/result - Wait for the session's run to settle
///
/// Polls the status marker at the configured interval. If the run is still
/// pending at the ceiling, answers `202` with the cancel-or-wait choice;
/// requesting again keeps waiting.
pub async fn result(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<ResultView, AppError> {
    let Some(session) = session_from(&headers)? else {
        return Ok(PollOutcome::NoSubmission.into());
    };

    let registry = state.registry.clone();
    let outcome = poll_until_settled(&|| registry.status(&session), &state.poll).await;

    if let PollOutcome::Failed(message) = &outcome {
        tracing::info!(session = %session, message = %message, "Reporting failed analysis");
    }
    Ok(outcome.into())
}

/// DELETE /api/diagnosis - Cancel the session's run and clear its marker
pub async fn cancel(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    let cancelled = session_from(&headers)?.and_then(|s| {
        state.registry.cancel(&s).inspect(|run_id| {
            tracing::info!(session = %s, run_id = %run_id, "Analysis cancelled by user");
        })
    });

    Ok(match cancelled {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody::new("NOT_FOUND", "No analysis for this session")),
        )
            .into_response(),
    })
}
