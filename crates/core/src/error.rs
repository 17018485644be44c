use serde::Serialize;
use thiserror::Error;

/// A single rejected questionnaire field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    pub fn required(field: &'static str) -> Self {
        Self::new(field, "is required")
    }
}

/// Client-side validation failure. Never retried, never reaches the analysis task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Questionnaire validation failed: {}", summary(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failures of the AI analysis service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("AI service rate limit exceeded")]
    RateLimited,

    #[error("AI service error ({status}): {message}")]
    UpstreamServer { status: u16, message: String },

    #[error("AI service timed out")]
    Timeout,

    #[error("Malformed analysis response: {0}")]
    MalformedResponse(String),

    #[error("AI service request failed: {0}")]
    Unknown(String),
}

impl AnalysisError {
    /// Rate limits, 5xx responses and timeouts may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnalysisError::RateLimited | AnalysisError::UpstreamServer { .. } | AnalysisError::Timeout
        )
    }

    /// Stable label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::RateLimited => "rate_limited",
            AnalysisError::UpstreamServer { .. } => "upstream_server",
            AnalysisError::Timeout => "timeout",
            AnalysisError::MalformedResponse(_) => "malformed_response",
            AnalysisError::Unknown(_) => "unknown",
        }
    }
}

/// Failures of the persistence service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid diagnosis record: {0}")]
    Validation(String),

    #[error("Persistence failed: {0}")]
    Server(String),
}

/// Everything that can end a background run in the `error` state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl RunError {
    /// Message shown to the user on the result view.
    pub fn user_message(&self) -> String {
        match self {
            RunError::Persistence(_) => {
                "문진 정보를 저장하지 못했습니다. 잠시 후 다시 시도해 주세요.".to_string()
            }
            RunError::Analysis(AnalysisError::RateLimited) => {
                "AI 서비스 요청이 많습니다. 잠시 후 다시 시도해 주세요.".to_string()
            }
            RunError::Analysis(AnalysisError::UpstreamServer { status, .. }) => {
                format!("AI 서비스 오류가 발생했습니다 (upstream status {status}).")
            }
            RunError::Analysis(AnalysisError::Timeout) => {
                "AI 분석 시간이 초과되었습니다. 다시 시도해 주세요.".to_string()
            }
            RunError::Analysis(AnalysisError::MalformedResponse(_)) => {
                "AI 분석 결과 형식이 올바르지 않습니다. 다시 시도해 주세요.".to_string()
            }
            RunError::Analysis(AnalysisError::Unknown(_)) => {
                "AI 분석 중 알 수 없는 오류가 발생했습니다.".to_string()
            }
        }
    }
}
