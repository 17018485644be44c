//! Claude API client for the Anthropic Messages API

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use symptom_core::AnalysisError;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
const MAX_TOKENS: u32 = 4096;

/// Client for the Anthropic Claude Messages API
#[derive(Clone)]
pub struct ClaudeClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    api_url: String,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// Individual content block within a response
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Request body for the Messages API
#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message>,
}

/// Response from the Messages API
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

/// Error detail from the Messages API
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl ClaudeClient {
    /// Create a new client with the given API key.
    ///
    /// `request_timeout` bounds a single HTTP exchange.
    pub fn new(api_key: String, request_timeout: Duration) -> Result<Self, AnalysisError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| AnalysisError::Unknown(format!("HTTP client setup failed: {e}")))?;

        Ok(Self {
            http,
            api_key,
            model: DEFAULT_MODEL.to_string(),
            api_url: API_URL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a single user message with an optional system prompt, return text response
    pub async fn message(
        &self,
        system: Option<&str>,
        user_message: &str,
    ) -> Result<String, AnalysisError> {
        let request = ApiRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![Message {
                role: "user".to_string(),
                content: user_message.to_string(),
            }],
        };

        let response = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(status_error(status, message));
        }

        let response = response
            .json::<ApiResponse>()
            .await
            .map_err(|e| AnalysisError::MalformedResponse(format!("Failed to parse response: {e}")))?;

        if response.stop_reason.as_deref() == Some("max_tokens") {
            tracing::warn!(model = %self.model, "Claude response truncated at max_tokens");
        }

        extract_text(&response)
    }
}

/// Map a non-success HTTP status to the analysis error taxonomy
pub fn status_error(status: StatusCode, message: String) -> AnalysisError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        AnalysisError::RateLimited
    } else if status.is_server_error() {
        AnalysisError::UpstreamServer {
            status: status.as_u16(),
            message,
        }
    } else {
        AnalysisError::Unknown(format!("Claude API error ({status}): {message}"))
    }
}

fn transport_error(err: reqwest::Error) -> AnalysisError {
    if err.is_timeout() {
        AnalysisError::Timeout
    } else {
        AnalysisError::Unknown(format!("HTTP request failed: {err}"))
    }
}

/// Extract the first text block from an API response
fn extract_text(response: &ApiResponse) -> Result<String, AnalysisError> {
    response
        .content
        .iter()
        .find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.clone()),
            ContentBlock::Other => None,
        })
        .ok_or_else(|| AnalysisError::MalformedResponse("No text content in response".into()))
}
