//! AI analysis powered by Claude API

pub mod analyzer;
pub mod client;
pub mod retry;

use async_trait::async_trait;
use symptom_core::{AnalysisError, AnalysisResult, Questionnaire};

pub use analyzer::ClaudeAnalyzer;
pub use client::ClaudeClient;

/// Turns a validated questionnaire into a bounded analysis result.
///
/// Implementations perform a single attempt; retry and per-attempt timeout
/// are applied by the caller.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, questionnaire: &Questionnaire) -> Result<AnalysisResult, AnalysisError>;
}
