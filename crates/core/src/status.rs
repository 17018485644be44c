use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;

/// Where an analysis run currently stands.
///
/// `Pending` is written at submission; the background task moves it to
/// `Completed` or `Error` exactly once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AnalysisStatus {
    #[default]
    None,
    Pending,
    Completed { result: AnalysisResult },
    Error { message: String },
}

impl AnalysisStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, AnalysisStatus::Pending)
    }

    /// `Completed` or `Error`
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AnalysisStatus::Completed { .. } | AnalysisStatus::Error { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            AnalysisStatus::None => "none",
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Completed { .. } => "completed",
            AnalysisStatus::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_status_tag() {
        let json = serde_json::to_value(AnalysisStatus::Error {
            message: "boom".into(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"status": "error", "message": "boom"}));

        let json = serde_json::to_value(AnalysisStatus::Pending).unwrap();
        assert_eq!(json, serde_json::json!({"status": "pending"}));
    }

    #[test]
    fn terminal_states() {
        assert!(!AnalysisStatus::None.is_terminal());
        assert!(!AnalysisStatus::Pending.is_terminal());
        assert!(AnalysisStatus::Error { message: String::new() }.is_terminal());
    }
}
