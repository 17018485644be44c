//! symptom-core: Shared types for the symptom analysis service
//!
//! This crate provides the questionnaire model and its validation, the
//! analysis result shape with its bounded-list rules, the run status, and
//! the error taxonomy shared by the server.

pub mod analysis;
pub mod error;
pub mod questionnaire;
pub mod status;

pub use analysis::{AnalysisResult, Condition, RiskLevel, Supplement};
pub use error::{AnalysisError, FieldError, PersistenceError, RunError, ValidationErrors};
pub use questionnaire::{Background, Questionnaire, QuestionnaireInput};
pub use status::AnalysisStatus;
