//! Questionnaire submission → background analysis → polled result

pub mod dispatcher;
pub mod poller;
pub mod registry;
pub mod task;

pub use dispatcher::{Dispatcher, Submission};
pub use poller::{PollOutcome, StatusSource, poll_until_settled};
pub use registry::{AnalysisRegistry, RunSnapshot, SessionId};
pub use task::AnalysisTask;
