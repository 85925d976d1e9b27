pub mod advice;
pub mod orchestrator;

pub use crate::domain::model::{DisplayPayload, RequestContext, Submission};
pub use crate::domain::ports::{HospitalFinder, LocationResolver, TextGenerator, WoundClassifier};
pub use crate::utils::error::Result;
pub use orchestrator::{Orchestrator, OrchestratorSettings};
