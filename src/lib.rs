pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;

pub use config::AppConfig;
pub use core::{Orchestrator, OrchestratorSettings};
pub use domain::model::{DisplayPayload, Submission};
pub use utils::error::{AidError, Result};
