//! Error handling for the order workflow engine
//!
//! Library operations return `Result<T, WizardError>`. Degraded outcomes that
//! the wizard is designed to absorb (empty directory, missing managing agency)
//! are not errors; they are logged and reflected in session state instead.

use thiserror::Error;

use crate::order_info::Blocker;
use crate::sequencer::WizardStep;

/// Main error type for the order wizard
#[derive(Error, Debug)]
pub enum WizardError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status} for {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Step {step} is blocked: {}", describe(blockers))]
    Blocked {
        step: WizardStep,
        blockers: Vec<Blocker>,
    },

    #[error("Invalid selection for {field}: {value}")]
    InvalidSelection { field: &'static str, value: String },

    #[error("Cannot move to step {requested}: furthest step reached is {max}")]
    InvalidStep { requested: usize, max: usize },

    #[error("Order submission failed: {0}")]
    Submission(String),

    #[error("Wizard session is closed")]
    SessionClosed,

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

fn describe(blockers: &[Blocker]) -> String {
    blockers
        .iter()
        .map(|b| b.description.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, WizardError>;
