//! Error types for failure handling across the agent loop
//!
//! A single unified hierarchy captures every failure mode the loop can see.
//! The taxonomy mirrors the propagation policy: most variants are converted
//! into error observations and fed back to the reasoning engine, while
//! `ModeViolation` aborts the call and `ReasoningEngine` failures are caught
//! at the loop's top level. Callers never receive an unhandled fault.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum AgentError {
    #[error("Reasoning engine failure: {0}")]
    ReasoningEngine(String),
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
    #[error("Invalid arguments for '{function}': {}", .problems.join("; "))]
    InvalidArguments {
        function: String,
        problems: Vec<String>,
    },
    #[error("Function '{0}' is already registered")]
    DuplicateFunction(String),
    #[error("Sandbox mode violation: {0}")]
    ModeViolation(String),
    #[error("External call timed out: {0}")]
    ExternalCallTimeout(String),
    #[error("External call failed: {0}")]
    ExternalCallFailure(String),
    #[error("Action call budget exhausted")]
    IterationBudgetExceeded,
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Parsing error: {0}")]
    ParsingError(String),
    #[error("I/O error: {0}")]
    IoError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for AgentError {
    fn from(err: std::io::Error) -> Self {
        AgentError::IoError(err.to_string())
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AgentError::ExternalCallTimeout(err.to_string())
        } else {
            AgentError::ExternalCallFailure(err.to_string())
        }
    }
}
