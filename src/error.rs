//! Error types for the multiverify supervisor.
//!
//! Uses thiserror for derive macros and keeps every message user-actionable.
//! Only input errors are fatal to a whole run; the other variants are caught
//! per agent and folded into that agent's report entry.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for supervisor operations.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// Bad arguments, unreadable prompt, or a target that is not a repository.
    #[error("{0}")]
    UserError(String),

    /// The agents configuration is malformed.
    #[error("invalid agent configuration: {0}")]
    ConfigError(String),

    /// A git command failed.
    #[error("git operation failed: {0}")]
    GitError(String),

    /// An agent process could not be started.
    #[error("failed to launch agent: {0}")]
    LaunchError(String),
}

impl VerifyError {
    /// Returns the process exit code for this error when it aborts the run.
    pub fn exit_code(&self) -> i32 {
        match self {
            VerifyError::UserError(_)
            | VerifyError::ConfigError(_)
            | VerifyError::GitError(_)
            | VerifyError::LaunchError(_) => exit_codes::FAILURE,
        }
    }
}

/// Result type alias for supervisor operations.
pub type Result<T> = std::result::Result<T, VerifyError>;
