//! Application-level errors (wraps domain errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("not a legend project: {0} not found")]
    NotAProject(PathBuf),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("{message}")]
    Precondition { message: String },

    #[error("aborted: {0}")]
    Aborted(String),

    #[error("{program} failed{}", .exit_code.map(|c| format!(" with exit code {c}")).unwrap_or_default())]
    ToolFailed {
        program: String,
        exit_code: Option<i32>,
        /// Child output, passed through unmodified
        output: String,
    },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
