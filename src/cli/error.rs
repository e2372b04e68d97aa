//! CLI-level errors (wraps infrastructure errors)

use std::fmt;

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("{0}")]
    Usage(String),

    #[error("unknown command '{token}'{}", did_you_mean(.suggestions))]
    UnknownCommand {
        token: String,
        suggestions: Vec<String>,
    },

    #[error("ambiguous command '{token}': could be {}", .candidates.join(", "))]
    AmbiguousCommand {
        token: String,
        candidates: Vec<String>,
    },
}

fn did_you_mean(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {}?)", suggestions.join(", "))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        ApplicationError::from(e).into()
    }
}

/// What kind of failure ended the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Usage,
    Environment,
    Precondition,
    Tool,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorCategory::Usage => "usage error",
            ErrorCategory::Environment => "environment error",
            ErrorCategory::Precondition => "precondition failed",
            ErrorCategory::Tool => "external tool failed",
            ErrorCategory::Internal => "internal error",
        })
    }
}

impl CliError {
    fn application(&self) -> Option<&ApplicationError> {
        match self {
            CliError::Infra(InfraError::Application(e)) => Some(e),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            CliError::Usage(_)
            | CliError::UnknownCommand { .. }
            | CliError::AmbiguousCommand { .. } => ErrorCategory::Usage,
            CliError::Infra(InfraError::Io { .. }) => ErrorCategory::Internal,
            CliError::Infra(InfraError::Application(e)) => match e {
                ApplicationError::Domain(d) => match d {
                    DomainError::InvalidName { .. } => ErrorCategory::Usage,
                    DomainError::BranchPolicy { .. } => ErrorCategory::Precondition,
                    DomainError::EnvironmentNotFound { .. }
                    | DomainError::ReservedEnvironment(_)
                    | DomainError::KeyNotFound(_)
                    | DomainError::KeyType { .. } => ErrorCategory::Environment,
                },
                ApplicationError::Config { .. } => ErrorCategory::Environment,
                ApplicationError::NotAProject(_)
                | ApplicationError::Precondition { .. }
                | ApplicationError::Aborted(_) => ErrorCategory::Precondition,
                ApplicationError::ToolFailed { .. } => ErrorCategory::Tool,
                ApplicationError::OperationFailed { .. } => ErrorCategory::Internal,
            },
        }
    }

    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Usage => exitcode::USAGE,
            ErrorCategory::Environment => exitcode::CONFIG,
            ErrorCategory::Precondition => exitcode::NOINPUT,
            ErrorCategory::Tool => match self.application() {
                Some(ApplicationError::ToolFailed {
                    exit_code: Some(code),
                    ..
                }) if *code != 0 => *code,
                _ => exitcode::SOFTWARE,
            },
            ErrorCategory::Internal => match self {
                CliError::Infra(InfraError::Io { .. }) => exitcode::IOERR,
                _ => exitcode::SOFTWARE,
            },
        }
    }

    /// Child output to show verbatim before the error line.
    pub fn tool_output(&self) -> Option<&str> {
        match self.application() {
            Some(ApplicationError::ToolFailed { output, .. }) if !output.is_empty() => {
                Some(output.as_str())
            }
            _ => None,
        }
    }
}
