//! Domain-level errors (no external dependencies)

use std::path::PathBuf;
use thiserror::Error;

/// Domain errors represent business logic violations.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("no such environment '{name}': expected configuration at {path}")]
    EnvironmentNotFound { name: String, path: PathBuf },

    #[error("'{0}' is not a valid environment name: it is reserved for the base config file")]
    ReservedEnvironment(String),

    #[error("configuration key not found: {0}")]
    KeyNotFound(String),

    #[error("configuration key {path} is not a {expected}")]
    KeyType { path: String, expected: &'static str },

    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("branch '{current}' may not be deployed to {environment} (expected '{expected}')")]
    BranchPolicy {
        environment: String,
        expected: String,
        current: String,
    },
}
