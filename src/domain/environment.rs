//! Environment names and the rules attached to them

use std::fmt;
use std::path::{Path, PathBuf};

use crate::domain::DomainError;

/// Process variable consulted when no environment is passed explicitly.
pub const ENVIRONMENT_VAR: &str = "LEGEND_ENVIRONMENT";

/// Fallback when neither an argument nor the variable names an environment.
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Name of the base document; never a valid environment.
pub const BASE_DOCUMENT: &str = "application";

/// Where a resolved environment name came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSource {
    Explicit,
    Variable,
    Default,
}

/// A named deployment target (development, sit, uat, production, ...).
///
/// Any string is accepted except the reserved base document name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    name: String,
    source: NameSource,
}

impl Environment {
    /// Select the environment name by precedence: explicit argument, then the
    /// `LEGEND_ENVIRONMENT` value, then `default`.
    ///
    /// An explicit name is kept as given, even if no configuration exists for it.
    /// Blank values count as absent.
    pub fn select(
        explicit: Option<&str>,
        from_var: Option<&str>,
        default: &str,
    ) -> Result<Self, DomainError> {
        let non_blank = |s: &&str| !s.trim().is_empty();
        let (name, source) = match (explicit.filter(non_blank), from_var.filter(non_blank)) {
            (Some(name), _) => (name, NameSource::Explicit),
            (None, Some(name)) => (name, NameSource::Variable),
            (None, None) => (default, NameSource::Default),
        };
        Self::new(name.trim(), source)
    }

    fn new(name: &str, source: NameSource) -> Result<Self, DomainError> {
        if name == BASE_DOCUMENT {
            return Err(DomainError::ReservedEnvironment(name.to_string()));
        }
        if name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(DomainError::InvalidName {
                name: name.to_string(),
                reason: "environment names may not contain path separators".into(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            source,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> NameSource {
        self.source
    }

    /// Path of this environment's document inside `config_dir`.
    pub fn document_path(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(format!("{}.toml", self.name))
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

pub fn is_local_environment(name: &str) -> bool {
    matches!(name, "development" | "test")
}

/// Deploy guard: when an environment pins a branch, only that branch ships.
pub fn check_branch_policy(
    environment: &Environment,
    required: Option<&str>,
    current: &str,
) -> Result<(), DomainError> {
    match required {
        Some(expected) if expected != current => Err(DomainError::BranchPolicy {
            environment: environment.name().to_string(),
            expected: expected.to_string(),
            current: current.to_string(),
        }),
        _ => Ok(()),
    }
}
