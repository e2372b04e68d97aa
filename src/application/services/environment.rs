//! Environment configuration resolver
//!
//! Loads `application.toml` and `<environment>.toml` from the project's
//! config directory and merges them into a [`ProjectConfig`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use toml::Table;
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::environment::{BASE_DOCUMENT, ENVIRONMENT_VAR};
use crate::domain::{DomainError, Environment, ProjectConfig};
use crate::infrastructure::traits::FileSystem;

/// Service resolving the merged configuration of one environment.
pub struct EnvironmentService {
    fs: Arc<dyn FileSystem>,
    config_dir: PathBuf,
    default_environment: String,
}

impl EnvironmentService {
    /// `config_dir` is the absolute directory holding the TOML documents.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        config_dir: PathBuf,
        default_environment: impl Into<String>,
    ) -> Self {
        Self {
            fs,
            config_dir,
            default_environment: default_environment.into(),
        }
    }

    /// Pick the environment name: `explicit`, else `LEGEND_ENVIRONMENT`, else the default.
    pub fn select(&self, explicit: Option<&str>) -> ApplicationResult<Environment> {
        let from_var = std::env::var(ENVIRONMENT_VAR).ok();
        Ok(Environment::select(
            explicit,
            from_var.as_deref(),
            &self.default_environment,
        )?)
    }

    /// Resolve and load the configuration for `explicit` (or the ambient environment).
    #[instrument(skip(self))]
    pub fn resolve(&self, explicit: Option<&str>) -> ApplicationResult<ProjectConfig> {
        let environment = self.select(explicit)?;
        self.load(environment)
    }

    /// Load the documents for an already selected environment.
    pub fn load(&self, environment: Environment) -> ApplicationResult<ProjectConfig> {
        if !self.fs.is_dir(&self.config_dir) {
            return Err(ApplicationError::NotAProject(self.config_dir.clone()));
        }

        let env_path = environment.document_path(&self.config_dir);
        if !self.fs.is_file(&env_path) {
            return Err(DomainError::EnvironmentNotFound {
                name: environment.name().to_string(),
                path: env_path,
            }
            .into());
        }

        let base_path = self.base_document_path();
        let base = if self.fs.is_file(&base_path) {
            self.read_table(&base_path)?
        } else {
            debug!("no base document at {}", base_path.display());
            Table::new()
        };
        let overlay = self.read_table(&env_path)?;

        debug!(
            "resolved environment '{}' ({:?}) from {}",
            environment,
            environment.source(),
            env_path.display()
        );
        Ok(ProjectConfig::new(environment, &base, &overlay))
    }

    /// Environments with a document in the config directory, sorted.
    pub fn available(&self) -> ApplicationResult<Vec<String>> {
        if !self.fs.is_dir(&self.config_dir) {
            return Err(ApplicationError::NotAProject(self.config_dir.clone()));
        }
        let mut names: Vec<String> = walkdir::WalkDir::new(&self.config_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let path = e.path();
                if path.extension().and_then(|x| x.to_str()) != Some("toml") {
                    return None;
                }
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .filter(|s| *s != BASE_DOCUMENT)
                    .map(str::to_string)
            })
            .collect();
        names.sort();
        Ok(names)
    }

    fn base_document_path(&self) -> PathBuf {
        self.config_dir.join(format!("{BASE_DOCUMENT}.toml"))
    }

    fn read_table(&self, path: &Path) -> ApplicationResult<Table> {
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read config", path)?;
        toml::from_str(&content).map_err(|e| ApplicationError::Config {
            message: format!("invalid TOML in {}: {}", path.display(), e),
        })
    }
}
