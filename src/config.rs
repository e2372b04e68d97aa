//! Tool configuration with layered loading
//!
//! This is legend's own configuration, not the per-environment project
//! configuration (see `application::services::EnvironmentService`).
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/legend/legend.toml`
//! 3. Local config: `<project_dir>/.legend.toml`
//! 4. Environment variables: `LEGEND_*` prefix, `__` for nesting (`LEGEND_TOOLS__AZ`)

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::environment::DEFAULT_ENVIRONMENT;
use crate::domain::expand_env_vars;

/// External programs legend drives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolsConfig {
    /// Azure Functions core tools
    pub func: String,
    /// Azure CLI
    pub az: String,
    pub git: String,
    /// GitHub CLI
    pub gh: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            func: "func".into(),
            az: "az".into(),
            git: "git".into(),
            gh: "gh".into(),
        }
    }
}

impl ToolsConfig {
    /// Configured binary for a tool known by its conventional name.
    pub fn resolve<'a>(&'a self, program: &'a str) -> &'a str {
        match program {
            "func" => &self.func,
            "az" => &self.az,
            "git" => &self.git,
            "gh" => &self.gh,
            other => other,
        }
    }
}

/// Raw tools config for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawToolsConfig {
    pub func: Option<String>,
    pub az: Option<String>,
    pub git: Option<String>,
    pub gh: Option<String>,
}

impl ToolsConfig {
    fn merge(&self, overlay: &RawToolsConfig) -> Self {
        Self {
            func: overlay.func.clone().unwrap_or_else(|| self.func.clone()),
            az: overlay.az.clone().unwrap_or_else(|| self.az.clone()),
            git: overlay.git.clone().unwrap_or_else(|| self.git.clone()),
            gh: overlay.gh.clone().unwrap_or_else(|| self.gh.clone()),
        }
    }
}

/// Raw settings for intermediate parsing (Option to detect "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub config_dir: Option<PathBuf>,
    pub default_environment: Option<String>,
    pub default_location: Option<String>,
    pub environments: Option<Vec<String>>,
    pub python: Option<String>,
    #[serde(default)]
    pub tools: RawToolsConfig,
}

/// Unified configuration for legend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Project-relative directory holding `application.toml` and `<env>.toml`
    pub config_dir: PathBuf,
    /// Environment used when neither argument nor `LEGEND_ENVIRONMENT` names one
    pub default_environment: String,
    /// Azure region for new projects
    pub default_location: String,
    /// Environments scaffolded by `new`
    pub environments: Vec<String>,
    /// Python interpreter used outside the project virtualenv
    pub python: String,
    pub tools: ToolsConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("config"),
            default_environment: DEFAULT_ENVIRONMENT.into(),
            default_location: "australiasoutheast".into(),
            environments: ["development", "test", "sit", "uat", "production"]
                .map(String::from)
                .to_vec(),
            python: "python3".into(),
            tools: ToolsConfig::default(),
        }
    }
}

/// Get the XDG config directory for legend.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "legend").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("legend.toml"))
}

/// Get the path to the local config file in a project directory.
pub fn project_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".legend.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Merge arrays with union semantics and negation support.
///
/// - Items from overlay are appended to base (order kept, no duplicates)
/// - Items prefixed with `!` remove the corresponding item
pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
    let removed: HashSet<&str> = overlay.iter().filter_map(|p| p.strip_prefix('!')).collect();
    let mut seen = HashSet::new();
    base.iter()
        .chain(overlay.iter().filter(|p| !p.starts_with('!')))
        .filter(|item| !removed.contains(item.as_str()))
        .filter(|item| seen.insert(item.as_str()))
        .cloned()
        .collect()
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.config_dir.to_string_lossy().as_ref());
        self.config_dir = PathBuf::from(expanded);
        self.python = expand_env_vars(&self.python);
    }

    /// Absolute config directory for a project.
    pub fn config_dir_in(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.config_dir)
    }

    /// Merge project-local overlay: scalars win if set, arrays union.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            config_dir: overlay
                .config_dir
                .clone()
                .unwrap_or_else(|| self.config_dir.clone()),
            default_environment: overlay
                .default_environment
                .clone()
                .unwrap_or_else(|| self.default_environment.clone()),
            default_location: overlay
                .default_location
                .clone()
                .unwrap_or_else(|| self.default_location.clone()),
            environments: overlay
                .environments
                .as_ref()
                .map(|o| merge_array(&self.environments, o))
                .unwrap_or_else(|| self.environments.clone()),
            python: overlay.python.clone().unwrap_or_else(|| self.python.clone()),
            tools: self.tools.merge(&overlay.tools),
        }
    }

    /// Apply global config onto defaults: like `merge_with`, but arrays REPLACE.
    fn apply_global(&self, global: &RawSettings) -> Self {
        let mut merged = self.merge_with(&RawSettings {
            environments: None,
            ..global.clone()
        });
        if let Some(envs) = &global.environments {
            merged.environments = envs.clone();
        }
        merged
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Optional project directory for local config
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.apply_global(&raw);
            }
        }

        if let Some(project) = project_dir {
            let local_path = project_config_path(project);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply LEGEND_* environment variables as explicit overrides.
    ///
    /// `LEGEND_ENVIRONMENT` is not a setting; it selects the project environment.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("LEGEND")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("environments")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("config_dir") {
            settings.config_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("default_environment") {
            settings.default_environment = val;
        }
        if let Ok(val) = config.get_string("default_location") {
            settings.default_location = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("environments") {
            settings.environments = val;
        }
        if let Ok(val) = config.get_string("python") {
            settings.python = val;
        }
        if let Ok(val) = config.get_string("tools.func") {
            settings.tools.func = val;
        }
        if let Ok(val) = config.get_string("tools.az") {
            settings.tools.az = val;
        }
        if let Ok(val) = config.get_string("tools.git") {
            settings.tools.git = val;
        }
        if let Ok(val) = config.get_string("tools.gh") {
            settings.tools.gh = val;
        }

        Ok(settings)
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
