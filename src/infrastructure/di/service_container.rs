//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::services::{
    AzureService, BootstrapService, EnvironmentService, RuntimeService, ScaffoldService,
};
use crate::config::Settings;
use crate::infrastructure::traits::{
    CommandRunner, FileSystem, Prompt, RealCommandRunner, RealFileSystem, StdinPrompt,
};

/// Container holding the boundary implementations; services are built on demand.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Command runner abstraction
    pub cmd: Arc<dyn CommandRunner>,

    /// Terminal prompt abstraction
    pub prompt: Arc<dyn Prompt>,

    project_dir: PathBuf,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings, project_dir: PathBuf) -> Self {
        Self::with_deps(
            settings,
            project_dir,
            Arc::new(RealFileSystem),
            Arc::new(RealCommandRunner),
            Arc::new(StdinPrompt),
        )
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        project_dir: PathBuf,
        fs: Arc<dyn FileSystem>,
        cmd: Arc<dyn CommandRunner>,
        prompt: Arc<dyn Prompt>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            fs,
            cmd,
            prompt,
            project_dir,
        }
    }

    /// Directory commands operate on.
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn environment_service(&self) -> EnvironmentService {
        EnvironmentService::new(
            self.fs.clone(),
            self.settings.config_dir_in(&self.project_dir),
            self.settings.default_environment.clone(),
        )
    }

    pub fn scaffold_service(&self) -> ScaffoldService {
        ScaffoldService::new(self.fs.clone(), self.cmd.clone(), self.settings.clone())
    }

    pub fn runtime_service(&self) -> RuntimeService {
        RuntimeService::new(self.fs.clone(), self.cmd.clone(), self.settings.clone())
    }

    pub fn azure_service(&self) -> AzureService {
        AzureService::new(self.fs.clone(), self.cmd.clone(), self.settings.clone())
    }

    pub fn bootstrap_service(&self) -> BootstrapService {
        BootstrapService::new(self.cmd.clone(), self.settings.clone())
    }
}
