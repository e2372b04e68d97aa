//! Developer machine checks for `bootstrap`

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::services::tools::checked_status;
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::{dependencies, Dependency};
use crate::infrastructure::traits::CommandRunner;

/// A dependency and whether it answered its version check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyStatus {
    pub dependency: Dependency,
    pub installed: bool,
}

pub struct BootstrapService {
    cmd: Arc<dyn CommandRunner>,
    settings: Arc<Settings>,
    macos: bool,
}

impl BootstrapService {
    pub fn new(cmd: Arc<dyn CommandRunner>, settings: Arc<Settings>) -> Self {
        Self::for_platform(cmd, settings, cfg!(target_os = "macos"))
    }

    pub fn for_platform(cmd: Arc<dyn CommandRunner>, settings: Arc<Settings>, macos: bool) -> Self {
        Self {
            cmd,
            settings,
            macos,
        }
    }

    /// Run every version check against the configured binaries; a child
    /// that cannot start counts as missing.
    #[instrument(skip(self))]
    pub fn check_all(&self) -> Vec<DependencyStatus> {
        dependencies(self.macos)
            .into_iter()
            .map(|dependency| {
                let program = self.settings.tools.resolve(dependency.program);
                let installed = self
                    .cmd
                    .run(program, dependency.check_args)
                    .map(|o| o.status.success())
                    .unwrap_or(false);
                debug!("{} ({}): installed={}", dependency.name, program, installed);
                DependencyStatus {
                    dependency,
                    installed,
                }
            })
            .collect()
    }

    /// Run the dependency's install command attached to the terminal.
    pub fn install(&self, dependency: &Dependency) -> ApplicationResult<()> {
        let Some((program, args)) = dependency.install.and_then(|cmd| cmd.split_first()) else {
            return Err(ApplicationError::precondition(format!(
                "no automatic install for {}; see {}",
                dependency.name, dependency.homepage
            )));
        };
        let dir = std::env::current_dir().map_err(|e| ApplicationError::OperationFailed {
            context: "resolve current directory".into(),
            source: Box::new(e),
        })?;
        checked_status(program, self.cmd.run_interactive(&dir, program, args, &[]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::RecordingRunner;

    fn service(runner: Arc<RecordingRunner>, settings: Settings) -> BootstrapService {
        BootstrapService::for_platform(runner, Arc::new(settings), false)
    }

    #[test]
    fn given_configured_az_when_check_all_then_runs_configured_binary() {
        let runner = Arc::new(RecordingRunner::new().respond("/opt/az --version", 1, ""));
        let mut settings = Settings::default();
        settings.tools.az = "/opt/az".into();

        let statuses = service(runner.clone(), settings).check_all();

        let lines = runner.command_lines();
        assert!(lines.contains(&"/opt/az --version".to_string()));
        assert!(!lines.contains(&"az --version".to_string()));
        let az = statuses
            .iter()
            .find(|s| s.dependency.program == "az")
            .unwrap();
        assert!(!az.installed);
    }

    #[test]
    fn given_default_tools_when_check_all_then_checks_each_once() {
        let runner = Arc::new(RecordingRunner::new());

        let statuses = service(runner.clone(), Settings::default()).check_all();

        assert!(statuses.iter().all(|s| s.installed));
        assert_eq!(
            runner.command_lines(),
            vec![
                "git --version",
                "pip3 --version",
                "func --version",
                "az --version",
                "gh --version",
            ]
        );
    }
}
