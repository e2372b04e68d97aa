//! Cloud workflow: provision, deploy, info, destroy
//!
//! All Azure access goes through the `az` CLI; git deployment through `git`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::application::services::tools::{checked, checked_status, spawn_failed, stdout_text};
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::environment::check_branch_policy;
use crate::domain::{
    authenticated_git_url, deploy_remote, publish_profile_secret, FunctionSummary, HostKeys,
    ProjectConfig,
};
use crate::infrastructure::traits::{CommandRunner, FileSystem, Prompt};

/// Config keys every cloud command needs.
const REQUIRED_KEYS: &[&str] = &["azure.resource_group", "azure.function_app"];

/// The Azure coordinates of one environment, read from its config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub environment: String,
    pub resource_group: String,
    pub function_app: String,
}

impl Target {
    pub fn from_config(config: &ProjectConfig) -> ApplicationResult<Self> {
        config.require(REQUIRED_KEYS)?;
        Ok(Self {
            environment: config.environment().name().to_string(),
            resource_group: config.get_str("azure.resource_group")?.to_string(),
            function_app: config.get_str("azure.function_app")?.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub target: Target,
    pub deployment_name: String,
    /// GitHub secret written, if requested
    pub github_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    Deployed { remote: String, branch: String },
    /// `git push` failed; the push output went to the terminal
    PushFailed {
        remote: String,
        branch: String,
        exit_code: Option<i32>,
    },
}

#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub summary: FunctionSummary,
    /// Function-level keys with a value
    pub keys: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct DeploymentInfo {
    pub target: Target,
    pub hostname: String,
    pub host_keys: HostKeys,
    pub functions: Vec<FunctionInfo>,
}

#[derive(Debug, Deserialize)]
struct LocalGit {
    url: String,
}

pub struct AzureService {
    fs: Arc<dyn FileSystem>,
    cmd: Arc<dyn CommandRunner>,
    settings: Arc<Settings>,
}

impl AzureService {
    pub fn new(fs: Arc<dyn FileSystem>, cmd: Arc<dyn CommandRunner>, settings: Arc<Settings>) -> Self {
        Self { fs, cmd, settings }
    }

    fn az(&self, dir: &Path, args: &[&str]) -> ApplicationResult<String> {
        let az = self.settings.tools.az.as_str();
        let output = checked(az, self.cmd.run_in(dir, az, args))?;
        Ok(stdout_text(&output))
    }

    fn git(&self, dir: &Path, args: &[&str]) -> ApplicationResult<String> {
        let git = self.settings.tools.git.as_str();
        let output = checked(git, self.cmd.run_in(dir, git, args))?;
        Ok(stdout_text(&output))
    }

    fn az_json<T: for<'de> Deserialize<'de>>(&self, dir: &Path, args: &[&str]) -> ApplicationResult<T> {
        let text = self.az(dir, args)?;
        serde_json::from_str(&text).map_err(|e| ApplicationError::OperationFailed {
            context: format!("parse output of az {}", args.join(" ")),
            source: Box::new(e),
        })
    }

    /// Create the resource group and apply the ARM template for the environment.
    #[instrument(skip(self, config), fields(environment = %config.environment()))]
    pub fn provision(
        &self,
        project_dir: &Path,
        config: &ProjectConfig,
        github: bool,
    ) -> ApplicationResult<ProvisionReport> {
        config.require(&["azure.location", "settings.app_name"])?;
        let target = Target::from_config(config)?;
        let location = config.get_str("azure.location")?;
        let app_name = config.get_str("settings.app_name")?;
        let env = target.environment.as_str();

        let template = Path::new("deployment").join("azuredeploy.json");
        let parameters = Path::new("deployment").join(format!("azuredeploy-{env}.parameters.json"));
        for file in [&template, &parameters] {
            self.ensure_file(project_dir, file)?;
        }

        info!("creating resource group {}", target.resource_group);
        self.az(
            project_dir,
            &[
                "group",
                "create",
                "--name",
                &target.resource_group,
                "--location",
                location,
            ],
        )?;

        let deployment_name = format!("{app_name}-{env}");
        info!("deploying {}", template.display());
        let template_arg = template.to_string_lossy().into_owned();
        let parameters_arg = format!("@{}", parameters.to_string_lossy());
        self.az(
            project_dir,
            &[
                "deployment",
                "group",
                "create",
                "--name",
                &deployment_name,
                "--resource-group",
                &target.resource_group,
                "--template-file",
                &template_arg,
                "--parameters",
                &parameters_arg,
            ],
        )?;

        let github_secret = if github {
            Some(self.store_publish_profile(project_dir, &target)?)
        } else {
            None
        };

        Ok(ProvisionReport {
            target,
            deployment_name,
            github_secret,
        })
    }

    fn ensure_file(&self, project_dir: &Path, relative: &Path) -> ApplicationResult<()> {
        let path: PathBuf = project_dir.join(relative);
        if self.fs.is_file(&path) {
            Ok(())
        } else {
            Err(ApplicationError::precondition(format!(
                "{} not found",
                path.display()
            )))
        }
    }

    /// Store the app's publish profile as a GitHub Actions secret.
    fn store_publish_profile(&self, project_dir: &Path, target: &Target) -> ApplicationResult<String> {
        let profile = self.az(
            project_dir,
            &[
                "functionapp",
                "deployment",
                "list-publishing-profiles",
                "--name",
                &target.function_app,
                "--resource-group",
                &target.resource_group,
                "--xml",
            ],
        )?;
        let secret = publish_profile_secret(&target.environment);
        let gh = self.settings.tools.gh.as_str();
        checked(
            gh,
            self.cmd.run_with_stdin(gh, &["secret", "set", &secret], &profile),
        )?;
        Ok(secret)
    }

    /// Push the current branch to the environment's local-git endpoint.
    #[instrument(skip(self, config), fields(environment = %config.environment()))]
    pub fn deploy(
        &self,
        project_dir: &Path,
        config: &ProjectConfig,
        force: bool,
    ) -> ApplicationResult<DeployOutcome> {
        let target = Target::from_config(config)?;
        let branch = self.git(project_dir, &["rev-parse", "--abbrev-ref", "HEAD"])?;
        check_branch_policy(
            config.environment(),
            config.get_opt_str("deploy.branch")?,
            &branch,
        )?;

        let repo_url = self.local_git_url(project_dir, &target)?;
        let credentials = self.az(
            project_dir,
            &[
                "webapp",
                "deployment",
                "list-publishing-credentials",
                "--resource-group",
                &target.resource_group,
                "--name",
                &target.function_app,
                "--query",
                "[publishingUserName, publishingPassword]",
                "-o",
                "tsv",
            ],
        )?;
        let mut parts = credentials.split_whitespace();
        let (Some(user), Some(password)) = (parts.next(), parts.next()) else {
            return Err(ApplicationError::Config {
                message: "could not parse publishing credentials from az output".into(),
            });
        };
        let url = authenticated_git_url(&repo_url, user, password);

        let remote = deploy_remote(&target.environment);
        let git = self.settings.tools.git.as_str();
        let exists = self
            .cmd
            .run_in(project_dir, git, &["remote", "get-url", &remote])
            .map(|o| o.status.success())
            .unwrap_or(false);
        let verb = if exists { "set-url" } else { "add" };
        debug!("git remote {verb} {remote}");
        self.git(project_dir, &["remote", verb, &remote, &url])?;

        let refspec = format!("{branch}:master");
        let mut args = vec!["push"];
        if force {
            args.push("-f");
        }
        args.extend([remote.as_str(), refspec.as_str()]);
        info!("pushing {branch} to {remote}");
        match checked_status(git, self.cmd.run_interactive(project_dir, git, &args, &[])) {
            Ok(()) => Ok(DeployOutcome::Deployed { remote, branch }),
            Err(ApplicationError::ToolFailed { exit_code, .. }) => {
                warn!("push to {remote} failed");
                Ok(DeployOutcome::PushFailed {
                    remote,
                    branch,
                    exit_code,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Existing local-git repository URL, configuring one when absent.
    fn local_git_url(&self, project_dir: &Path, target: &Target) -> ApplicationResult<String> {
        let az = self.settings.tools.az.as_str();
        let shown = self.cmd.run_in(
            project_dir,
            az,
            &[
                "functionapp",
                "deployment",
                "source",
                "show",
                "--resource-group",
                &target.resource_group,
                "--name",
                &target.function_app,
                "--query",
                "repoUrl",
                "-o",
                "tsv",
            ],
        );
        if let Ok(output) = shown {
            let url = stdout_text(&output);
            if output.status.success() && !url.is_empty() {
                debug!("git deployment already configured");
                return Ok(url);
            }
        }
        info!("configuring local git deployment");
        let configured: LocalGit = self.az_json(
            project_dir,
            &[
                "functionapp",
                "deployment",
                "source",
                "config-local-git",
                "--resource-group",
                &target.resource_group,
                "--name",
                &target.function_app,
            ],
        )?;
        Ok(configured.url)
    }

    /// Fails with a precondition error when the function app does not exist.
    /// Returns its default hostname.
    pub fn ensure_exists(&self, project_dir: &Path, target: &Target) -> ApplicationResult<String> {
        let az = self.settings.tools.az.as_str();
        let output = self
            .cmd
            .run_in(
                project_dir,
                az,
                &[
                    "functionapp",
                    "show",
                    "--resource-group",
                    &target.resource_group,
                    "--name",
                    &target.function_app,
                    "--query",
                    "defaultHostName",
                    "-o",
                    "tsv",
                ],
            )
            .map_err(|e| spawn_failed(az, e))?;
        let hostname = stdout_text(&output);
        if output.status.success() && !hostname.is_empty() {
            Ok(hostname)
        } else {
            Err(ApplicationError::precondition(format!(
                "function app '{}' not found; run `legend provision {env}` and `legend deploy {env}` first",
                target.function_app,
                env = target.environment
            )))
        }
    }

    /// Hostname, keys and function URLs of a deployed app.
    #[instrument(skip(self, config), fields(environment = %config.environment()))]
    pub fn info(&self, project_dir: &Path, config: &ProjectConfig) -> ApplicationResult<DeploymentInfo> {
        let target = Target::from_config(config)?;
        let hostname = self.ensure_exists(project_dir, &target)?;
        let rg = target.resource_group.as_str();
        let app = target.function_app.as_str();

        let host_keys: HostKeys = self
            .az_json(
                project_dir,
                &["functionapp", "keys", "list", "--resource-group", rg, "--name", app],
            )
            .unwrap_or_else(|e| {
                warn!("cannot read host keys: {e}");
                HostKeys::default()
            });
        let summaries: Vec<FunctionSummary> = self.az_json(
            project_dir,
            &["functionapp", "function", "list", "--resource-group", rg, "--name", app],
        )?;

        let mut functions = Vec::new();
        for summary in summaries {
            let name = summary.short_name().to_string();
            if name.is_empty() {
                continue;
            }
            let keys: BTreeMap<String, Option<String>> = self
                .az_json(
                    project_dir,
                    &[
                        "functionapp",
                        "function",
                        "keys",
                        "list",
                        "--resource-group",
                        rg,
                        "--name",
                        app,
                        "--function-name",
                        &name,
                    ],
                )
                .unwrap_or_default();
            functions.push(FunctionInfo {
                summary,
                keys: keys
                    .into_iter()
                    .filter_map(|(k, v)| v.map(|v| (k, v)))
                    .collect(),
            });
        }

        Ok(DeploymentInfo {
            target,
            hostname,
            host_keys,
            functions,
        })
    }

    /// Confirm twice (unless `assume_yes`), then start deleting the resource group.
    #[instrument(skip(self, prompt))]
    pub fn destroy(
        &self,
        project_dir: &Path,
        target: &Target,
        assume_yes: bool,
        prompt: &dyn Prompt,
    ) -> ApplicationResult<()> {
        if !assume_yes {
            let sure = prompt
                .confirm("Are you sure you want to proceed?")
                .map_err(read_failed)?;
            if !sure {
                return Err(ApplicationError::Aborted("not confirmed".into()));
            }
            let typed = prompt
                .ask(&format!(
                    "To confirm, type the function app name ({}):",
                    target.function_app
                ))
                .map_err(read_failed)?;
            if typed.trim() != target.function_app {
                return Err(ApplicationError::Aborted(
                    "app name does not match".into(),
                ));
            }
        }

        info!("deleting resource group {}", target.resource_group);
        self.az(
            project_dir,
            &[
                "group",
                "delete",
                "--name",
                &target.resource_group,
                "--yes",
                "--no-wait",
            ],
        )?;
        Ok(())
    }
}

fn read_failed(e: std::io::Error) -> ApplicationError {
    ApplicationError::OperationFailed {
        context: "read confirmation".into(),
        source: Box::new(e),
    }
}
