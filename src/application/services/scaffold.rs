//! Project and component generation (`new`, `generate function`)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::services::tools::{checked, checked_status, venv_bin};
use crate::application::templates::{self, render};
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::environment::is_local_environment;
use crate::domain::names::{normalize_name, validate_app_name, validate_function_name};
use crate::domain::ResourceNames;
use crate::infrastructure::traits::{CommandRunner, FileSystem};

/// Directories every project gets, relative to its root.
const PROJECT_DIRS: &[&str] = &[
    ".github/workflows",
    "bin",
    "config",
    "deployment",
    "lib/config",
    "test/functions",
];

/// Options for `legend new`.
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub name: String,
    /// Azure region; settings default when `None`
    pub location: Option<String>,
    pub skip_venv: bool,
    pub skip_git: bool,
    pub github: bool,
}

/// What `new` produced.
#[derive(Debug, Clone)]
pub struct NewProjectReport {
    pub project_dir: PathBuf,
    pub app_name: String,
    pub location: String,
    pub environments: Vec<String>,
}

/// Options for `legend generate function`.
#[derive(Debug, Clone)]
pub struct NewFunction {
    pub name: String,
    pub template: String,
    pub auth_level: String,
}

pub struct ScaffoldService {
    fs: Arc<dyn FileSystem>,
    cmd: Arc<dyn CommandRunner>,
    settings: Arc<Settings>,
}

impl ScaffoldService {
    pub fn new(fs: Arc<dyn FileSystem>, cmd: Arc<dyn CommandRunner>, settings: Arc<Settings>) -> Self {
        Self { fs, cmd, settings }
    }

    /// Create a project named `opts.name` below `parent_dir`.
    #[instrument(skip(self))]
    pub fn new_project(&self, parent_dir: &Path, opts: &NewProject) -> ApplicationResult<NewProjectReport> {
        validate_app_name(&opts.name)?;
        if opts.github && opts.skip_git {
            return Err(ApplicationError::precondition(
                "--github needs a git repository; drop --skip-git",
            ));
        }
        let project_dir = parent_dir.join(&opts.name);
        if self.fs.exists(&project_dir) {
            return Err(ApplicationError::precondition(format!(
                "{} already exists",
                project_dir.display()
            )));
        }
        let func = self.settings.tools.func.as_str();
        if self.cmd.find_program(func).is_none() {
            return Err(ApplicationError::precondition(format!(
                "Azure Functions Core Tools ({func}) is not installed; run `legend bootstrap`"
            )));
        }

        info!("creating function app {}", opts.name);
        checked(
            func,
            self.cmd.run_in(
                parent_dir,
                func,
                &["init", &opts.name, "--worker-runtime", "python"],
            ),
        )?;

        for dir in PROJECT_DIRS {
            let path = project_dir.join(dir);
            self.fs
                .create_dir_all(&path)
                .with_path_context("create directory", &path)?;
        }

        self.write_requirements(&project_dir)?;

        let app_name = normalize_name(&opts.name);
        let location = opts
            .location
            .clone()
            .unwrap_or_else(|| self.settings.default_location.clone());
        let project_vars = BTreeMap::from([
            ("app_name", app_name.clone()),
            ("azure_location", location.clone()),
        ]);
        for (target, template) in templates::PROJECT_FILES {
            self.write_file(&project_dir.join(target), &render(template, &project_vars))?;
        }
        let binstub = project_dir.join("bin/legend");
        self.fs
            .set_executable(&binstub)
            .with_path_context("make executable", &binstub)?;

        for environment in &self.settings.environments {
            self.write_environment(&project_dir, &app_name, &location, environment)?;
        }

        if !opts.skip_venv {
            self.create_venv(&project_dir)?;
        }
        if !opts.skip_git {
            let git = self.settings.tools.git.as_str();
            checked(git, self.cmd.run_in(&project_dir, git, &["init"]))?;
        }
        if opts.github {
            let gh = self.settings.tools.gh.as_str();
            checked(
                gh,
                self.cmd.run_in(
                    &project_dir,
                    gh,
                    &["repo", "create", &app_name, "--private", "--source", "."],
                ),
            )?;
        }

        Ok(NewProjectReport {
            project_dir,
            app_name,
            location,
            environments: self.settings.environments.clone(),
        })
    }

    /// Config and ARM parameter files for one environment.
    fn write_environment(
        &self,
        project_dir: &Path,
        app_name: &str,
        location: &str,
        environment: &str,
    ) -> ApplicationResult<()> {
        debug!("writing config for {environment}");
        let mut vars = ResourceNames::derive(app_name, environment).to_vars();
        vars.insert("azure_location", location.to_string());
        vars.insert("deploy_branch", templates::deploy_branch(environment).to_string());

        let template = templates::environment_template(is_local_environment(environment));
        self.write_file(
            &project_dir.join("config").join(format!("{environment}.toml")),
            &render(template, &vars),
        )?;
        self.write_file(
            &project_dir
                .join("deployment")
                .join(format!("azuredeploy-{environment}.parameters.json")),
            &render(templates::PARAMETERS_JSON, &vars),
        )
    }

    fn write_requirements(&self, project_dir: &Path) -> ApplicationResult<()> {
        let requirements = project_dir.join("requirements.txt");
        let extra = format!(
            "\n# Added by legend\n{}\n",
            templates::ADDITIONAL_REQUIREMENTS.join("\n")
        );
        self.fs
            .append(&requirements, &extra)
            .with_path_context("append", &requirements)?;

        let dev = format!(
            "-r requirements.txt\n\n# Development dependencies\n{}\n",
            templates::DEV_REQUIREMENTS.join("\n")
        );
        self.write_file(&project_dir.join("requirements-dev.txt"), &dev)
    }

    fn create_venv(&self, project_dir: &Path) -> ApplicationResult<()> {
        info!("creating virtual environment");
        let python = self.settings.python.as_str();
        checked(
            python,
            self.cmd
                .run_in(project_dir, python, &["-m", "venv", ".venv"]),
        )?;

        let venv_python = venv_bin(project_dir, "python");
        let venv_python = venv_python.to_string_lossy();
        checked(
            &venv_python,
            self.cmd.run_in(
                project_dir,
                &venv_python,
                &["-m", "pip", "install", "-r", "requirements-dev.txt"],
            ),
        )?;
        Ok(())
    }

    /// Run `func new` and add a test for the new function.
    #[instrument(skip(self))]
    pub fn generate_function(&self, project_dir: &Path, opts: &NewFunction) -> ApplicationResult<PathBuf> {
        validate_function_name(&opts.name)?;
        let config_dir = self.settings.config_dir_in(project_dir);
        if !self.fs.is_dir(&config_dir) {
            return Err(ApplicationError::NotAProject(config_dir));
        }
        let test_file = project_dir
            .join("test")
            .join("functions")
            .join(format!("{}_test.py", opts.name));
        if self.fs.exists(&test_file) {
            return Err(ApplicationError::precondition(format!(
                "{} already exists",
                test_file.display()
            )));
        }

        let func = self.settings.tools.func.as_str();
        checked_status(
            func,
            self.cmd.run_interactive(
                project_dir,
                func,
                &[
                    "new",
                    "--name",
                    &opts.name,
                    "--template",
                    &opts.template,
                    "--authlevel",
                    &opts.auth_level,
                ],
                &[],
            ),
        )?;

        let vars = BTreeMap::from([("function_name", opts.name.clone())]);
        self.write_file(&test_file, &render(templates::FUNCTION_TEST_PY, &vars))?;
        Ok(test_file)
    }

    fn write_file(&self, path: &Path, content: &str) -> ApplicationResult<()> {
        self.fs
            .ensure_parent(path)
            .with_path_context("create parent directory", path)?;
        self.fs.write(path, content).with_path_context("write", path)
    }
}
