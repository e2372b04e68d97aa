//! Local pass-through commands: `run`, `test`, `console`
//!
//! Each hands the terminal to a child process and returns its exit code.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::services::tools::{pass_through, venv_bin};
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::environment::ENVIRONMENT_VAR;
use crate::domain::names::validate_function_name;
use crate::infrastructure::traits::{CommandRunner, FileSystem};

/// REPLs tried in order, after the project's `.venv`.
const PATH_REPLS: &[&str] = &["ipython", "python3", "python"];

pub struct RuntimeService {
    fs: Arc<dyn FileSystem>,
    cmd: Arc<dyn CommandRunner>,
    settings: Arc<Settings>,
}

impl RuntimeService {
    pub fn new(fs: Arc<dyn FileSystem>, cmd: Arc<dyn CommandRunner>, settings: Arc<Settings>) -> Self {
        Self { fs, cmd, settings }
    }

    fn ensure_project(&self, project_dir: &Path) -> ApplicationResult<()> {
        let config_dir = self.settings.config_dir_in(project_dir);
        if self.fs.is_dir(&config_dir) {
            Ok(())
        } else {
            Err(ApplicationError::NotAProject(config_dir))
        }
    }

    /// `func start` in the foreground.
    #[instrument(skip(self))]
    pub fn run(&self, project_dir: &Path, port: Option<u16>, verbose: bool) -> ApplicationResult<i32> {
        self.ensure_project(project_dir)?;
        let port = port.map(|p| p.to_string());
        let mut args = vec!["start"];
        if let Some(port) = &port {
            args.extend(["--port", port.as_str()]);
        }
        if verbose {
            args.push("--verbose");
        }
        let func = self.settings.tools.func.as_str();
        pass_through(func, self.cmd.run_interactive(project_dir, func, &args, &[]))
    }

    /// `python -m pytest` with the test environment selected.
    #[instrument(skip(self))]
    pub fn test(&self, project_dir: &Path, pytest_args: &[String]) -> ApplicationResult<i32> {
        self.ensure_project(project_dir)?;
        let python = self.python(project_dir);
        let python = python.to_string_lossy();
        let mut args = vec!["-m", "pytest"];
        args.extend(pytest_args.iter().map(String::as_str));
        pass_through(
            &python,
            self.cmd.run_interactive(
                project_dir,
                &python,
                &args,
                &[(ENVIRONMENT_VAR, "test")],
            ),
        )
    }

    /// Interactive REPL with every function module imported.
    #[instrument(skip(self))]
    pub fn console(&self, project_dir: &Path) -> ApplicationResult<i32> {
        self.ensure_project(project_dir)?;
        let repl = self.find_repl(project_dir).ok_or_else(|| {
            ApplicationError::precondition("no Python REPL found (tried .venv, ipython, python3, python)")
        })?;
        let script = self.console_script(project_dir)?;
        let repl = repl.to_string_lossy();
        debug!("console: {repl}");
        pass_through(
            &repl,
            self.cmd
                .run_interactive(project_dir, &repl, &["-i", "-c", &script], &[]),
        )
    }

    /// Project `.venv` interpreter when present, else the configured one.
    fn python(&self, project_dir: &Path) -> PathBuf {
        let venv = venv_bin(project_dir, "python");
        if self.fs.is_file(&venv) {
            venv
        } else {
            PathBuf::from(&self.settings.python)
        }
    }

    pub fn find_repl(&self, project_dir: &Path) -> Option<PathBuf> {
        ["ipython", "python"]
            .iter()
            .map(|name| venv_bin(project_dir, name))
            .find(|path| self.fs.is_file(path))
            .or_else(|| PATH_REPLS.iter().find_map(|name| self.cmd.find_program(name)))
    }

    /// Python startup code loading `function_app.py` and each `<dir>/__init__.py`.
    pub fn console_script(&self, project_dir: &Path) -> ApplicationResult<String> {
        let mut modules: Vec<(String, String)> = Vec::new();
        if self.fs.is_file(&project_dir.join("function_app.py")) {
            modules.push(("function_app".into(), "function_app.py".into()));
        }
        let dirs = self
            .fs
            .list_dirs(project_dir)
            .map_err(|e| ApplicationError::OperationFailed {
                context: format!("list {}", project_dir.display()),
                source: Box::new(e),
            })?;
        for dir in dirs {
            let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            // Only identifiers become globals; they also quote safely below.
            if validate_function_name(name).is_err() || !self.fs.is_file(&dir.join("__init__.py")) {
                debug!("console: skipping {}", dir.display());
                continue;
            }
            modules.push((name.to_string(), format!("{name}/__init__.py")));
        }

        let mut script = String::from(CONSOLE_PRELUDE);
        for (name, path) in &modules {
            script.push_str(&format!("_legend_load({name:?}, {path:?})\n"));
        }
        script.push_str("del _legend_load\nprint('legend console: functions loaded')\n");
        Ok(script)
    }
}

const CONSOLE_PRELUDE: &str = r#"import importlib.util, sys
sys.path.insert(0, ".")
def _legend_load(name, path):
    try:
        spec = importlib.util.spec_from_file_location(name, path)
        module = importlib.util.module_from_spec(spec)
        spec.loader.exec_module(module)
        globals()[name] = module
        print(f"Loaded function: {name}")
    except Exception as e:
        print(f"Failed to load {path}: {e}")
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::traits::RealFileSystem;
    use crate::util::testing::RecordingRunner;
    use tempfile::TempDir;

    fn service() -> RuntimeService {
        RuntimeService::new(
            Arc::new(RealFileSystem),
            Arc::new(RecordingRunner::new()),
            Arc::new(Settings::default()),
        )
    }

    fn package(root: &Path, name: &str) {
        std::fs::create_dir(root.join(name)).unwrap();
        std::fs::write(root.join(name).join("__init__.py"), "").unwrap();
    }

    #[test]
    fn given_non_identifier_dirs_when_console_script_then_only_identifiers_loaded() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("function_app.py"), "").unwrap();
        package(temp.path(), "pkg_ok");
        package(temp.path(), "my-dir");
        package(temp.path(), ".venv");
        package(temp.path(), "with space");
        std::fs::create_dir(temp.path().join("no_init")).unwrap();

        let script = service().console_script(temp.path()).unwrap();

        assert!(script.contains(r#"_legend_load("function_app", "function_app.py")"#));
        assert!(script.contains(r#"_legend_load("pkg_ok", "pkg_ok/__init__.py")"#));
        assert!(!script.contains("my-dir"));
        assert!(!script.contains(".venv"));
        assert!(!script.contains("with space"));
        assert!(!script.contains("no_init"));
    }

    #[test]
    fn given_directory_without_config_when_console_then_not_a_project() {
        let temp = TempDir::new().unwrap();

        let err = service().console(temp.path()).unwrap_err();

        assert!(matches!(err, ApplicationError::NotAProject(_)));
    }
}
