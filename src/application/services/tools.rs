//! Child process helpers shared by services

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};

use crate::application::{ApplicationError, ApplicationResult};
use crate::exitcode;

/// Turn a captured child run into a result: spawn failures and non-zero exits
/// become `ToolFailed` carrying the child's output.
pub fn checked(program: &str, result: io::Result<Output>) -> ApplicationResult<Output> {
    let output = result.map_err(|e| spawn_failed(program, e))?;
    if output.status.success() {
        Ok(output)
    } else {
        Err(ApplicationError::ToolFailed {
            program: program.to_string(),
            exit_code: output.status.code(),
            output: combined_output(&output),
        })
    }
}

/// Like [`checked`] for interactive children whose output went to the terminal.
pub fn checked_status(program: &str, result: io::Result<ExitStatus>) -> ApplicationResult<()> {
    let status = result.map_err(|e| spawn_failed(program, e))?;
    if status.success() {
        Ok(())
    } else {
        Err(ApplicationError::ToolFailed {
            program: program.to_string(),
            exit_code: status.code(),
            output: String::new(),
        })
    }
}

/// Exit code to pass through for a finished child (signals map to `SOFTWARE`).
pub fn pass_through(program: &str, result: io::Result<ExitStatus>) -> ApplicationResult<i32> {
    let status = result.map_err(|e| spawn_failed(program, e))?;
    Ok(status.code().unwrap_or(exitcode::SOFTWARE))
}

pub fn spawn_failed(program: &str, e: io::Error) -> ApplicationError {
    ApplicationError::ToolFailed {
        program: program.to_string(),
        exit_code: None,
        output: format!("cannot run {program}: {e}"),
    }
}

/// Trimmed stdout as text.
pub fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
        (false, false) => format!("{}\n{}", stdout.trim_end(), stderr.trim_end()),
        (false, true) => stdout.trim_end().to_string(),
        _ => stderr.trim_end().to_string(),
    }
}

/// Interpreter inside the project's `.venv`.
pub fn venv_bin(project_dir: &Path, program: &str) -> PathBuf {
    if cfg!(windows) {
        project_dir
            .join(".venv")
            .join("Scripts")
            .join(format!("{program}.exe"))
    } else {
        project_dir.join(".venv").join("bin").join(program)
    }
}
