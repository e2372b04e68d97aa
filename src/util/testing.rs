//! Test support: logging setup and fakes for the I/O boundary traits

use std::collections::VecDeque;
use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::{Mutex, Once};

use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::infrastructure::traits::{CommandRunner, Prompt};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "trace");
        }
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");

    // Create a filter for noisy modules
    let noisy_modules = [""];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| !name.is_empty() && metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Build an `ExitStatus` carrying `code`.
pub fn exit_status(code: i32) -> ExitStatus {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::from_raw(code << 8)
    }
    #[cfg(windows)]
    {
        use std::os::windows::process::ExitStatusExt;
        ExitStatus::from_raw(code as u32)
    }
}

/// One child process invocation seen by [`RecordingRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub dir: Option<PathBuf>,
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
    pub stdin: Option<String>,
    pub interactive: bool,
}

impl Invocation {
    /// `program arg1 arg2 ...`
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

struct Response {
    prefix: String,
    code: i32,
    stdout: String,
    stderr: String,
}

/// `CommandRunner` fake that records invocations and answers from a script.
///
/// Responses match on a prefix of the command line; the first match wins.
/// Unmatched commands succeed with empty output.
#[derive(Default)]
pub struct RecordingRunner {
    responses: Mutex<Vec<Response>>,
    calls: Mutex<Vec<Invocation>>,
    programs: Mutex<Vec<(String, PathBuf)>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands starting with `prefix`.
    pub fn respond(self, prefix: &str, code: i32, stdout: &str) -> Self {
        self.respond_full(prefix, code, stdout, "")
    }

    pub fn respond_full(self, prefix: &str, code: i32, stdout: &str, stderr: &str) -> Self {
        self.responses.lock().expect("lock").push(Response {
            prefix: prefix.to_string(),
            code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        });
        self
    }

    /// Make `find_program(name)` return `path`.
    pub fn with_program(self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.programs
            .lock()
            .expect("lock")
            .push((name.to_string(), path.into()));
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().expect("lock").clone()
    }

    /// Command lines of all recorded calls, in order.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(Invocation::command_line).collect()
    }

    fn record(&self, invocation: Invocation) -> (i32, String, String) {
        let line = invocation.command_line();
        self.calls.lock().expect("lock").push(invocation);
        self.responses
            .lock()
            .expect("lock")
            .iter()
            .find(|r| line.starts_with(&r.prefix))
            .map(|r| (r.code, r.stdout.clone(), r.stderr.clone()))
            .unwrap_or((0, String::new(), String::new()))
    }

    fn output(&self, invocation: Invocation) -> io::Result<Output> {
        let (code, stdout, stderr) = self.record(invocation);
        Ok(Output {
            status: exit_status(code),
            stdout: stdout.into_bytes(),
            stderr: stderr.into_bytes(),
        })
    }
}

fn invocation(dir: Option<&Path>, cmd: &str, args: &[&str]) -> Invocation {
    Invocation {
        dir: dir.map(Path::to_path_buf),
        program: cmd.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
        envs: Vec::new(),
        stdin: None,
        interactive: false,
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output> {
        self.output(invocation(None, cmd, args))
    }

    fn run_in(&self, dir: &Path, cmd: &str, args: &[&str]) -> io::Result<Output> {
        self.output(invocation(Some(dir), cmd, args))
    }

    fn run_with_stdin(&self, cmd: &str, args: &[&str], stdin: &str) -> io::Result<Output> {
        self.output(Invocation {
            stdin: Some(stdin.to_string()),
            ..invocation(None, cmd, args)
        })
    }

    fn run_interactive(
        &self,
        dir: &Path,
        cmd: &str,
        args: &[&str],
        envs: &[(&str, &str)],
    ) -> io::Result<ExitStatus> {
        let (code, _, _) = self.record(Invocation {
            envs: envs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            interactive: true,
            ..invocation(Some(dir), cmd, args)
        });
        Ok(exit_status(code))
    }

    fn find_program(&self, name: &str) -> Option<PathBuf> {
        self.programs
            .lock()
            .expect("lock")
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p.clone())
    }
}

/// `Prompt` fake answering from a fixed list; runs dry as empty answers.
#[derive(Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().expect("lock").clone()
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&self, message: &str) -> io::Result<String> {
        self.asked.lock().expect("lock").push(message.to_string());
        Ok(self
            .answers
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_setup() {
        init_test_setup();
    }

    #[test]
    fn given_scripted_response_when_run_then_returns_it_and_records() {
        let runner = RecordingRunner::new().respond("az group show", 3, "nope");

        let out = runner.run("az", &["group", "show", "--name", "x"]).unwrap();
        let other = runner.run("git", &["status"]).unwrap();

        assert_eq!(out.status.code(), Some(3));
        assert_eq!(String::from_utf8_lossy(&out.stdout), "nope");
        assert!(other.status.success());
        assert_eq!(
            runner.command_lines(),
            vec!["az group show --name x", "git status"]
        );
    }

    #[test]
    fn given_answers_when_confirm_then_consumes_in_order() {
        let prompt = ScriptedPrompt::new(&["y", "no"]);
        assert!(prompt.confirm("first?").unwrap());
        assert!(!prompt.confirm("second?").unwrap());
        assert!(!prompt.confirm("third?").unwrap());
        assert_eq!(prompt.asked().len(), 3);
    }
}
