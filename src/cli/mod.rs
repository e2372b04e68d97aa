//! CLI layer: argument parsing, command resolution and dispatch

pub mod args;
pub mod commands;
pub mod dispatch;
pub mod error;
pub mod output;

pub use args::{Cli, Commands};
pub use dispatch::CommandRegistry;
pub use error::{CliError, CliResult, ErrorCategory};
