//! CLI argument definitions using clap
//!
//! Descriptive synonyms are hidden clap aliases; one-letter aliases and
//! unique prefixes are resolved by [`crate::cli::dispatch`] before parsing.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Scaffold, run and deploy Azure Functions apps (Python worker)
#[derive(Parser, Debug)]
#[command(name = "legend")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true, disable_help_subcommand = true)]
pub struct Cli {
    /// Verbose output, repeat for more (-v echoes child commands)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Run as if started in this directory
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    /// Print shell completions and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    pub completions: Option<clap_complete::Shell>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Create a new function app project
    #[command(alias = "create-project")]
    New {
        /// Name of the function app
        name: String,
        /// Azure region (default from settings)
        location: Option<String>,
        /// Do not create .venv
        #[arg(long)]
        skip_venv: bool,
        /// Do not run git init
        #[arg(long)]
        skip_git: bool,
        /// Create a private GitHub repository with gh
        #[arg(long)]
        github: bool,
    },

    /// Generate a component
    #[command(alias = "generate-component")]
    Generate {
        #[command(subcommand)]
        component: GenerateCommands,
    },

    /// Run the function app locally
    #[command(alias = "run-locally")]
    Run {
        /// Port for the functions host
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the test suite with pytest
    #[command(alias = "run-tests")]
    Test {
        /// Arguments passed to pytest
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Start a Python REPL with all functions loaded
    #[command(alias = "start-console")]
    Console,

    /// Provision Azure resources for an environment
    #[command(alias = "provision-resources")]
    Provision {
        /// Environment (default: LEGEND_ENVIRONMENT, then development)
        environment: Option<String>,
        /// Store the publish profile as a GitHub Actions secret
        #[arg(long)]
        github: bool,
    },

    /// Deploy the current branch to an environment
    Deploy {
        /// Environment (default: LEGEND_ENVIRONMENT, then development)
        environment: Option<String>,
        /// Force push
        #[arg(short, long)]
        force: bool,
    },

    /// Show hostname, keys and function URLs of a deployment
    #[command(alias = "show-deployment-info")]
    Info {
        /// Environment (default: LEGEND_ENVIRONMENT, then development)
        environment: Option<String>,
    },

    /// Delete all Azure resources of an environment
    #[command(alias = "destroy-resources")]
    Destroy {
        /// Environment (default: LEGEND_ENVIRONMENT, then development)
        environment: Option<String>,
        /// Skip both confirmations
        #[arg(short, long)]
        yes: bool,
    },

    /// Print an environment's configuration as shell exports
    #[command(alias = "print-environment")]
    Env {
        /// Environment (default: LEGEND_ENVIRONMENT, then development)
        environment: Option<String>,
    },

    /// Check developer tools and offer to install missing ones
    #[command(alias = "check-dependencies")]
    Bootstrap {
        /// Install without asking
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum GenerateCommands {
    /// Generate a function and its test
    #[command(visible_alias = "f")]
    Function {
        /// Function name (a Python identifier)
        name: String,
        /// func template
        #[arg(short, long, default_value = "HTTP trigger")]
        template: String,
        /// Authorization level
        #[arg(short, long, default_value = "function")]
        auth_level: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    // https://docs.rs/clap/latest/clap/_derive/_tutorial/index.html#testing
    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn given_generate_function_when_parsed_then_defaults_apply() {
        let cli = Cli::try_parse_from(["legend", "generate", "f", "hello"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Generate {
                component: GenerateCommands::Function {
                    name: "hello".into(),
                    template: "HTTP trigger".into(),
                    auth_level: "function".into(),
                }
            })
        );
    }

    #[test]
    fn given_pytest_flags_when_test_parsed_then_passed_through() {
        let cli = Cli::try_parse_from(["legend", "test", "test/functions", "-x"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Test {
                args: vec!["test/functions".into(), "-x".into()]
            })
        );
    }

    #[test]
    fn given_repeated_verbose_when_parsed_then_counts() {
        let cli = Cli::try_parse_from(["legend", "-vv", "env", "sit"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
