use std::{env, io, process};

use clap::{Command, CommandFactory, Parser};
use clap_complete::{generate, Generator};
use legend::cli::args::Cli;
use legend::cli::commands::execute_command;
use legend::cli::{output, CliError, CommandRegistry};
use legend::config::Settings;
use legend::exitcode;
use legend::infrastructure::di::ServiceContainer;
use legend::infrastructure::InfraError;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

fn fail(e: &CliError) -> ! {
    if let Some(out) = e.tool_output() {
        output::passthrough(out);
    }
    output::error(&e.category(), e);
    process::exit(e.exit_code());
}

fn main() {
    let registry = CommandRegistry::from_command(&Cli::command());

    let args = match registry.canonicalize(env::args().collect()) {
        Ok(args) => args,
        Err(e) => fail(&e),
    };

    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                exitcode::USAGE
            } else {
                exitcode::OK
            };
            // clap renders help, version and usage errors itself
            let _ = e.print();
            process::exit(code);
        }
    };

    if let Some(shell) = cli.completions {
        print_completions(shell, &mut Cli::command());
        process::exit(exitcode::OK);
    }

    setup_logging(cli.verbose);

    if let Some(dir) = &cli.project_dir {
        if let Err(e) = env::set_current_dir(dir) {
            fail(&InfraError::io(format!("change directory to {}", dir.display()), e).into());
        }
    }
    let project_dir = match env::current_dir() {
        Ok(dir) => dir,
        Err(e) => fail(&InfraError::io("read current directory", e).into()),
    };

    let settings = match Settings::load(Some(&project_dir)) {
        Ok(settings) => settings,
        Err(e) => fail(&e.into()),
    };

    if cli.command.is_none() {
        eprint!("{}", registry.render_list());
        process::exit(exitcode::USAGE);
    }

    let container = ServiceContainer::new(settings, project_dir);
    match execute_command(&cli, &container) {
        Ok(code) => process::exit(code),
        Err(e) => fail(&e),
    }
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let fmt_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(verbosity > 1)
        .with_thread_names(false)
        .with_span_events(if verbosity > 2 {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        });

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .init();

    tracing::debug!("log level: {filter}");
}

#[cfg(test)]
mod tests {
    use super::*;

    // https://docs.rs/clap/latest/clap/_derive/_tutorial/index.html#testing
    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
