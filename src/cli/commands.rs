//! Command handlers
//!
//! Each handler returns the process exit code on success.

use tracing::{debug, instrument};

use crate::application::services::{
    DeployOutcome, DeploymentInfo, NewFunction, NewProject, Target,
};
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, GenerateCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::domain::{keyed_url, DomainError, ProjectConfig};
use crate::exitcode;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

/// Prefix of variables printed by `env`.
const EXPORT_PREFIX: &str = "LEGEND";

/// Execute a parsed CLI command.
pub fn execute_command(cli: &Cli, container: &ServiceContainer) -> CliResult<i32> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage("no command given".into()));
    };
    match command {
        Commands::New {
            name,
            location,
            skip_venv,
            skip_git,
            github,
        } => cmd_new(
            container,
            NewProject {
                name: name.clone(),
                location: location.clone(),
                skip_venv: *skip_venv,
                skip_git: *skip_git,
                github: *github,
            },
        ),
        Commands::Generate { component } => match component {
            GenerateCommands::Function {
                name,
                template,
                auth_level,
            } => cmd_generate_function(
                container,
                NewFunction {
                    name: name.clone(),
                    template: template.clone(),
                    auth_level: auth_level.clone(),
                },
            ),
        },
        Commands::Run { port } => cmd_run(container, *port, cli.verbose > 0),
        Commands::Test { args } => cmd_test(container, args),
        Commands::Console => cmd_console(container),
        Commands::Provision {
            environment,
            github,
        } => cmd_provision(container, environment.as_deref(), *github),
        Commands::Deploy { environment, force } => {
            cmd_deploy(container, environment.as_deref(), *force)
        }
        Commands::Info { environment } => cmd_info(container, environment.as_deref()),
        Commands::Destroy { environment, yes } => {
            cmd_destroy(container, environment.as_deref(), *yes)
        }
        Commands::Env { environment } => cmd_env(container, environment.as_deref()),
        Commands::Bootstrap { yes } => cmd_bootstrap(container, *yes),
    }
}

/// Resolve the environment configuration, listing known environments when
/// the requested one does not exist.
fn resolve_config(container: &ServiceContainer, environment: Option<&str>) -> CliResult<ProjectConfig> {
    let service = container.environment_service();
    match service.resolve(environment) {
        Ok(config) => Ok(config),
        Err(ApplicationError::Domain(e @ DomainError::EnvironmentNotFound { .. })) => {
            if let Ok(known) = service.available() {
                if !known.is_empty() {
                    output::hint(&format!("available environments: {}", known.join(", ")));
                }
            }
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

// ============================================================
// Project commands
// ============================================================

#[instrument(skip(container))]
fn cmd_new(container: &ServiceContainer, opts: NewProject) -> CliResult<i32> {
    output::header(&format!("Creating new Azure Function App: {}", opts.name));
    let report = container
        .scaffold_service()
        .new_project(container.project_dir(), &opts)?;

    output::success(&format!("Created {}", report.project_dir.display()));
    output::detail(&format!("location: {}", report.location));
    output::detail(&format!("environments: {}", report.environments.join(", ")));
    output::info("");
    output::info("Next steps:");
    for (cmd, what) in [
        (format!("cd {}", opts.name), ""),
        ("legend generate function <name>".to_string(), "generate a new function"),
        ("legend test".to_string(), "run tests"),
        ("legend run".to_string(), "run the function app locally"),
        ("legend console".to_string(), "start an interactive console"),
        ("legend provision <env>".to_string(), "provision Azure resources"),
        ("legend deploy <env>".to_string(), "deploy to Azure"),
    ] {
        if what.is_empty() {
            output::detail(&cmd);
        } else {
            output::detail(&format!("{cmd:<36} # {what}"));
        }
    }
    Ok(exitcode::OK)
}

#[instrument(skip(container))]
fn cmd_generate_function(container: &ServiceContainer, opts: NewFunction) -> CliResult<i32> {
    output::header(&format!(
        "Generating function: {} (template: {})",
        opts.name, opts.template
    ));
    let test_file = container
        .scaffold_service()
        .generate_function(container.project_dir(), &opts)?;
    output::action("Created", &test_file.display());
    output::success(&format!("Function '{}' generated", opts.name));
    Ok(exitcode::OK)
}

#[instrument(skip(container))]
fn cmd_run(container: &ServiceContainer, port: Option<u16>, verbose: bool) -> CliResult<i32> {
    Ok(container
        .runtime_service()
        .run(container.project_dir(), port, verbose)?)
}

#[instrument(skip(container))]
fn cmd_test(container: &ServiceContainer, args: &[String]) -> CliResult<i32> {
    Ok(container
        .runtime_service()
        .test(container.project_dir(), args)?)
}

#[instrument(skip(container))]
fn cmd_console(container: &ServiceContainer) -> CliResult<i32> {
    Ok(container.runtime_service().console(container.project_dir())?)
}

// ============================================================
// Environment commands
// ============================================================

#[instrument(skip(container))]
fn cmd_provision(container: &ServiceContainer, environment: Option<&str>, github: bool) -> CliResult<i32> {
    let config = resolve_config(container, environment)?;
    output::header(&format!("Provisioning {}", config.environment()));
    let report = container
        .azure_service()
        .provision(container.project_dir(), &config, github)?;

    output::success(&format!(
        "Deployment {} applied to {}",
        report.deployment_name, report.target.resource_group
    ));
    if let Some(secret) = report.github_secret {
        output::success_detail(&format!("GitHub secret {secret} updated"));
    }
    Ok(exitcode::OK)
}

#[instrument(skip(container))]
fn cmd_deploy(container: &ServiceContainer, environment: Option<&str>, force: bool) -> CliResult<i32> {
    let config = resolve_config(container, environment)?;
    let target = Target::from_config(&config)?;
    output::header(&format!("Deploying to {}", target.environment));
    output::detail(&format!("Resource Group: {}", target.resource_group));
    output::detail(&format!("Function App: {}", target.function_app));

    match container
        .azure_service()
        .deploy(container.project_dir(), &config, force)?
    {
        DeployOutcome::Deployed { remote, branch } => {
            output::success(&format!(
                "Deployed {branch} to {} via {remote}",
                target.environment
            ));
            Ok(exitcode::OK)
        }
        DeployOutcome::PushFailed {
            remote,
            branch,
            exit_code,
        } => {
            output::failure("push to Azure failed");
            output::info("");
            output::info("Troubleshooting:");
            output::detail("1. Make sure all your changes are committed");
            output::detail("2. On a first deployment you may need to force push:");
            output::detail(&format!("   legend deploy {} --force", target.environment));
            output::detail(&format!("   (git push -f {remote} {branch}:master)"));
            Err(ApplicationError::ToolFailed {
                program: "git push".into(),
                exit_code,
                output: String::new(),
            }
            .into())
        }
    }
}

#[instrument(skip(container))]
fn cmd_info(container: &ServiceContainer, environment: Option<&str>) -> CliResult<i32> {
    let config = resolve_config(container, environment)?;
    let info = container
        .azure_service()
        .info(container.project_dir(), &config)?;
    print_info(&info);
    Ok(exitcode::OK)
}

fn print_info(info: &DeploymentInfo) {
    output::header(&format!("Function App: {}", info.target.function_app));
    output::detail(&format!("Resource Group: {}", info.target.resource_group));
    output::detail(&format!("Hostname: {}", info.hostname));

    let master = info.host_keys.master_key.as_deref();
    if master.is_some() || info.host_keys.valid_function_keys().next().is_some() {
        output::info("");
        output::info("Host Keys:");
        if let Some(key) = master {
            output::detail(&format!("Master Key: {key}"));
        }
        for (name, key) in info.host_keys.valid_function_keys() {
            output::detail(&format!("{name}: {key}"));
        }
    }

    output::info("");
    output::info("Functions:");
    if info.functions.is_empty() {
        output::detail("No functions found. Deploy your code first with `legend deploy`");
        return;
    }
    for function in &info.functions {
        let url = function
            .summary
            .invoke_url_template
            .as_deref()
            .unwrap_or("unknown");
        output::info("");
        output::action(function.summary.short_name(), &format!("Invoke URL: {url}"));
        if function.summary.invoke_url_template.is_none() {
            continue;
        }
        output::detail("URLs with keys:");
        if let Some(key) = master {
            output::detail(&format!("App Master Key: {}", keyed_url(url, key)));
        }
        if let Some(key) = info.host_keys.default_key() {
            output::detail(&format!("App Default Key: {}", keyed_url(url, key)));
        }
        for (name, key) in &function.keys {
            output::detail(&format!("Function {name}: {}", keyed_url(url, key)));
        }
    }
}

#[instrument(skip(container))]
fn cmd_destroy(container: &ServiceContainer, environment: Option<&str>, yes: bool) -> CliResult<i32> {
    let config = resolve_config(container, environment)?;
    let target = Target::from_config(&config)?;
    let azure = container.azure_service();
    azure.ensure_exists(container.project_dir(), &target)?;

    output::warning(&format!(
        "This will delete ALL resources in environment: {}",
        target.environment
    ));
    output::detail(&format!("Resource Group: {}", target.resource_group));
    output::detail(&format!("Function App: {}", target.function_app));
    output::info("This action cannot be undone!");

    azure.destroy(
        container.project_dir(),
        &target,
        yes,
        container.prompt.as_ref(),
    )?;
    output::success(&format!(
        "Deletion of resource group {} started",
        target.resource_group
    ));
    output::detail("Deletion may take several minutes; check the Azure portal for status");
    Ok(exitcode::OK)
}

#[instrument(skip(container))]
fn cmd_env(container: &ServiceContainer, environment: Option<&str>) -> CliResult<i32> {
    let config = resolve_config(container, environment)?;
    debug!("exporting {} for {}", EXPORT_PREFIX, config.environment());
    for (key, value) in config.export_vars(EXPORT_PREFIX) {
        output::info(&format!("export {key}=\"{}\";", shell_escape(&value)));
    }
    Ok(exitcode::OK)
}

/// Escape a value for a double-quoted shell string.
fn shell_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[instrument(skip(container))]
fn cmd_bootstrap(container: &ServiceContainer, yes: bool) -> CliResult<i32> {
    let service = container.bootstrap_service();
    output::header("Checking dependencies");

    let mut missing = Vec::new();
    for status in service.check_all() {
        if status.installed {
            output::success_detail(&format!("{} is installed", status.dependency.name));
        } else {
            output::failure(&format!("{} is not installed", status.dependency.name));
            missing.push(status.dependency);
        }
    }
    if missing.is_empty() {
        output::success("All dependencies are installed");
        return Ok(exitcode::OK);
    }

    let mut still_missing = Vec::new();
    for dependency in missing {
        output::info("");
        let Some(install) = dependency.install else {
            output::detail(&format!(
                "{}: please install manually: {}",
                dependency.name, dependency.homepage
            ));
            still_missing.push(dependency.name);
            continue;
        };
        output::detail(&format!("{}: {}", dependency.name, install.join(" ")));
        let accepted = yes
            || container
                .prompt
                .confirm(&format!("Install {} now?", dependency.name))
                .map_err(|e| InfraError::io("read answer", e))?;
        if !accepted {
            still_missing.push(dependency.name);
            continue;
        }
        match service.install(&dependency) {
            Ok(()) => output::success_detail(&format!("{} installed", dependency.name)),
            Err(e) => {
                output::failure(&format!("failed to install {}: {e}", dependency.name));
                output::detail(&format!("Please install manually: {}", dependency.homepage));
                still_missing.push(dependency.name);
            }
        }
    }

    if still_missing.is_empty() {
        Ok(exitcode::OK)
    } else {
        Err(ApplicationError::precondition(format!(
            "missing dependencies: {}",
            still_missing.join(", ")
        ))
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_special_characters_when_shell_escape_then_backslashed() {
        assert_eq!(shell_escape(r#"a"b$c`d\e"#), r#"a\"b\$c\`d\\e"#);
        assert_eq!(shell_escape("plain"), "plain");
    }
}
