//! Command resolution: names, one-letter aliases, synonyms and unique prefixes
//!
//! The registry is built once from the clap command tree. Before clap parses
//! the arguments, the command token is resolved here and rewritten to the
//! canonical command name, so unknown and ambiguous tokens fail before any
//! handler runs.

use std::collections::BTreeMap;

use clap::Command;
use tracing::debug;

use crate::cli::error::{CliError, CliResult};

/// Long global options that consume the following argument.
const LONG_OPTIONS_WITH_VALUE: &[&str] = &["--project-dir", "--completions"];

/// Short global flags that take a value (`-C dir`, `-vC dir`, `-Cdir`).
const SHORT_OPTIONS_WITH_VALUE: &[char] = &['C'];

/// One argument a command declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgDescriptor {
    pub name: String,
    pub required: bool,
    pub positional: bool,
}

/// A dispatchable command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub name: String,
    /// First letter, when no other command shares it
    pub alias: Option<String>,
    /// Descriptive names matched exactly, never by prefix
    pub synonyms: Vec<String>,
    pub about: String,
    pub args: Vec<ArgDescriptor>,
}

impl CommandDescriptor {
    fn from_subcommand(cmd: &Command) -> Self {
        let args = cmd
            .get_arguments()
            .filter(|a| !matches!(a.get_id().as_str(), "help" | "version"))
            .filter(|a| !a.is_global_set())
            .map(|a| ArgDescriptor {
                name: a.get_id().to_string(),
                required: a.is_required_set(),
                positional: a.is_positional(),
            })
            .collect();
        Self {
            name: cmd.get_name().to_string(),
            alias: None,
            synonyms: cmd.get_all_aliases().map(str::to_string).collect(),
            about: cmd.get_about().map(|s| s.to_string()).unwrap_or_default(),
            args,
        }
    }

    pub fn required_args(&self) -> impl Iterator<Item = &ArgDescriptor> {
        self.args.iter().filter(|a| a.required)
    }
}

/// Immutable table of all commands.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    commands: Vec<CommandDescriptor>,
}

impl CommandRegistry {
    /// Build from the top-level clap command; one-letter aliases are assigned
    /// to commands whose first letter is unique.
    pub fn from_command(root: &Command) -> Self {
        let mut commands: Vec<CommandDescriptor> = root
            .get_subcommands()
            .map(CommandDescriptor::from_subcommand)
            .collect();

        let mut by_letter: BTreeMap<char, usize> = BTreeMap::new();
        for c in &commands {
            if let Some(first) = c.name.chars().next() {
                *by_letter.entry(first).or_default() += 1;
            }
        }
        for c in &mut commands {
            if let Some(first) = c.name.chars().next() {
                if by_letter.get(&first) == Some(&1) {
                    c.alias = Some(first.to_string());
                }
            }
        }
        Self { commands }
    }

    pub fn commands(&self) -> &[CommandDescriptor] {
        &self.commands
    }

    pub fn get(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.iter().find(|c| c.name == name)
    }

    /// Resolve a token case-insensitively: exact name or synonym, else a
    /// unique name prefix.
    pub fn resolve(&self, token: &str) -> CliResult<&CommandDescriptor> {
        let token = token.to_lowercase();
        let token = token.as_str();
        if let Some(cmd) = self
            .commands
            .iter()
            .find(|c| c.name == token || c.synonyms.iter().any(|s| s == token))
        {
            return Ok(cmd);
        }

        let matches: Vec<&CommandDescriptor> = self
            .commands
            .iter()
            .filter(|c| !token.is_empty() && c.name.starts_with(token))
            .collect();
        match matches.as_slice() {
            [single] => Ok(*single),
            [] => Err(CliError::UnknownCommand {
                token: token.to_string(),
                suggestions: self.suggestions(token),
            }),
            many => Err(CliError::AmbiguousCommand {
                token: token.to_string(),
                candidates: many.iter().map(|c| c.name.clone()).collect(),
            }),
        }
    }

    /// Commands whose name or synonyms contain `token`.
    fn suggestions(&self, token: &str) -> Vec<String> {
        if token.is_empty() {
            return Vec::new();
        }
        self.commands
            .iter()
            .filter(|c| c.name.contains(token) || c.synonyms.iter().any(|s| s.contains(token)))
            .map(|c| c.name.clone())
            .collect()
    }

    /// Rewrite the command token in `args` (argv including program name) to its
    /// canonical name. Arguments without a command token are returned unchanged.
    pub fn canonicalize(&self, mut args: Vec<String>) -> CliResult<Vec<String>> {
        if let Some(index) = command_token_index(&args) {
            let resolved = self.resolve(&args[index])?.name.clone();
            debug!("dispatch: '{}' -> {}", args[index], resolved);
            args[index] = resolved;
        }
        Ok(args)
    }

    /// Command overview for `legend` without a command.
    pub fn render_list(&self) -> String {
        let width = self.commands.iter().map(|c| c.name.len()).max().unwrap_or(0);
        let mut out = String::from("Commands:\n");
        for c in &self.commands {
            let alias = c
                .alias
                .as_deref()
                .map(|a| format!("({a})"))
                .unwrap_or_default();
            out.push_str(&format!(
                "  {:<width$} {:<4} {}\n",
                c.name,
                alias,
                c.about,
                width = width
            ));
        }
        out
    }
}

/// Position of the command token: the first argument after the program name
/// that is neither an option nor an option's value.
pub fn command_token_index(args: &[String]) -> Option<usize> {
    let mut i = 1;
    while i < args.len() {
        let arg = args[i].as_str();
        if arg == "--" {
            return None;
        }
        if LONG_OPTIONS_WITH_VALUE.contains(&arg) {
            i += 2;
            continue;
        }
        if let Some(cluster) = arg.strip_prefix('-').filter(|c| !c.starts_with('-')) {
            i += if short_cluster_takes_next(cluster) { 2 } else { 1 };
            continue;
        }
        if arg.starts_with('-') {
            i += 1;
            continue;
        }
        return Some(i);
    }
    None
}

/// True when the last flag of a short cluster needs a value and none is
/// attached (`C`, `vC`), false for `v`, `vv` or `Cdir`.
fn short_cluster_takes_next(cluster: &str) -> bool {
    match cluster.char_indices().find(|(_, c)| SHORT_OPTIONS_WITH_VALUE.contains(c)) {
        Some((pos, c)) => pos + c.len_utf8() == cluster.len(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::Cli;
    use clap::{CommandFactory, Parser};
    use rstest::rstest;

    fn registry() -> CommandRegistry {
        CommandRegistry::from_command(&Cli::command())
    }

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case("n", "new")]
    #[case("g", "generate")]
    #[case("r", "run")]
    #[case("t", "test")]
    #[case("c", "console")]
    #[case("p", "provision")]
    #[case("i", "info")]
    #[case("e", "env")]
    #[case("b", "bootstrap")]
    #[case("dep", "deploy")]
    #[case("des", "destroy")]
    #[case("prov", "provision")]
    #[case("create-project", "new")]
    #[case("print-environment", "env")]
    #[case("env", "env")]
    fn test_resolve(#[case] token: &str, #[case] expected: &str) {
        assert_eq!(registry().resolve(token).unwrap().name, expected);
    }

    #[rstest]
    #[case("d")]
    #[case("de")]
    fn given_shared_prefix_when_resolve_then_ambiguous(#[case] token: &str) {
        match registry().resolve(token) {
            Err(CliError::AmbiguousCommand { candidates, .. }) => {
                assert_eq!(candidates, vec!["deploy", "destroy"]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn given_unknown_token_when_resolve_then_suggests_containing_commands() {
        match registry().resolve("stroy") {
            Err(CliError::UnknownCommand { token, suggestions }) => {
                assert_eq!(token, "stroy");
                assert_eq!(suggestions, vec!["destroy"]);
            }
            other => panic!("expected unknown, got {other:?}"),
        }
    }

    #[test]
    fn given_cluster_with_directory_flag_when_canonicalize_then_value_skipped() {
        let out = registry()
            .canonicalize(argv(&["legend", "-vC", "proj", "e", "sit"]))
            .unwrap();
        assert_eq!(out, argv(&["legend", "-vC", "proj", "env", "sit"]));
        let cli = Cli::try_parse_from(out).unwrap();
        assert_eq!(cli.verbose, 1);
        assert_eq!(cli.project_dir, Some(std::path::PathBuf::from("proj")));
    }

    #[rstest]
    #[case("ENV", "env")]
    #[case("Deploy", "deploy")]
    #[case("N", "new")]
    #[case("Print-Environment", "env")]
    fn given_upper_case_token_when_resolve_then_matches(#[case] token: &str, #[case] expected: &str) {
        assert_eq!(registry().resolve(token).unwrap().name, expected);
    }

    #[test]
    fn given_synonym_prefix_when_resolve_then_not_matched() {
        assert!(registry().resolve("show-dep").is_err());
    }

    #[test]
    fn given_registry_when_built_then_aliases_only_for_unique_letters() {
        let reg = registry();
        assert_eq!(reg.get("deploy").unwrap().alias, None);
        assert_eq!(reg.get("destroy").unwrap().alias, None);
        assert_eq!(reg.get("new").unwrap().alias.as_deref(), Some("n"));
        let new = reg.get("new").unwrap();
        let required: Vec<&str> = new.required_args().map(|a| a.name.as_str()).collect();
        assert_eq!(required, vec!["name"]);
    }

    #[test]
    fn given_every_alias_when_dispatched_then_parses_like_full_name() {
        let reg = registry();
        for cmd in reg.commands() {
            let Some(alias) = &cmd.alias else { continue };
            let mut tail: Vec<&str> = cmd
                .required_args()
                .filter(|a| a.positional)
                .map(|_| "x")
                .collect();
            if cmd.name == "generate" {
                tail = vec!["function", "x"];
            }
            let by_alias = reg
                .canonicalize(argv(&[&["legend", alias.as_str()][..], &tail[..]].concat()))
                .unwrap();
            let by_name = argv(&[&["legend", cmd.name.as_str()][..], &tail[..]].concat());

            let a = Cli::try_parse_from(by_alias).unwrap();
            let b = Cli::try_parse_from(by_name).unwrap();
            assert_eq!(a.command, b.command, "alias {alias} for {}", cmd.name);
        }
    }

    #[rstest]
    #[case(&["legend", "-v", "e", "sit"], Some(2))]
    #[case(&["legend", "-C", "proj", "env"], Some(3))]
    #[case(&["legend", "--project-dir", "d", "-vv", "info"], Some(4))]
    #[case(&["legend", "--help"], None)]
    #[case(&["legend", "--", "new"], None)]
    #[case(&["legend", "-vC", "proj", "env", "sit"], Some(3))]
    #[case(&["legend", "-vvC", "proj", "env"], Some(3))]
    #[case(&["legend", "-Cproj", "env"], Some(2))]
    #[case(&["legend", "--project-dir=proj", "env"], Some(2))]
    fn test_command_token_index(#[case] args: &[&str], #[case] expected: Option<usize>) {
        assert_eq!(command_token_index(&argv(args)), expected);
    }

    #[test]
    fn given_alias_with_options_when_canonicalize_then_only_token_rewritten() {
        let out = registry()
            .canonicalize(argv(&["legend", "-C", "e", "e", "sit"]))
            .unwrap();
        assert_eq!(out, argv(&["legend", "-C", "e", "env", "sit"]));
    }

    #[test]
    fn given_registry_when_render_list_then_shows_aliases() {
        let list = registry().render_list();
        assert!(list.contains("new"));
        assert!(list.contains("(n)"));
        assert!(list.contains("destroy"));
    }
}
