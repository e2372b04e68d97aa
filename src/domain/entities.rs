//! Domain entities: core data structures

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::domain::names;

/// Azure resource names derived for one environment of an app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNames {
    pub app_name: String,
    pub environment: String,
    pub resource_group: String,
    pub storage_account: String,
    pub function_app: String,
    pub app_service_plan: String,
    pub key_vault: String,
}

impl ResourceNames {
    pub fn derive(app_name: &str, environment: &str) -> Self {
        let app = names::normalize_name(app_name);
        Self {
            resource_group: format!("{app}-group-{environment}"),
            storage_account: names::storage_account_name(&app, environment),
            function_app: format!("{app}-{environment}"),
            app_service_plan: format!("{app}-plan-{environment}"),
            key_vault: names::key_vault_name(&app, environment),
            environment: environment.to_string(),
            app_name: app,
        }
    }

    /// Template variables for config and deployment rendering.
    pub fn to_vars(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("app_name", self.app_name.clone()),
            ("environment", self.environment.clone()),
            ("resource_group", self.resource_group.clone()),
            ("storage_account", self.storage_account.clone()),
            ("function_app", self.function_app.clone()),
            ("app_service_plan", self.app_service_plan.clone()),
            ("key_vault_name", self.key_vault.clone()),
        ])
    }
}

/// One function as listed by `az functionapp function list`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSummary {
    /// Full name, `app/function`
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub invoke_url_template: Option<String>,
}

impl FunctionSummary {
    /// Function name without the app prefix.
    pub fn short_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// Host keys as returned by `az functionapp keys list`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HostKeys {
    #[serde(default)]
    pub master_key: Option<String>,
    #[serde(default)]
    pub function_keys: BTreeMap<String, Option<String>>,
}

impl HostKeys {
    /// Function keys with a value (null keys are dropped).
    pub fn valid_function_keys(&self) -> impl Iterator<Item = (&str, &str)> {
        self.function_keys
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
    }

    pub fn default_key(&self) -> Option<&str> {
        self.function_keys.get("default").and_then(|v| v.as_deref())
    }
}

/// Invoke URL with a key appended.
pub fn keyed_url(invoke_url: &str, key: &str) -> String {
    format!("{invoke_url}?code={key}")
}

/// Git remote URL carrying deployment credentials.
///
/// Azure reports local-git URLs as `https://None@host/...` or with the bare
/// user name; either way the user part is replaced.
pub fn authenticated_git_url(url: &str, user: &str, password: &str) -> String {
    match url.strip_prefix("https://") {
        Some(rest) => {
            let host = rest.split_once('@').map_or(rest, |(_, host)| host);
            format!("https://{user}:{password}@{host}")
        }
        None => url.to_string(),
    }
}

/// Name of the git remote a given environment deploys through.
pub fn deploy_remote(environment: &str) -> String {
    format!("azure-{environment}")
}

/// GitHub secret holding an environment's publish profile.
pub fn publish_profile_secret(environment: &str) -> String {
    format!(
        "AZURE_FUNCTIONAPP_PUBLISH_PROFILE_{}",
        environment.to_uppercase().replace('-', "_")
    )
}

/// Developer tool checked by `bootstrap`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: &'static str,
    pub program: &'static str,
    pub check_args: &'static [&'static str],
    /// Command line that installs it, if we know one
    pub install: Option<&'static [&'static str]>,
    pub homepage: &'static str,
}

/// Tools a legend project relies on, in check order.
pub fn dependencies(macos: bool) -> Vec<Dependency> {
    let mut deps = Vec::new();
    if macos {
        deps.push(Dependency {
            name: "Homebrew",
            program: "brew",
            check_args: &["--version"],
            install: None,
            homepage: "https://brew.sh",
        });
    }
    deps.extend([
        Dependency {
            name: "Git",
            program: "git",
            check_args: &["--version"],
            install: None,
            homepage: "https://git-scm.com",
        },
        Dependency {
            name: "pip",
            program: "pip3",
            check_args: &["--version"],
            install: Some(&["python3", "-m", "ensurepip", "--upgrade"]),
            homepage: "https://pip.pypa.io",
        },
        Dependency {
            name: "Azure Functions Core Tools",
            program: "func",
            check_args: &["--version"],
            install: if macos {
                Some(&["brew", "install", "azure-functions-core-tools@4"])
            } else {
                None
            },
            homepage: "https://learn.microsoft.com/en-us/azure/azure-functions/functions-run-local",
        },
        Dependency {
            name: "Azure CLI",
            program: "az",
            check_args: &["--version"],
            install: if macos {
                Some(&["brew", "install", "azure-cli"])
            } else {
                None
            },
            homepage: "https://learn.microsoft.com/en-us/cli/azure/install-azure-cli",
        },
        Dependency {
            name: "GitHub CLI",
            program: "gh",
            check_args: &["--version"],
            install: if macos {
                Some(&["brew", "install", "gh"])
            } else {
                None
            },
            homepage: "https://cli.github.com",
        },
    ]);
    deps
}

/// Expand `~`, `$VAR` and `${VAR}`; returns the input unchanged on failure.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_app_and_env_when_derive_names_then_follow_conventions() {
        let names = ResourceNames::derive("Order_Api", "sit");
        assert_eq!(names.app_name, "order-api");
        assert_eq!(names.resource_group, "order-api-group-sit");
        assert_eq!(names.function_app, "order-api-sit");
        assert_eq!(names.app_service_plan, "order-api-plan-sit");
        assert!(names.storage_account.starts_with("ordapisit"));
        assert!(names.key_vault.starts_with("ordapisitkv"));
        assert_eq!(names.to_vars()["key_vault_name"], names.key_vault);
    }

    #[test]
    fn given_az_function_json_when_deserialize_then_short_name_strips_app() {
        let json = r#"[{"name": "demo-sit/hello", "invokeUrlTemplate": "https://demo/api/hello", "other": 1}]"#;
        let funcs: Vec<FunctionSummary> = serde_json::from_str(json).unwrap();
        assert_eq!(funcs[0].short_name(), "hello");
        assert_eq!(
            funcs[0].invoke_url_template.as_deref(),
            Some("https://demo/api/hello")
        );
    }

    #[test]
    fn given_host_keys_with_nulls_when_filtering_then_drops_them() {
        let json = r#"{"masterKey": "m", "functionKeys": {"default": "d", "other": null}}"#;
        let keys: HostKeys = serde_json::from_str(json).unwrap();
        assert_eq!(keys.master_key.as_deref(), Some("m"));
        assert_eq!(keys.default_key(), Some("d"));
        assert_eq!(keys.valid_function_keys().count(), 1);
        assert_eq!(keyed_url("https://x/api/f", "d"), "https://x/api/f?code=d");
    }

    #[test]
    fn given_none_user_url_when_authenticate_then_replaces_user() {
        assert_eq!(
            authenticated_git_url("https://None@demo.scm.azurewebsites.net/demo.git", "$demo", "pw"),
            "https://$demo:pw@demo.scm.azurewebsites.net/demo.git"
        );
        assert_eq!(
            authenticated_git_url("https://demo.scm.azurewebsites.net/demo.git", "u", "p"),
            "https://u:p@demo.scm.azurewebsites.net/demo.git"
        );
    }

    #[test]
    fn given_environment_when_naming_deploy_targets_then_follows_conventions() {
        assert_eq!(deploy_remote("sit"), "azure-sit");
        assert_eq!(
            publish_profile_secret("production"),
            "AZURE_FUNCTIONAPP_PUBLISH_PROFILE_PRODUCTION"
        );
    }

    #[test]
    fn given_platform_when_dependencies_then_brew_only_on_macos() {
        assert!(dependencies(true).iter().any(|d| d.program == "brew"));
        assert!(!dependencies(false).iter().any(|d| d.program == "brew"));
    }
}
