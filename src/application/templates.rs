//! Embedded project templates
//!
//! Templates are compiled into the binary and rendered by plain
//! `{{ name }}` substitution. Placeholders without a value are left alone,
//! so GitHub expressions like `${{ secrets.X }}` survive rendering.

use std::collections::BTreeMap;

// =============================================================================
// Embedded Templates
// =============================================================================

pub const APPLICATION_TOML: &str =
    include_str!("../../resources/templates/config/application.toml");
pub const ENVIRONMENT_TOML: &str =
    include_str!("../../resources/templates/config/environment.toml");
pub const ENVIRONMENT_LOCAL_TOML: &str =
    include_str!("../../resources/templates/config/environment-local.toml");

pub const AZUREDEPLOY_JSON: &str =
    include_str!("../../resources/templates/deployment/azuredeploy.json");
pub const PARAMETERS_JSON: &str =
    include_str!("../../resources/templates/deployment/parameters.json");

pub const DEPLOY_WORKFLOW: &str = include_str!("../../resources/templates/github/deploy.yml");
pub const BINSTUB: &str = include_str!("../../resources/templates/bin/legend");
pub const SETUP_PY: &str = include_str!("../../resources/templates/setup.py");
pub const README_MD: &str = include_str!("../../resources/templates/README.md");
pub const FUNCTION_TEST_PY: &str = include_str!("../../resources/templates/test/function.py");

pub const LIB_CONFIG_INIT_PY: &str =
    include_str!("../../resources/templates/lib/config/__init__.py");
pub const LIB_CONFIG_PY: &str = include_str!("../../resources/templates/lib/config/config.py");

/// Files written once per project by `new`: (project-relative target, template).
pub const PROJECT_FILES: &[(&str, &str)] = &[
    ("setup.py", SETUP_PY),
    ("README.md", README_MD),
    ("bin/legend", BINSTUB),
    (".github/workflows/deploy.yml", DEPLOY_WORKFLOW),
    ("lib/config/__init__.py", LIB_CONFIG_INIT_PY),
    ("lib/config/config.py", LIB_CONFIG_PY),
    ("config/application.toml", APPLICATION_TOML),
    ("deployment/azuredeploy.json", AZUREDEPLOY_JSON),
];

/// Appended to the `requirements.txt` written by `func init`.
pub const ADDITIONAL_REQUIREMENTS: &[&str] = &["tomli>=2.0.1"];

/// Content of `requirements-dev.txt`.
pub const DEV_REQUIREMENTS: &[&str] = &["pytest>=7.4.0", "ipython>=8.0"];

/// Config template for an environment: local ones skip deployment settings.
pub fn environment_template(local: bool) -> &'static str {
    if local {
        ENVIRONMENT_LOCAL_TOML
    } else {
        ENVIRONMENT_TOML
    }
}

/// Branch an environment deploys from, pinned in its config.
pub fn deploy_branch(environment: &str) -> &'static str {
    match environment {
        "sit" => "develop",
        _ => "main",
    }
}

/// Substitute `{{ key }}` (and `{{key}}`) for every key in `vars`.
pub fn render<K: AsRef<str>>(template: &str, vars: &BTreeMap<K, String>) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        let key = key.as_ref();
        acc.replace(&format!("{{{{ {key} }}}}"), value)
            .replace(&format!("{{{{{key}}}}}"), value)
    })
}
