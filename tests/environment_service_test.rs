//! Tests for EnvironmentService

use std::path::PathBuf;
use std::sync::Arc;

use rstest::rstest;
use tempfile::TempDir;

use legend::application::services::EnvironmentService;
use legend::application::ApplicationError;
use legend::domain::{DomainError, Environment, NameSource};
use legend::infrastructure::traits::RealFileSystem;

/// Helper to create a config document for testing
fn create_config_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let config_dir = dir.path().join("config");
    std::fs::create_dir_all(&config_dir).expect("create config dir");
    let path = config_dir.join(name);
    std::fs::write(&path, content).expect("write config file");
    path
}

fn service(dir: &TempDir) -> EnvironmentService {
    EnvironmentService::new(
        Arc::new(RealFileSystem),
        dir.path().join("config"),
        "development",
    )
}

/// Project with the four standard environments.
fn standard_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    create_config_file(
        &temp,
        "application.toml",
        r#"[api]
timeout = 30
base_url = "https://example.test"
"#,
    );
    for env in ["development", "sit", "uat", "production"] {
        create_config_file(
            &temp,
            &format!("{env}.toml"),
            &format!("[settings]\nenvironment = \"{env}\"\n"),
        );
    }
    temp
}

#[test]
fn given_override_for_one_key_when_resolving_then_base_keys_survive() {
    // Arrange
    let temp = standard_project();
    create_config_file(&temp, "development.toml", "[api]\ntimeout = 5\n");

    // Act
    let config = service(&temp).resolve(Some("development")).unwrap();

    // Assert
    assert_eq!(config.get("api.timeout").unwrap().as_integer(), Some(5));
    assert_eq!(
        config.get_str("api.base_url").unwrap(),
        "https://example.test"
    );
}

#[test]
fn given_missing_environment_when_resolving_then_fails_naming_it() {
    let temp = standard_project();

    let err = service(&temp).resolve(Some("qa")).unwrap_err();

    match err {
        ApplicationError::Domain(DomainError::EnvironmentNotFound { name, path }) => {
            assert_eq!(name, "qa");
            assert!(path.ends_with("config/qa.toml"));
        }
        other => panic!("expected environment-not-found, got {other:?}"),
    }
    assert!(service(&temp)
        .resolve(Some("qa"))
        .unwrap_err()
        .to_string()
        .contains("qa"));
}

#[test]
fn given_reserved_name_when_resolving_then_rejected() {
    let temp = standard_project();

    let err = service(&temp).resolve(Some("application")).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::ReservedEnvironment(_))
    ));
}

#[test]
fn given_no_config_dir_when_resolving_then_not_a_project() {
    let temp = TempDir::new().unwrap();

    let err = service(&temp).resolve(Some("development")).unwrap_err();

    assert!(matches!(err, ApplicationError::NotAProject(_)));
}

#[test]
fn given_no_base_document_when_resolving_then_environment_alone_is_used() {
    let temp = TempDir::new().unwrap();
    create_config_file(&temp, "sit.toml", "[azure]\nfunction_app = \"demo-sit\"\n");

    let config = service(&temp).resolve(Some("sit")).unwrap();

    assert_eq!(config.get_str("azure.function_app").unwrap(), "demo-sit");
    assert!(config.get("api.timeout").is_err());
}

#[test]
fn given_invalid_toml_when_resolving_then_config_error_names_file() {
    let temp = standard_project();
    create_config_file(&temp, "uat.toml", "[azure\nbroken = ");

    let err = service(&temp).resolve(Some("uat")).unwrap_err();

    match &err {
        ApplicationError::Config { message } => assert!(message.contains("uat.toml")),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn given_missing_key_when_get_then_key_not_found_names_full_path() {
    let temp = standard_project();
    let config = service(&temp).resolve(Some("sit")).unwrap();

    let err = config.get("api.retries").unwrap_err();

    assert_eq!(err, DomainError::KeyNotFound("api.retries".into()));
}

#[test]
fn given_config_dir_when_listing_available_then_base_document_excluded() {
    let temp = standard_project();
    create_config_file(&temp, "notes.txt", "not toml");

    let names = service(&temp).available().unwrap();

    assert_eq!(names, vec!["development", "production", "sit", "uat"]);
}

#[rstest]
#[case(Some("sit"), Some("uat"), "sit", NameSource::Explicit)]
#[case(None, Some("uat"), "uat", NameSource::Variable)]
#[case(None, Some(""), "development", NameSource::Default)]
#[case(None, None, "development", NameSource::Default)]
fn test_environment_precedence(
    #[case] explicit: Option<&str>,
    #[case] from_var: Option<&str>,
    #[case] expected: &str,
    #[case] source: NameSource,
) {
    let env = Environment::select(explicit, from_var, "development").unwrap();
    assert_eq!(env.name(), expected);
    assert_eq!(env.source(), source);
}

#[test]
fn given_resolved_config_when_export_vars_then_flattened_with_prefix() {
    let temp = standard_project();

    let vars = service(&temp)
        .resolve(Some("sit"))
        .unwrap()
        .export_vars("LEGEND");

    assert_eq!(vars.get("LEGEND_API_TIMEOUT").map(String::as_str), Some("30"));
    assert_eq!(
        vars.get("LEGEND_SETTINGS_ENVIRONMENT").map(String::as_str),
        Some("sit")
    );
}
