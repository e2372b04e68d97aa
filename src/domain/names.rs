//! Azure resource naming
//!
//! Storage accounts and key vaults share a global namespace and have strict
//! character rules, so their names are derived from an abbreviated app name,
//! the environment, and a random suffix.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::DomainError;

/// Maximum length for storage account and key vault names.
pub const MAX_RESOURCE_NAME_LEN: usize = 24;

const MIN_RESOURCE_NAME_LEN: usize = 3;

static KEY_VAULT_INVALID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]").expect("valid key vault regex"));
static HYPHEN_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-+").expect("valid hyphen regex"));
static APP_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("valid app name regex"));
static PYTHON_IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Standard abbreviations for words common in service names.
const ABBREVIATIONS: &[(&str, &str)] = &[
    // service types
    ("service", "svc"),
    ("api", "api"),
    ("application", "app"),
    ("adapter", "adp"),
    ("integration", "int"),
    ("interface", "intf"),
    ("gateway", "gw"),
    ("proxy", "prx"),
    ("server", "srv"),
    ("client", "cli"),
    ("worker", "wkr"),
    ("daemon", "dmn"),
    ("scheduler", "sch"),
    ("processor", "prc"),
    ("handler", "hdlr"),
    ("listener", "lsnr"),
    ("monitor", "mon"),
    ("controller", "ctrl"),
    ("middleware", "mw"),
    // business domains
    ("customer", "cst"),
    ("payment", "pmt"),
    ("account", "acc"),
    ("transaction", "trx"),
    ("order", "ord"),
    ("invoice", "inv"),
    ("product", "prod"),
    ("inventory", "inv"),
    ("catalog", "cat"),
    ("document", "doc"),
    ("message", "msg"),
    ("notification", "notif"),
    ("analytics", "anly"),
    ("reporting", "rpt"),
    ("billing", "bill"),
    ("shipping", "ship"),
    ("tracking", "trk"),
    ("marketing", "mkt"),
    ("authentication", "auth"),
    ("authorization", "authz"),
    // operations
    ("manager", "mgr"),
    ("processing", "prc"),
    ("generator", "gen"),
    ("validator", "val"),
    ("converter", "conv"),
    ("transformer", "trf"),
    ("calculator", "calc"),
    ("formatter", "fmt"),
    ("publisher", "pub"),
    ("subscriber", "sub"),
    ("synchronizer", "sync"),
    ("orchestrator", "orch"),
    // data
    ("database", "db"),
    ("repository", "repo"),
    ("storage", "store"),
    ("cache", "cache"),
    ("queue", "q"),
    ("stream", "strm"),
    ("event", "evt"),
    ("config", "cfg"),
    ("settings", "set"),
    ("metadata", "meta"),
    // environments
    ("development", "dev"),
    ("production", "prod"),
    ("test", "test"),
    ("staging", "stg"),
    ("sandbox", "sbx"),
    ("quality", "qa"),
    ("acceptance", "uat"),
    ("preview", "prev"),
    ("performance", "perf"),
    // prefixes and suffixes
    ("internal", "int"),
    ("external", "ext"),
    ("public", "pub"),
    ("private", "prv"),
    ("shared", "shd"),
    ("common", "cmn"),
    ("core", "core"),
    ("legacy", "leg"),
    ("utility", "util"),
    ("helper", "hlpr"),
    ("wrapper", "wrap"),
    ("engine", "eng"),
    ("system", "sys"),
];

/// Lowercase and replace underscores with hyphens.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace('_', "-")
}

fn abbreviate(word: &str) -> String {
    if let Some((_, short)) = ABBREVIATIONS.iter().find(|(long, _)| *long == word) {
        return (*short).to_string();
    }
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    // first letter, then up to two consonants or digits
    let tail: String = chars
        .filter(|c| c.is_ascii_digit() || (c.is_alphabetic() && !"aeiou".contains(*c)))
        .take(2)
        .collect();
    format!("{first}{tail}")
}

/// Readable short form of a hyphenated name, at most `max_len` characters.
///
/// `customer-service-api` becomes `cstsvcapi`.
pub fn short_name(name: &str, max_len: usize) -> String {
    normalize_name(name)
        .split('-')
        .map(abbreviate)
        .collect::<String>()
        .chars()
        .take(max_len)
        .collect()
}

/// Append random hex characters until `name` reaches `max_len`.
pub fn pad_with_uuid(name: &str, max_len: usize) -> String {
    if name.chars().count() >= max_len {
        return name.chars().take(max_len).collect();
    }
    let needed = max_len - name.chars().count();
    let uid = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}", name, &uid[..needed.min(uid.len())])
}

fn ensure_min_len(mut name: String) -> String {
    while name.len() < MIN_RESOURCE_NAME_LEN {
        name.push('x');
    }
    name
}

/// Storage account name: lowercase letters and digits only, 3-24 chars.
pub fn storage_account_name(app_name: &str, environment: &str) -> String {
    let raw = format!("{}{}", short_name(app_name, 20), environment).to_lowercase();
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect();
    pad_with_uuid(&ensure_min_len(cleaned), MAX_RESOURCE_NAME_LEN)
}

/// Key vault name: lowercase letters, digits and single inner hyphens, 3-24 chars.
pub fn key_vault_name(app_name: &str, environment: &str) -> String {
    let raw = format!("{}{}kv", short_name(app_name, 19), environment).to_lowercase();
    let cleaned = KEY_VAULT_INVALID_RE.replace_all(&raw, "");
    let cleaned = HYPHEN_RUN_RE.replace_all(&cleaned, "-");
    let cleaned = cleaned.trim_matches('-').to_string();
    pad_with_uuid(&ensure_min_len(cleaned), MAX_RESOURCE_NAME_LEN)
}

const MAX_APP_NAME_LEN: usize = 40;

/// App names become directory, Python package and Azure resource name parts.
pub fn validate_app_name(name: &str) -> Result<(), DomainError> {
    let invalid = |reason: &str| DomainError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if !APP_NAME_RE.is_match(name) {
        return Err(invalid(
            "use letters, digits, '-' and '_', starting with a letter",
        ));
    }
    if name.len() > MAX_APP_NAME_LEN {
        return Err(invalid("at most 40 characters"));
    }
    Ok(())
}

/// Function names are Python identifiers (imported by the generated test).
pub fn validate_function_name(name: &str) -> Result<(), DomainError> {
    if PYTHON_IDENTIFIER_RE.is_match(name) {
        Ok(())
    } else {
        Err(DomainError::InvalidName {
            name: name.to_string(),
            reason: "function names must be valid Python identifiers".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("My_App", "my-app")]
    #[case("already-fine", "already-fine")]
    fn test_normalize_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_name(input), expected);
    }

    #[rstest]
    #[case("customer-service-api", "cstsvcapi")]
    #[case("payment-processing-service", "pmtprcsvc")]
    #[case("rta-customer-adapter", "rtcstadp")]
    #[case("widget", "wdg")]
    #[case("a1b2", "a1b")]
    fn test_short_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(short_name(input, 24), expected);
    }

    #[test]
    fn given_max_len_when_short_name_then_truncates() {
        assert_eq!(short_name("customer-service-api", 5), "cstsv");
    }

    #[test]
    fn given_short_name_when_pad_then_reaches_max_len() {
        let padded = pad_with_uuid("myapp", 24);
        assert_eq!(padded.len(), 24);
        assert!(padded.starts_with("myapp"));
        assert_eq!(pad_with_uuid("abcdef", 3), "abc");
    }

    #[rstest]
    #[case("customer-service-api", "production")]
    #[case("x", "sit")]
    #[case("Some_Really_Long_Application_Name_Here", "development")]
    fn storage_names_are_valid(#[case] app: &str, #[case] env: &str) {
        let name = storage_account_name(app, env);
        assert_eq!(name.len(), MAX_RESOURCE_NAME_LEN);
        assert!(name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[rstest]
    #[case("customer-service-api", "production")]
    #[case("x", "uat")]
    fn key_vault_names_are_valid(#[case] app: &str, #[case] env: &str) {
        let name = key_vault_name(app, env);
        assert_eq!(name.len(), MAX_RESOURCE_NAME_LEN);
        assert!(!name.starts_with('-') && !name.ends_with('-'));
        assert!(!name.contains("--"));
        assert!(name.starts_with(&short_name(app, 19)));
    }

    #[rstest]
    #[case("order-api", true)]
    #[case("Order_Api2", true)]
    #[case("2fast", false)]
    #[case("../escape", false)]
    #[case("", false)]
    fn test_validate_app_name(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(validate_app_name(name).is_ok(), valid);
    }

    #[rstest]
    #[case("hello", true)]
    #[case("_private2", true)]
    #[case("http-trigger", false)]
    #[case("9lives", false)]
    fn test_validate_function_name(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(validate_function_name(name).is_ok(), valid);
    }

    #[test]
    fn given_repeated_validation_when_called_then_results_stable() {
        for _ in 0..3 {
            assert!(validate_function_name("hello").is_ok());
            assert!(validate_app_name("order-api").is_ok());
            assert!(validate_app_name("2fast").is_err());
        }
    }
}
