//! Project configuration: base document merged with one environment document

use std::collections::BTreeMap;

use toml::{Table, Value};

use crate::domain::{DomainError, Environment};

/// Merge `overlay` onto `base`.
///
/// Tables present on both sides merge key by key; any other collision is won by
/// the overlay. Keys only in `base` keep their value. Neither input is modified,
/// so merging the same pair twice yields the same table.
pub fn merge_tables(base: &Table, overlay: &Table) -> Table {
    let mut merged = base.clone();
    for (key, value) in overlay {
        let combined = match (merged.get(key), value) {
            (Some(Value::Table(b)), Value::Table(o)) => Value::Table(merge_tables(b, o)),
            _ => value.clone(),
        };
        merged.insert(key.clone(), combined);
    }
    merged
}

/// Merged configuration for a resolved environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    environment: Environment,
    values: Table,
}

impl ProjectConfig {
    pub fn new(environment: Environment, base: &Table, overlay: &Table) -> Self {
        Self {
            environment,
            values: merge_tables(base, overlay),
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Look up a dotted path such as `azure.resource_group`.
    pub fn get(&self, path: &str) -> Result<&Value, DomainError> {
        let not_found = || DomainError::KeyNotFound(path.to_string());
        let mut segments = path.split('.');
        let first = segments.next().filter(|s| !s.is_empty()).ok_or_else(not_found)?;
        let mut current = self.values.get(first).ok_or_else(not_found)?;
        for segment in segments {
            current = current
                .as_table()
                .and_then(|t| t.get(segment))
                .ok_or_else(not_found)?;
        }
        Ok(current)
    }

    /// String value at `path`.
    pub fn get_str(&self, path: &str) -> Result<&str, DomainError> {
        self.get(path)?.as_str().ok_or_else(|| DomainError::KeyType {
            path: path.to_string(),
            expected: "string",
        })
    }

    /// Optional string: absent keys yield `None`, wrong types still fail.
    pub fn get_opt_str(&self, path: &str) -> Result<Option<&str>, DomainError> {
        match self.get_str(path) {
            Ok(s) => Ok(Some(s)),
            Err(DomainError::KeyNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Fails if any path is missing, naming all of them.
    pub fn require(&self, paths: &[&str]) -> Result<(), DomainError> {
        let missing: Vec<&str> = paths
            .iter()
            .copied()
            .filter(|p| self.get(p).is_err())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DomainError::KeyNotFound(missing.join(", ")))
        }
    }

    /// Flatten into shell variables: `PREFIX_SECTION_KEY` -> rendered value.
    pub fn export_vars(&self, prefix: &str) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        flatten_into(prefix, &self.values, &mut out);
        out
    }
}

fn env_key(key: &str) -> String {
    key.to_uppercase().replace(['-', '.'], "_")
}

fn flatten_into(parent: &str, table: &Table, out: &mut BTreeMap<String, String>) {
    for (key, value) in table {
        let name = format!("{}_{}", parent, env_key(key));
        match value {
            Value::Table(t) => flatten_into(&name, t, out),
            Value::String(s) => {
                out.insert(name, s.clone());
            }
            Value::Array(items) => {
                let joined = items
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                out.insert(name, joined);
            }
            other => {
                out.insert(name, other.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::environment::DEFAULT_ENVIRONMENT;

    fn table(src: &str) -> Table {
        toml::from_str(src).expect("valid toml")
    }

    fn config(base: &str, overlay: &str) -> ProjectConfig {
        let env = Environment::select(Some("sit"), None, DEFAULT_ENVIRONMENT).unwrap();
        ProjectConfig::new(env, &table(base), &table(overlay))
    }

    #[test]
    fn given_overlapping_sections_when_merged_then_override_wins_and_base_kept() {
        let cfg = config(
            "[api]\ntimeout = 30\nretries = 3\n",
            "[api]\ntimeout = 5\nbase_url = \"https://sit.example\"\n",
        );

        assert_eq!(cfg.get("api.timeout").unwrap().as_integer(), Some(5));
        assert_eq!(cfg.get_str("api.base_url").unwrap(), "https://sit.example");
        assert_eq!(cfg.get("api.retries").unwrap().as_integer(), Some(3));
    }

    #[test]
    fn given_same_documents_when_merged_twice_then_identical() {
        let base = table("[a]\nx = 1\n[a.deep]\ny = true\n[b]\nz = \"s\"\n");
        let overlay = table("[a]\nx = 2\n[a.deep]\nw = 1.5\nlist = [1, 2]\n");

        let once = merge_tables(&base, &overlay);
        let twice = merge_tables(&base, &overlay);
        assert_eq!(once, twice);
        assert_eq!(merge_tables(&once, &overlay), once);
    }

    #[test]
    fn given_scalar_replaced_by_table_when_merged_then_overlay_wins() {
        let merged = merge_tables(&table("a = 1\n"), &table("[a]\nb = 2\n"));
        assert!(merged.get("a").unwrap().is_table());
    }

    #[test]
    fn given_missing_path_when_get_then_key_not_found_names_full_path() {
        let cfg = config("[azure]\nlocation = \"x\"\n", "");
        assert_eq!(
            cfg.get("azure.resource_group").unwrap_err(),
            DomainError::KeyNotFound("azure.resource_group".into())
        );
        assert_eq!(
            cfg.get("azure.location.deeper").unwrap_err(),
            DomainError::KeyNotFound("azure.location.deeper".into())
        );
        assert!(cfg.get("").is_err());
    }

    #[test]
    fn given_non_string_when_get_str_then_type_error() {
        let cfg = config("[api]\ntimeout = 30\n", "");
        assert!(matches!(
            cfg.get_str("api.timeout"),
            Err(DomainError::KeyType { .. })
        ));
        assert_eq!(cfg.get_opt_str("api.missing").unwrap(), None);
    }

    #[test]
    fn given_missing_keys_when_require_then_lists_all() {
        let cfg = config("[azure]\nlocation = \"x\"\n", "");
        let err = cfg
            .require(&["azure.location", "azure.resource_group", "settings.app_name"])
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::KeyNotFound("azure.resource_group, settings.app_name".into())
        );
    }

    #[test]
    fn given_nested_config_when_export_vars_then_flattens_names() {
        let cfg = config(
            "[settings]\napp-name = \"demo\"\n[azure]\nlocation = \"eu\"\n",
            "[azure.function.app]\nworkers = 2\n",
        );
        let vars = cfg.export_vars("LEGEND");
        assert_eq!(vars["LEGEND_SETTINGS_APP_NAME"], "demo");
        assert_eq!(vars["LEGEND_AZURE_LOCATION"], "eu");
        assert_eq!(vars["LEGEND_AZURE_FUNCTION_APP_WORKERS"], "2");
    }
}
