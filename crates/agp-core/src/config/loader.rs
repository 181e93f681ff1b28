//! Configuration and secrets file loading

use std::collections::HashMap;
use std::fs;

use camino::Utf8Path;
use tracing::warn;

use crate::config::types::{AdminCredentials, ConfigFile};
use crate::error::{Error, Result};

/// Load the YAML environment-definition file
///
/// Any read or parse failure is fatal: downstream provisioning would be
/// built on invalid input.
pub fn load_config(path: &Utf8Path) -> Result<ConfigFile> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::config_not_found(path.as_str())
        } else {
            Error::Io(e)
        }
    })?;

    let config: ConfigFile = serde_yaml_ng::from_str(&content)?;
    Ok(config)
}

/// Load admin credentials for one environment from the JSON secrets file
///
/// A secrets file that parses but has no entry for `env_key` yields
/// all-empty credentials and a warning; the caller skips provisioning for
/// that environment. Unreadable or malformed files are fatal.
pub fn load_admin_credentials(path: &Utf8Path, env_key: &str) -> Result<AdminCredentials> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::config_not_found(path.as_str())
        } else {
            Error::Io(e)
        }
    })?;

    let entries: HashMap<String, AdminCredentials> = serde_json::from_str(&content)?;

    match entries.get(env_key) {
        Some(credentials) => Ok(credentials.clone()),
        None => {
            warn!(
                "Environment {} missing from secrets file {}. Skipping.",
                env_key, path
            );
            Ok(AdminCredentials::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn write_temp(dir: &tempfile::TempDir, name: &str, content: &str) -> Utf8PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        Utf8PathBuf::from_path_buf(path).expect("path should be valid UTF-8")
    }

    #[test]
    fn test_load_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_temp(
            &dir,
            "config.yaml",
            r#"
global:
  algoliaApiKeyName: search-key
  location: europe-west1
  environments:
    dev:
      prefix: acme
      namespace: search
    prod:
      prefix: acme
      namespace: search
algoliaIndexes:
  - products
"#,
        );

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.global.location, "europe-west1");
        assert_eq!(cfg.algolia_indexes, vec!["products"]);
        // Declaration order survives parsing
        let names: Vec<&String> = cfg.global.environments.keys().collect();
        assert_eq!(names, vec!["dev", "prod"]);
    }

    #[test]
    fn test_load_config_not_found() {
        let result = load_config(Utf8Path::new("/tmp/nonexistent-agp-config-12345.yaml"));
        assert!(matches!(result, Err(Error::ConfigNotFound { .. })));
    }

    #[test]
    fn test_load_config_malformed_yaml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_temp(&dir, "config.yaml", "global:\n  bad_indent: [[[");
        let result = load_config(&path);
        assert!(matches!(result, Err(Error::YamlParse(_))));
    }

    #[test]
    fn test_load_admin_credentials() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_temp(
            &dir,
            "secrets",
            r#"{
  "search-dev": {
    "apiKey": "admin-key",
    "appId": "APP123",
    "gcpProject": "acme-dev"
  }
}"#,
        );

        let creds = load_admin_credentials(&path, "search-dev").unwrap();
        assert_eq!(creds.api_key, "admin-key");
        assert_eq!(creds.app_id, "APP123");
        assert_eq!(creds.gcp_project, "acme-dev");
        assert!(creds.is_complete());
    }

    #[test]
    fn test_load_admin_credentials_missing_env_is_empty_not_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_temp(&dir, "secrets", r#"{"search-dev": {"apiKey": "k"}}"#);

        let creds = load_admin_credentials(&path, "search-prod").unwrap();
        assert_eq!(creds.api_key, "");
        assert_eq!(creds.app_id, "");
        assert_eq!(creds.gcp_project, "");
        assert!(!creds.is_complete());
    }

    #[test]
    fn test_load_admin_credentials_malformed_json_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_temp(&dir, "secrets", "{ not json");
        let result = load_admin_credentials(&path, "search-dev");
        assert!(matches!(result, Err(Error::JsonParse(_))));
    }
}
