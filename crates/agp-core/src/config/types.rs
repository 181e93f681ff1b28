//! Configuration types for the environment-definition file

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Root of the YAML environment-definition file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    /// Run-level settings and the environment table
    pub global: GlobalSection,

    /// Run-level index list, prepended to every environment's own list
    #[serde(default)]
    pub algolia_indexes: Vec<String>,

    /// Run-level API-key list, prepended to every environment's own list
    #[serde(default)]
    pub algolia_api_keys: Vec<ApiKeySpec>,
}

impl ConfigFile {
    /// Look up an environment's configuration
    pub fn environment(&self, name: &str) -> Option<&EnvConfig> {
        self.global.environments.get(name)
    }

    /// Effective index list for an environment (run-level first, no dedup)
    pub fn indexes_for(&self, env: &EnvConfig) -> Vec<String> {
        let mut indexes = self.algolia_indexes.clone();
        indexes.extend(env.algolia_indexes.iter().cloned());
        indexes
    }

    /// Effective API-key list for an environment (run-level first, no dedup)
    pub fn api_keys_for(&self, env: &EnvConfig) -> Vec<ApiKeySpec> {
        let mut keys = self.algolia_api_keys.clone();
        keys.extend(env.algolia_api_keys.iter().cloned());
        keys
    }
}

/// The `global` section of the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSection {
    /// Name of the search API key extensions reference
    pub algolia_api_key_name: String,

    /// Whether extensions force a full data sync on deploy
    #[serde(default)]
    pub force_data_sync: bool,

    /// Cloud region for extension deployment
    #[serde(default = "default_location")]
    pub location: String,

    /// Firebase search extension reference (id@version)
    #[serde(default = "default_search_extension")]
    pub search_extension: String,

    /// Prefix for mirrored secret ids in the secret store
    #[serde(default = "default_secret_name_prefix")]
    pub secret_name_prefix: String,

    /// Environment table, in declaration order
    pub environments: IndexMap<String, EnvConfig>,
}

fn default_location() -> String {
    "us-west2".to_string()
}

fn default_search_extension() -> String {
    "algolia/firestore-algolia-search@0.5.13".to_string()
}

fn default_secret_name_prefix() -> String {
    "algolia-secret".to_string()
}

/// Per-environment configuration and overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvConfig {
    /// Stack-name prefix (usually the product or team name)
    pub prefix: String,

    /// Namespace, also the first half of the secrets-file key
    pub namespace: String,

    /// Override for the global API-key name
    #[serde(default)]
    pub algolia_api_key_name: Option<String>,

    /// Override for the admin application id written to extension files
    #[serde(default)]
    pub algolia_app_id: Option<String>,

    /// Override for the global force-data-sync flag
    #[serde(default)]
    pub force_data_sync: Option<bool>,

    /// Override for the global location
    #[serde(default)]
    pub location: Option<String>,

    /// Environment-specific indexes, appended to the run-level list
    #[serde(default)]
    pub algolia_indexes: Vec<String>,

    /// Environment-specific API keys, appended to the run-level list
    #[serde(default)]
    pub algolia_api_keys: Vec<ApiKeySpec>,
}

/// Declaration of one scoped Algolia API key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeySpec {
    /// Key name, also the output and secret-id suffix
    pub name: String,

    /// Permitted operations
    pub acls: Vec<String>,

    /// Indexes the key is scoped to (empty = all)
    #[serde(default)]
    pub indexes: Vec<String>,

    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,

    /// Max queries per IP per hour
    #[serde(default = "default_max_api_call")]
    pub max_api_call: u32,

    /// Max hits per query (0 = provider default)
    #[serde(default)]
    pub max_hits_per_query: u32,

    /// Allowed HTTP referers
    #[serde(default)]
    pub referers: Vec<String>,

    /// Key validity in seconds (0 = no expiry)
    #[serde(default)]
    pub validity: u64,
}

fn default_max_api_call() -> u32 {
    15000
}

impl ApiKeySpec {
    /// Effective description, derived from the name when unset
    pub fn description(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("API Key for {}", self.name))
    }
}

/// Admin credentials for one environment, from the secrets file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCredentials {
    /// Algolia admin API key
    #[serde(default)]
    pub api_key: String,

    /// Algolia application id
    #[serde(default)]
    pub app_id: String,

    /// GCP project hosting the mirrored secrets
    #[serde(default)]
    pub gcp_project: String,
}

impl AdminCredentials {
    /// All three values must be present for provisioning to proceed
    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty() && !self.app_id.is_empty() && !self.gcp_project.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_defaults() {
        let yaml = r#"
name: search-only
acls:
  - search
"#;
        let key: ApiKeySpec = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(key.max_api_call, 15000);
        assert_eq!(key.max_hits_per_query, 0);
        assert_eq!(key.validity, 0);
        assert!(key.indexes.is_empty());
        assert!(key.referers.is_empty());
        assert_eq!(key.description(), "API Key for search-only");
    }

    #[test]
    fn test_api_key_explicit_description() {
        let yaml = r#"
name: admin
acls: [search, browse]
description: frontend admin key
maxApiCall: 100
"#;
        let key: ApiKeySpec = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(key.description(), "frontend admin key");
        assert_eq!(key.max_api_call, 100);
    }

    #[test]
    fn test_effective_lists_concatenate_global_first() {
        let yaml = r#"
global:
  algoliaApiKeyName: search-key
  environments:
    dev:
      prefix: acme
      namespace: search
      algoliaIndexes: [extra]
algoliaIndexes: [products, users]
"#;
        let cfg: ConfigFile = serde_yaml_ng::from_str(yaml).unwrap();
        let env = cfg.environment("dev").unwrap();
        assert_eq!(cfg.indexes_for(env), vec!["products", "users", "extra"]);
    }

    #[test]
    fn test_duplicates_are_not_deduplicated() {
        let yaml = r#"
global:
  algoliaApiKeyName: search-key
  environments:
    dev:
      prefix: acme
      namespace: search
      algoliaIndexes: [products]
algoliaIndexes: [products]
"#;
        let cfg: ConfigFile = serde_yaml_ng::from_str(yaml).unwrap();
        let env = cfg.environment("dev").unwrap();
        assert_eq!(cfg.indexes_for(env), vec!["products", "products"]);
    }

    #[test]
    fn test_global_defaults() {
        let yaml = r#"
global:
  algoliaApiKeyName: search-key
  environments: {}
"#;
        let cfg: ConfigFile = serde_yaml_ng::from_str(yaml).unwrap();
        assert!(!cfg.global.force_data_sync);
        assert_eq!(cfg.global.location, "us-west2");
        assert_eq!(
            cfg.global.search_extension,
            "algolia/firestore-algolia-search@0.5.13"
        );
        assert_eq!(cfg.global.secret_name_prefix, "algolia-secret");
    }

    #[test]
    fn test_credentials_completeness() {
        let complete = AdminCredentials {
            api_key: "k".into(),
            app_id: "a".into(),
            gcp_project: "p".into(),
        };
        assert!(complete.is_complete());

        let partial = AdminCredentials {
            api_key: "k".into(),
            ..Default::default()
        };
        assert!(!partial.is_complete());
        assert!(!AdminCredentials::default().is_complete());
    }
}
