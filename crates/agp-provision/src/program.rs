//! Stack-program rendering
//!
//! The engine consumes a per-stage program: a transient YAML-runtime
//! descriptor declaring one resource per index, API key, or mirrored
//! secret. [`ProgramDescriptor`] owns the file on disk and removes it when
//! dropped, error paths included.

use std::fs;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::json;

use agp_core::ApiKeySpec;

use crate::engine::SecretOutputs;

/// Prefix of API-key resource names and their exported outputs
pub const API_KEY_OUTPUT_PREFIX: &str = "algolia-api-key-";

/// File name the engine reads the program from
const DESCRIPTOR_FILE: &str = "Pulumi.yaml";

const INDEX_TYPE: &str = "algolia:index/index:Index";
const API_KEY_TYPE: &str = "algolia:index/apiKey:ApiKey";
const SECRET_TYPE: &str = "gcp:secretmanager/secret:Secret";
const SECRET_VERSION_TYPE: &str = "gcp:secretmanager/secretVersion:SecretVersion";

/// One declared resource
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDecl {
    #[serde(rename = "type")]
    pub type_token: String,
    pub properties: serde_json::Value,
}

/// A renderable stack program
#[derive(Debug, Clone, Serialize)]
pub struct StackProgram {
    pub name: String,
    pub runtime: String,
    pub description: String,
    pub resources: IndexMap<String, ResourceDecl>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, String>,
}

impl StackProgram {
    fn new(project: &str, description: &str) -> Self {
        Self {
            name: project.to_string(),
            runtime: "yaml".to_string(),
            description: description.to_string(),
            resources: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }

    /// One index resource per entry, duplicates included
    pub fn indexes(project: &str, indexes: &[String]) -> Self {
        let mut program = Self::new(project, "Algolia index provisioning");
        for index in indexes {
            program.resources.insert(
                format!("algolia-index-{index}"),
                ResourceDecl {
                    type_token: INDEX_TYPE.to_string(),
                    properties: json!({ "name": index }),
                },
            );
        }
        program
    }

    /// One API-key resource per spec, each exporting its generated value
    pub fn api_keys(project: &str, api_keys: &[ApiKeySpec]) -> Self {
        let mut program = Self::new(project, "Algolia API-key provisioning");
        for key in api_keys {
            let resource = format!("{API_KEY_OUTPUT_PREFIX}{}", key.name);
            program.resources.insert(
                resource.clone(),
                ResourceDecl {
                    type_token: API_KEY_TYPE.to_string(),
                    properties: json!({
                        "acls": key.acls,
                        "description": key.description(),
                        "indexes": key.indexes,
                        "maxHitsPerQuery": key.max_hits_per_query,
                        "maxQueriesPerIpPerHour": key.max_api_call,
                        "referers": key.referers,
                        "validity": key.validity,
                    }),
                },
            );
            program
                .outputs
                .insert(resource.clone(), format!("${{{resource}.key}}"));
        }
        program
    }

    /// One secret + secret-version pair per exported API-key value
    ///
    /// Secret ids strip the output prefix from the key name and carry the
    /// configured secret-id prefix; each secret is labeled with the
    /// operator's username.
    pub fn secrets(
        project: &str,
        username: &str,
        outputs: &SecretOutputs,
        secret_name_prefix: &str,
    ) -> Self {
        let mut program = Self::new(project, "Secret-store mirroring of API-key values");
        for (output_key, secret_data) in outputs.iter() {
            let name = output_key
                .strip_prefix(API_KEY_OUTPUT_PREFIX)
                .unwrap_or(output_key);
            let secret_resource = format!("secret-{name}");
            program.resources.insert(
                secret_resource.clone(),
                ResourceDecl {
                    type_token: SECRET_TYPE.to_string(),
                    properties: json!({
                        "secretId": format!("{secret_name_prefix}-{name}"),
                        "labels": { "created-by": username },
                        "replication": { "automatic": "true" },
                    }),
                },
            );
            program.resources.insert(
                format!("secret-version-{name}"),
                ResourceDecl {
                    type_token: SECRET_VERSION_TYPE.to_string(),
                    properties: json!({
                        "secret": format!("${{{secret_resource}.id}}"),
                        "secretData": secret_data,
                    }),
                },
            );
        }
        program
    }

    /// Render the program as a YAML descriptor
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml_ng::to_string(self).context("failed to render stack program")
    }
}

/// The transient on-disk stack-program descriptor
///
/// Created immediately before the engine calls of a stage and removed on
/// drop, so a failing stage never leaks cross-run state.
#[derive(Debug)]
pub struct ProgramDescriptor {
    path: Utf8PathBuf,
}

impl ProgramDescriptor {
    /// Write `program` into `dir` and take ownership of the file
    pub fn write(dir: &Utf8Path, program: &StackProgram) -> Result<Self> {
        let path = dir.join(DESCRIPTOR_FILE);
        fs::write(&path, program.to_yaml()?)
            .with_context(|| format!("failed to write stack descriptor {path}"))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Drop for ProgramDescriptor {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn key_spec(name: &str) -> ApiKeySpec {
        serde_yaml_ng::from_str(&format!("name: {name}\nacls: [search]\n")).unwrap()
    }

    #[test]
    fn test_index_program_declares_one_resource_per_entry() {
        let program = StackProgram::indexes(
            "acme--search-dev",
            &["products".to_string(), "users".to_string()],
        );
        assert_eq!(program.resources.len(), 2);
        let decl = &program.resources["algolia-index-products"];
        assert_eq!(decl.type_token, INDEX_TYPE);
        assert_eq!(decl.properties["name"], "products");
        assert!(program.outputs.is_empty());
    }

    #[test]
    fn test_api_key_program_exports_key_values() {
        let program = StackProgram::api_keys("acme--search-dev", &[key_spec("frontend")]);
        let decl = &program.resources["algolia-api-key-frontend"];
        assert_eq!(decl.type_token, API_KEY_TYPE);
        assert_eq!(decl.properties["maxQueriesPerIpPerHour"], 15000);
        assert_eq!(decl.properties["description"], "API Key for frontend");
        assert_eq!(
            program.outputs["algolia-api-key-frontend"],
            "${algolia-api-key-frontend.key}"
        );
    }

    #[test]
    fn test_secret_program_strips_output_prefix() {
        let outputs = SecretOutputs::new(HashMap::from([(
            "algolia-api-key-frontend".to_string(),
            "s3cret".to_string(),
        )]));
        let program =
            StackProgram::secrets("acme--search-dev", "jdoe", &outputs, "algolia-secret");

        let secret = &program.resources["secret-frontend"];
        assert_eq!(secret.type_token, SECRET_TYPE);
        assert_eq!(secret.properties["secretId"], "algolia-secret-frontend");
        assert_eq!(secret.properties["labels"]["created-by"], "jdoe");

        let version = &program.resources["secret-version-frontend"];
        assert_eq!(version.type_token, SECRET_VERSION_TYPE);
        assert_eq!(version.properties["secret"], "${secret-frontend.id}");
        assert_eq!(version.properties["secretData"], "s3cret");
    }

    #[test]
    fn test_secret_program_keeps_unprefixed_output_keys() {
        let outputs =
            SecretOutputs::new(HashMap::from([("plain".to_string(), "v".to_string())]));
        let program = StackProgram::secrets("p", "jdoe", &outputs, "algolia-secret");
        assert!(program.resources.contains_key("secret-plain"));
    }

    #[test]
    fn test_descriptor_is_removed_on_drop() {
        let dir = tempfile::TempDir::new().unwrap();
        let dir_path = camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let program = StackProgram::indexes("proj", &["a".to_string()]);

        let descriptor_path;
        {
            let descriptor = ProgramDescriptor::write(&dir_path, &program).unwrap();
            descriptor_path = descriptor.path().to_owned();
            assert!(descriptor_path.exists());
            let content = fs::read_to_string(&descriptor_path).unwrap();
            assert!(content.contains("runtime: yaml"));
            assert!(content.contains("algolia-index-a"));
        }
        assert!(!descriptor_path.exists());
    }
}
