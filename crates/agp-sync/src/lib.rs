//! # agp-sync
//!
//! Regenerates the two downstream configuration artifacts after
//! provisioning: per-index extension `.env` files and the shared
//! `firebase.json` extensions manifest.
//!
//! File writes are whole-file overwrites; a failed write is logged and
//! swallowed so one bad path never aborts the remaining indexes or
//! environments. A manifest that fails to parse is a config-class error
//! and fatal.

use std::fs;

use anyhow::{anyhow, Context, Result};
use camino::Utf8Path;
use serde_json::json;
use tracing::{debug, error};

use agp_core::{EnvConfig, GlobalSection};

/// Everything one environment's file sync needs
#[derive(Debug)]
pub struct SyncRequest<'a> {
    pub environment: &'a str,
    pub env_config: &'a EnvConfig,
    pub global: &'a GlobalSection,

    /// Effective index list; empty when the index stage did not run
    pub indexes: &'a [String],

    /// Admin application id, the fallback for `ALGOLIA_APP_ID`
    pub admin_app_id: &'a str,

    pub skip_extension_files: bool,
    pub skip_manifest: bool,

    pub extensions_dir: &'a Utf8Path,
    pub manifest_path: &'a Utf8Path,
}

/// Deterministic extension identifier for one index in one environment
///
/// Dots in index names become dashes so the id is a valid file name:
/// `a.b` in `prod` becomes `search-a-b.env.prod`.
pub fn extension_id(index: &str, environment: &str) -> String {
    format!("search-{}.env.{}", index.replace('.', "-"), environment)
}

/// Synchronize extension files and the manifest for one environment
pub fn sync_environment(req: &SyncRequest) -> Result<()> {
    for index in req.indexes {
        let id = extension_id(index, req.environment);

        if !req.skip_extension_files {
            debug!("Updating extension file {id}");
            write_extension_file(req, index, &id);
        }

        if !req.skip_manifest {
            debug!("Updating manifest entry for {id}");
            update_manifest(req.manifest_path, &id, &req.global.search_extension)?;
        }
    }

    Ok(())
}

fn write_extension_file(req: &SyncRequest, index: &str, id: &str) {
    let env = req.env_config;
    let global = req.global;

    let api_key_name = env
        .algolia_api_key_name
        .as_deref()
        .unwrap_or(&global.algolia_api_key_name);
    let app_id = env.algolia_app_id.as_deref().unwrap_or(req.admin_app_id);
    let force_data_sync = env.force_data_sync.unwrap_or(global.force_data_sync);
    let location = env.location.as_deref().unwrap_or(&global.location);

    let data = format!(
        "ALGOLIA_API_KEY={api_key_name}\n\
         ALGOLIA_APP_ID={app_id}\n\
         ALGOLIA_INDEX_NAME={index}\n\
         COLLECTION_PATH={index}\n\
         FORCE_DATA_SYNC={force_data_sync}\n\
         LOCATION={location}\n"
    );

    write_file(&req.extensions_dir.join(id), &data);
}

/// Read-modify-write the shared manifest: last writer wins, no locking
fn update_manifest(path: &Utf8Path, id: &str, extension_ref: &str) -> Result<()> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {path}"))?;
    let mut manifest: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse manifest {path}"))?;

    let root = manifest
        .as_object_mut()
        .ok_or_else(|| anyhow!("manifest {path} is not a JSON object"))?;
    let extensions = root
        .entry("extensions")
        .or_insert_with(|| json!({}))
        .as_object_mut()
        .ok_or_else(|| anyhow!("manifest {path} has a non-object extensions entry"))?;

    let extension = id.split(".env").next().unwrap_or(id);
    extensions.insert(
        extension.to_string(),
        serde_json::Value::String(extension_ref.to_string()),
    );

    let rendered = serde_json::to_string_pretty(&manifest)
        .with_context(|| format!("failed to render manifest {path}"))?;
    write_file(path, &rendered);
    Ok(())
}

/// Whole-file overwrite; failures are logged, never propagated
fn write_file(path: &Utf8Path, data: &str) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if let Err(e) = fs::write(path, data) {
        error!("Failed to write {path}: {e}");
    }
}
