//! Configuration loading for AGP
//!
//! Two inputs drive a run: the YAML environment-definition file
//! (global settings, per-environment overrides, index and API-key lists)
//! and the JSON admin-secrets file (one credentials entry per
//! `{namespace}-{environment}` key).

mod loader;
mod types;

pub use loader::{load_admin_credentials, load_config};
pub use types::{AdminCredentials, ApiKeySpec, ConfigFile, EnvConfig, GlobalSection};
