//! # agp-core
//!
//! Core library for the AGP CLI providing:
//! - Environment-definition file parsing (config.yaml)
//! - Admin-credentials lookup from the secrets file
//! - Environment filter resolution
//! - Shared error types

pub mod config;
pub mod environments;
pub mod error;
pub mod utils;

pub use config::{AdminCredentials, ApiKeySpec, ConfigFile, EnvConfig, GlobalSection};
pub use environments::select_environments;
pub use error::{Error, Result};
pub use utils::get_home_dir;
