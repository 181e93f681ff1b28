//! Shared utility functions for AGP crates

use camino::Utf8PathBuf;

use crate::error::{Error, Result};

/// Get the user's home directory
///
/// Prefers the HOME environment variable over dirs::home_dir() so that
/// container setups that remap HOME keep working; dirs reads /etc/passwd
/// and ignores env overrides.
pub fn get_home_dir() -> Result<Utf8PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        return Ok(Utf8PathBuf::from(home));
    }

    let home = dirs::home_dir()
        .ok_or_else(|| Error::invalid_config("Could not determine home directory"))?;
    Utf8PathBuf::from_path_buf(home)
        .map_err(|_| Error::invalid_config("Home directory path is not valid UTF-8"))
}
