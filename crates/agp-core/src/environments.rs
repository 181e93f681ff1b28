//! Environment filter resolution

use indexmap::IndexMap;

use crate::config::EnvConfig;

/// Resolve a user-supplied environment filter against the configured set
///
/// The filter is comma-separated environment names. Every literal `all`
/// token is dropped rather than expanded; when nothing remains the full
/// configured set is substituted, in declaration order. Names are not
/// validated here: unknown environments surface as lookup failures in the
/// driver.
pub fn select_environments(
    filter: &str,
    configured: &IndexMap<String, EnvConfig>,
) -> Vec<String> {
    let selected: Vec<String> = filter
        .split(',')
        .filter(|token| *token != "all")
        .map(str::to_string)
        .collect();

    if selected.is_empty() {
        configured.keys().cloned().collect()
    } else {
        selected
    }
}
