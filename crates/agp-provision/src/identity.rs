//! Operator identity lookup
//!
//! Mirrored secrets are labeled with the deploying operator's username,
//! derived from the active gcloud account.

use anyhow::{anyhow, Context, Result};
use tracing::debug;

/// The deploying operator, as known to the cloud CLI
#[derive(Debug, Clone)]
pub struct Operator {
    /// Full account email
    pub account: String,
    /// Local part of the account, used for resource labels
    pub username: String,
}

/// Fetch the active operator from the gcloud CLI
///
/// Failure is fatal: a run that cannot identify its operator must not
/// provision labeled resources.
pub async fn current_operator() -> Result<Operator> {
    let output = tokio::process::Command::new("gcloud")
        .args(["info", "--format", "json"])
        .output()
        .await
        .context("failed to invoke gcloud")?;

    if !output.status.success() {
        return Err(anyhow!(
            "gcloud info failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    let operator = parse_operator(&String::from_utf8_lossy(&output.stdout))?;
    debug!("Deploying as {}", operator.account);
    Ok(operator)
}

fn parse_operator(json: &str) -> Result<Operator> {
    let config: serde_json::Value =
        serde_json::from_str(json).context("unexpected gcloud info output")?;

    let account = config["config"]["account"]
        .as_str()
        .ok_or_else(|| anyhow!("gcloud config has no active account"))?
        .to_string();

    let username = account
        .split('@')
        .next()
        .unwrap_or(account.as_str())
        .to_string();

    Ok(Operator { account, username })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_operator() {
        let json = r#"{"config": {"account": "jdoe@example.com"}}"#;
        let operator = parse_operator(json).unwrap();
        assert_eq!(operator.account, "jdoe@example.com");
        assert_eq!(operator.username, "jdoe");
    }

    #[test]
    fn test_parse_operator_missing_account() {
        let result = parse_operator(r#"{"config": {}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_operator_malformed_json() {
        assert!(parse_operator("not json").is_err());
    }
}
