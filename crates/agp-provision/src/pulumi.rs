//! Pulumi CLI engine implementation
//!
//! Each operation spawns the `pulumi` binary in the working directory that
//! holds the transient stack-program descriptor. Progress output is
//! captured, not streamed, so an `up` stays quiet apart from the driver's
//! own log lines.

use std::collections::{BTreeMap, HashMap};
use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use camino::Utf8PathBuf;
use tracing::debug;

use crate::engine::{
    ChangeSummary, ConfigValue, PreviewReport, ProvisioningEngine, SecretOutputs,
};

/// Explicit engine transport configuration
///
/// The underlying RPC layer reads these as process environment variables;
/// they are applied to every spawned engine process rather than mutated on
/// the orchestrator's own environment, so library code stays testable.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Directory holding the transient stack-program descriptor
    pub work_dir: Utf8PathBuf,

    /// GRPC_ENABLE_FORK_SUPPORT for the engine's RPC transport
    pub enable_fork_support: bool,

    /// GRPC_POLL_STRATEGY for the engine's RPC transport
    pub poll_strategy: String,
}

impl EngineSettings {
    pub fn new(work_dir: Utf8PathBuf) -> Self {
        Self {
            work_dir,
            enable_fork_support: true,
            poll_strategy: "poll".to_string(),
        }
    }
}

/// A required external tool missing from PATH
#[derive(Debug, Clone)]
pub struct MissingTool {
    pub name: &'static str,
    pub install_hint: &'static str,
}

/// Pulumi-CLI-backed provisioning engine
pub struct PulumiCli {
    settings: EngineSettings,
}

impl PulumiCli {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    /// Check that the external tools a run needs are on PATH
    pub fn check_prerequisites() -> Vec<MissingTool> {
        let mut missing = Vec::new();
        if which::which("pulumi").is_err() {
            missing.push(MissingTool {
                name: "pulumi",
                install_hint: "https://www.pulumi.com/docs/install/",
            });
        }
        if which::which("gcloud").is_err() {
            missing.push(MissingTool {
                name: "gcloud",
                install_hint: "https://cloud.google.com/sdk/docs/install",
            });
        }
        missing
    }

    /// Run pulumi with the given args, returning captured stdout/stderr
    async fn run(&self, args: &[&str]) -> Result<(String, String)> {
        debug!("Running: pulumi {}", args.join(" "));

        let output = tokio::process::Command::new("pulumi")
            .args(args)
            .current_dir(&self.settings.work_dir)
            .env(
                "GRPC_ENABLE_FORK_SUPPORT",
                if self.settings.enable_fork_support {
                    "true"
                } else {
                    "false"
                },
            )
            .env("GRPC_POLL_STRATEGY", &self.settings.poll_strategy)
            .stdin(Stdio::null())
            .output()
            .await
            .context("failed to invoke pulumi")?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(anyhow!(
                "pulumi {} failed: {}",
                args.join(" "),
                if stderr.trim().is_empty() {
                    stdout.trim()
                } else {
                    stderr.trim()
                }
            ));
        }

        Ok((stdout, stderr))
    }
}

#[async_trait]
impl ProvisioningEngine for PulumiCli {
    async fn create_or_select_stack(&self, stack: &str) -> Result<()> {
        self.run(&["stack", "select", "--create", stack]).await?;
        Ok(())
    }

    async fn set_config(&self, stack: &str, key: &str, value: ConfigValue) -> Result<()> {
        let mut args = vec!["config", "set", "--stack", stack];
        if value.secret {
            args.push("--secret");
        } else {
            args.push("--plaintext");
        }
        args.push(key);
        args.push(&value.value);
        self.run(&args).await?;
        Ok(())
    }

    async fn preview(&self, stack: &str) -> Result<PreviewReport> {
        let (stdout, stderr) = self.run(&["preview", "--stack", stack, "--json"]).await?;
        parse_preview(&stdout, &stderr)
    }

    async fn up(&self, stack: &str) -> Result<ChangeSummary> {
        // Serialized apply: per-call state in the descriptor directory
        // cannot tolerate parallel resource operations.
        let (stdout, _) = self
            .run(&[
                "up",
                "--stack",
                stack,
                "--yes",
                "--skip-preview",
                "--parallel",
                "1",
                "--json",
            ])
            .await?;
        parse_up_summary(&stdout)
    }

    async fn destroy(&self, stack: &str) -> Result<()> {
        self.run(&["destroy", "--stack", stack, "--yes"]).await?;
        Ok(())
    }

    async fn remove_stack(&self, stack: &str) -> Result<()> {
        self.run(&["stack", "rm", "--yes", stack]).await?;
        Ok(())
    }

    async fn stack_outputs(&self, stack: &str) -> Result<SecretOutputs> {
        let (stdout, _) = self
            .run(&["stack", "output", "--json", "--show-secrets", "--stack", stack])
            .await?;
        parse_outputs(&stdout)
    }
}

fn parse_change_buckets(value: &serde_json::Value) -> BTreeMap<String, u64> {
    value
        .as_object()
        .map(|changes| {
            changes
                .iter()
                .filter_map(|(op, count)| count.as_u64().map(|c| (op.clone(), c)))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_up_summary(stdout: &str) -> Result<ChangeSummary> {
    let value: serde_json::Value =
        serde_json::from_str(stdout).context("unexpected pulumi up output")?;
    Ok(ChangeSummary::new(parse_change_buckets(
        &value["summary"]["resourceChanges"],
    )))
}

fn parse_preview(stdout: &str, stderr: &str) -> Result<PreviewReport> {
    let value: serde_json::Value =
        serde_json::from_str(stdout).context("unexpected pulumi preview output")?;
    Ok(PreviewReport {
        change_summary: parse_change_buckets(&value["changeSummary"]),
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    })
}

fn parse_outputs(stdout: &str) -> Result<SecretOutputs> {
    let value: serde_json::Value =
        serde_json::from_str(stdout).context("unexpected pulumi stack output")?;
    let outputs: HashMap<String, String> = value
        .as_object()
        .map(|map| {
            map.iter()
                .map(|(k, v)| {
                    let rendered = match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), rendered)
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(SecretOutputs::new(outputs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_up_summary() {
        let stdout = r#"{"summary": {"resourceChanges": {"create": 2, "same": 3}}}"#;
        let summary = parse_up_summary(stdout).unwrap();
        assert_eq!(summary.resource_changes.get("create"), Some(&2));
        assert_eq!(summary.resource_changes.get("same"), Some(&3));
        assert_eq!(summary.without_unchanged().len(), 1);
    }

    #[test]
    fn test_parse_up_summary_without_changes_section() {
        let summary = parse_up_summary(r#"{"summary": {}}"#).unwrap();
        assert!(summary.resource_changes.is_empty());
    }

    #[test]
    fn test_parse_up_summary_malformed_is_error() {
        assert!(parse_up_summary("not json").is_err());
    }

    #[test]
    fn test_parse_preview() {
        let stdout = r#"{"changeSummary": {"create": 1}}"#;
        let report = parse_preview(stdout, "").unwrap();
        assert_eq!(report.change_summary.get("create"), Some(&1));
        assert!(report.to_string().contains("change summary"));
    }

    #[test]
    fn test_parse_outputs_stringifies_non_strings() {
        let stdout = r#"{"algolia-api-key-a": "secret", "count": 3}"#;
        let outputs = parse_outputs(stdout).unwrap();
        assert_eq!(outputs.len(), 2);
        let values: HashMap<&String, &String> = outputs.iter().collect();
        assert_eq!(values[&"algolia-api-key-a".to_string()], "secret");
        assert_eq!(values[&"count".to_string()], "3");
    }

    #[test]
    fn test_engine_settings_defaults() {
        let settings = EngineSettings::new(Utf8PathBuf::from("."));
        assert!(settings.enable_fork_support);
        assert_eq!(settings.poll_strategy, "poll");
    }
}
