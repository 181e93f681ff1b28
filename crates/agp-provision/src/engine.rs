//! Provisioning engine trait and verb/outcome types

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use zeroize::Zeroize;

/// The four supported provisioning operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// Compute and log a change plan, then halt the entire run
    Preview,
    /// Destroy all resources in the stack
    Rm,
    /// Destroy all resources and the stack's own bookkeeping
    RmStack,
    /// Apply changes
    Up,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Preview => write!(f, "preview"),
            Verb::Rm => write!(f, "rm"),
            Verb::RmStack => write!(f, "rm-stack"),
            Verb::Up => write!(f, "up"),
        }
    }
}

impl FromStr for Verb {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "preview" => Ok(Verb::Preview),
            "rm" => Ok(Verb::Rm),
            "rm-stack" => Ok(Verb::RmStack),
            "up" => Ok(Verb::Up),
            other => Err(anyhow::anyhow!(
                "Unknown verb {other}! Valid operations are: [preview, rm, rm-stack, up]."
            )),
        }
    }
}

/// A stack configuration value, optionally stored encrypted
#[derive(Debug, Clone)]
pub struct ConfigValue {
    pub value: String,
    pub secret: bool,
}

impl ConfigValue {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            secret: false,
        }
    }

    pub fn secret(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            secret: true,
        }
    }
}

/// The engine's report of resource changes from an apply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    /// Change buckets keyed by operation (`create`, `update`, `delete`,
    /// `same`, ...)
    pub resource_changes: BTreeMap<String, u64>,
}

impl ChangeSummary {
    pub fn new(resource_changes: BTreeMap<String, u64>) -> Self {
        Self { resource_changes }
    }

    /// The change buckets minus the unchanged (`same`) bucket
    pub fn without_unchanged(&self) -> BTreeMap<String, u64> {
        let mut changes = self.resource_changes.clone();
        changes.remove("same");
        changes
    }
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.resource_changes.is_empty() {
            return write!(f, "no changes");
        }
        let mut first = true;
        for (op, count) in &self.resource_changes {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{op}: {count}")?;
            first = false;
        }
        Ok(())
    }
}

/// A dry-run change plan
#[derive(Debug, Clone, Default)]
pub struct PreviewReport {
    pub change_summary: BTreeMap<String, u64>,
    pub stdout: String,
    pub stderr: String,
}

impl fmt::Display for PreviewReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.stdout)?;
        if !self.stderr.is_empty() {
            writeln!(f, "stderr: {}", self.stderr)?;
        }
        write!(
            f,
            "change summary: {}",
            ChangeSummary::new(self.change_summary.clone())
        )
    }
}

/// Typed result of executing a verb against a stack
#[derive(Debug, Clone)]
pub enum StageOutcome {
    /// `up` completed with the given change summary
    Applied(ChangeSummary),
    /// `preview` completed; the run halts after logging the plan
    Previewed(PreviewReport),
    /// `rm` destroyed the stack's resources
    Destroyed,
    /// `rm-stack` destroyed the resources and removed the stack
    StackRemoved,
}

/// Decrypted stack outputs, zeroed when dropped
#[derive(Default)]
pub struct SecretOutputs {
    values: HashMap<String, String>,
}

impl SecretOutputs {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for SecretOutputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretOutputs([REDACTED {} entries])", self.values.len())
    }
}

impl Drop for SecretOutputs {
    fn drop(&mut self) {
        for (_, mut value) in self.values.drain() {
            value.zeroize();
        }
    }
}

/// Stateful stack abstraction over the external provisioning engine
///
/// One stack at a time: implementations read the transient stack-program
/// descriptor from their working directory, so calls must not be issued
/// concurrently.
#[async_trait]
pub trait ProvisioningEngine: Send + Sync {
    /// Idempotently create or select the named stack
    async fn create_or_select_stack(&self, stack: &str) -> Result<()>;

    /// Set a stack configuration value
    async fn set_config(&self, stack: &str, key: &str, value: ConfigValue) -> Result<()>;

    /// Compute a change plan without applying it
    async fn preview(&self, stack: &str) -> Result<PreviewReport>;

    /// Apply changes, returning the change summary
    async fn up(&self, stack: &str) -> Result<ChangeSummary>;

    /// Destroy all resources in the stack
    async fn destroy(&self, stack: &str) -> Result<()>;

    /// Remove the stack's own bookkeeping
    async fn remove_stack(&self, stack: &str) -> Result<()>;

    /// Read back the stack's outputs, decrypted
    async fn stack_outputs(&self, stack: &str) -> Result<SecretOutputs>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_round_trip() {
        for verb in [Verb::Preview, Verb::Rm, Verb::RmStack, Verb::Up] {
            assert_eq!(verb.to_string().parse::<Verb>().unwrap(), verb);
        }
    }

    #[test]
    fn test_unknown_verb_is_error() {
        assert!("destroy".parse::<Verb>().is_err());
    }

    #[test]
    fn test_without_unchanged_drops_same_bucket() {
        let summary = ChangeSummary::new(BTreeMap::from([
            ("same".to_string(), 4),
            ("create".to_string(), 2),
        ]));
        let changes = summary.without_unchanged();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.get("create"), Some(&2));
    }

    #[test]
    fn test_secret_outputs_debug_is_redacted() {
        let outputs = SecretOutputs::new(HashMap::from([(
            "algolia-api-key-admin".to_string(),
            "hunter2".to_string(),
        )]));
        let debug = format!("{outputs:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("hunter2"));
    }
}
