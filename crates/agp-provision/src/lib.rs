//! # agp-provision
//!
//! Provisioning layer for the AGP CLI:
//! - The [`ProvisioningEngine`] seam and its Pulumi CLI implementation
//! - Stack-program rendering (transient YAML-runtime descriptors)
//! - Operator identity lookup for secret labeling
//! - The per-environment stage driver and the file-update gate

pub mod driver;
pub mod engine;
pub mod gate;
pub mod identity;
pub mod program;
pub mod pulumi;

pub use driver::{DeployFlags, EnvOutcome, Orchestrator};
pub use engine::{
    ChangeSummary, ConfigValue, PreviewReport, ProvisioningEngine, SecretOutputs, StageOutcome,
    Verb,
};
pub use gate::should_skip_file_update;
pub use identity::Operator;
pub use program::{ProgramDescriptor, StackProgram};
pub use pulumi::{EngineSettings, PulumiCli};
