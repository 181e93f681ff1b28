//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};

use agp_provision::Verb;

/// AGP - Provision Algolia search infrastructure per environment
#[derive(Parser, Debug)]
#[command(name = "agp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Operation to execute against environment resources
    #[arg(value_enum)]
    pub verb: VerbArg,

    /// Environments to deploy. Use ',' when deploying multiple
    /// environments. Deploys all environments by default.
    #[arg(default_value = "all")]
    pub environment: String,

    /// Collections to deploy, separated by ','. Reserved; current logic
    /// deploys all collections regardless.
    #[arg(default_value = "all")]
    pub collection: String,

    /// Configuration file in YAML format
    #[arg(long, default_value = "config.yaml")]
    pub config_file: Utf8PathBuf,

    /// Deploy indexes only. When both '--indexes-only' and
    /// '--api-keys-only' are set, both flags are unset.
    #[arg(long)]
    pub indexes_only: bool,

    /// Deploy API keys only. When both '--indexes-only' and
    /// '--api-keys-only' are set, both flags are unset.
    #[arg(long)]
    pub api_keys_only: bool,

    /// Skip updates of '.env' files in the extensions folder
    #[arg(long)]
    pub skip_update_extensions: bool,

    /// Skip updates of the 'firebase.json' config file
    #[arg(long)]
    pub skip_update_firebase_config: bool,

    /// Secrets file containing Algolia admin keys. Defaults to
    /// ~/.agp/secrets.
    #[arg(long)]
    pub agp_secrets: Option<Utf8PathBuf>,

    /// Extensions env file directory
    #[arg(long, default_value = "extensions")]
    pub extensions_dir: Utf8PathBuf,

    /// Path to the 'firebase.json' config file
    #[arg(long, default_value = "firebase.json")]
    pub firebase_config: Utf8PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Provisioning verbs accepted on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerbArg {
    /// Compute and log a change plan, then stop
    Preview,
    /// Destroy all resources in each stack
    Rm,
    /// Destroy resources and remove each stack
    RmStack,
    /// Apply changes
    Up,
}

impl From<VerbArg> for Verb {
    fn from(verb: VerbArg) -> Self {
        match verb {
            VerbArg::Preview => Verb::Preview,
            VerbArg::Rm => Verb::Rm,
            VerbArg::RmStack => Verb::RmStack,
            VerbArg::Up => Verb::Up,
        }
    }
}
