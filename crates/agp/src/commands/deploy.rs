//! The deployment run: load config, select environments, drive the
//! provisioning stages, synchronize downstream config files

use anyhow::{anyhow, Result};
use camino::Utf8PathBuf;
use tracing::warn;

use agp_core::{config, environments, get_home_dir};
use agp_provision::{
    identity, DeployFlags, EngineSettings, Orchestrator, PulumiCli, Verb,
};
use agp_sync::{sync_environment, SyncRequest};

use crate::cli::Cli;
use crate::output;

pub async fn run(cli: Cli) -> Result<()> {
    let verb: Verb = cli.verb.into();

    if cli.collection != "all" {
        warn!(
            "Collection filter '{}' is reserved and currently ignored",
            cli.collection
        );
    }

    // Check prerequisites
    let missing = PulumiCli::check_prerequisites();
    if !missing.is_empty() {
        output::error("Missing prerequisites:");
        for tool in &missing {
            output::kv(tool.name, tool.install_hint);
        }
        return Err(anyhow!("Prerequisites not satisfied"));
    }

    // Identify the deploying operator (labels on mirrored secrets)
    let operator = identity::current_operator().await?;

    // Load config
    let config = config::load_config(&cli.config_file)?;

    let secrets_file = match cli.agp_secrets.clone() {
        Some(path) => path,
        None => default_secrets_path()?,
    };

    let selected =
        environments::select_environments(&cli.environment, &config.global.environments);
    if selected.is_empty() {
        output::warning("No environments configured");
        return Ok(());
    }

    output::header(&format!(
        "Running '{verb}' for {} environment(s) as {}",
        selected.len(),
        operator.username
    ));

    let work_dir = Utf8PathBuf::from_path_buf(std::env::current_dir()?)
        .map_err(|_| anyhow!("Current directory path is not valid UTF-8"))?;

    let engine = PulumiCli::new(EngineSettings::new(work_dir.clone()));
    let driver = Orchestrator::new(
        &engine,
        &config,
        &operator,
        &secrets_file,
        work_dir,
        verb,
    );

    let flags = DeployFlags {
        indexes_only: cli.indexes_only,
        api_keys_only: cli.api_keys_only,
        skip_update_extensions: cli.skip_update_extensions,
        skip_update_firebase_config: cli.skip_update_firebase_config,
    };

    for env_name in &selected {
        output::info(&format!("Environment: {env_name}"));

        let spinner = output::spinner(&format!("Running {verb}..."));
        let outcome = driver.deploy_environment(env_name, &flags).await;
        spinner.finish_and_clear();
        let outcome = outcome?;

        if outcome.halted {
            output::success("Preview complete");
            return Ok(());
        }

        // Unknown environments produced no provisioning and need no sync
        let Some(env_config) = config.environment(env_name) else {
            continue;
        };

        sync_environment(&SyncRequest {
            environment: env_name,
            env_config,
            global: &config.global,
            indexes: &outcome.indexes,
            admin_app_id: &outcome.admin_app_id,
            skip_extension_files: outcome.skip_extension_files,
            skip_manifest: outcome.skip_manifest,
            extensions_dir: &cli.extensions_dir,
            manifest_path: &cli.firebase_config,
        })?;
    }

    output::success("Done");
    Ok(())
}

fn default_secrets_path() -> Result<Utf8PathBuf> {
    Ok(get_home_dir()?.join(".agp").join("secrets"))
}
