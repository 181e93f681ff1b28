//! Per-environment provisioning driver
//!
//! Runs up to three stages per environment (indexes, API keys, secret
//! mirroring), each individually fault-tolerant: a stage failure is logged
//! and downgrades the matching file-sync flag to skip, then the run moves
//! on. Only config-class errors (an unreadable secrets file) abort a run.

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, error, info, warn};

use agp_core::config::{load_admin_credentials, AdminCredentials, ApiKeySpec, ConfigFile};

use crate::engine::{ConfigValue, PreviewReport, ProvisioningEngine, StageOutcome, Verb};
use crate::gate::should_skip_file_update;
use crate::identity::Operator;
use crate::program::{ProgramDescriptor, StackProgram};

/// Stage-selection and sync-suppression flags from the CLI
#[derive(Debug, Clone, Copy, Default)]
pub struct DeployFlags {
    pub indexes_only: bool,
    pub api_keys_only: bool,
    pub skip_update_extensions: bool,
    pub skip_update_firebase_config: bool,
}

impl DeployFlags {
    /// Which stages run: an `-only` flag narrows to its stage, but both
    /// flags together cancel out and everything deploys
    pub fn stages(&self) -> (bool, bool) {
        if self.indexes_only ^ self.api_keys_only {
            (self.indexes_only, self.api_keys_only)
        } else {
            (true, true)
        }
    }
}

/// What one environment produced for the file synchronizer
#[derive(Debug)]
pub struct EnvOutcome {
    pub environment: String,

    /// A preview verb halts the whole run; no sync, no later environments
    pub halted: bool,

    /// Effective index list, empty when the index stage did not run
    pub indexes: Vec<String>,

    /// Admin app id for extension files (empty when credentials were absent)
    pub admin_app_id: String,

    pub skip_extension_files: bool,
    pub skip_manifest: bool,
}

impl EnvOutcome {
    fn halted(environment: &str) -> Self {
        Self {
            environment: environment.to_string(),
            halted: true,
            indexes: Vec::new(),
            admin_app_id: String::new(),
            skip_extension_files: true,
            skip_manifest: true,
        }
    }
}

/// Result of the API-key stage including its secret-mirroring sub-stage
enum ApiKeyStage {
    Previewed(PreviewReport),
    Completed(StageOutcome),
}

/// Sequences the provisioning stages of one run
pub struct Orchestrator<'a> {
    engine: &'a dyn ProvisioningEngine,
    config: &'a ConfigFile,
    operator: &'a Operator,
    secrets_file: &'a Utf8Path,
    work_dir: Utf8PathBuf,
    verb: Verb,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        engine: &'a dyn ProvisioningEngine,
        config: &'a ConfigFile,
        operator: &'a Operator,
        secrets_file: &'a Utf8Path,
        work_dir: Utf8PathBuf,
        verb: Verb,
    ) -> Self {
        Self {
            engine,
            config,
            operator,
            secrets_file,
            work_dir,
            verb,
        }
    }

    /// Run the provisioning stages for one environment
    ///
    /// Never returns an error for stage failures; those downgrade the sync
    /// flags. The only fatal path is an unreadable/malformed secrets file.
    pub async fn deploy_environment(
        &self,
        env_name: &str,
        flags: &DeployFlags,
    ) -> Result<EnvOutcome> {
        let Some(env) = self.config.environment(env_name) else {
            error!("Environment {env_name} not present in configuration, skipping");
            return Ok(EnvOutcome {
                environment: env_name.to_string(),
                halted: false,
                indexes: Vec::new(),
                admin_app_id: String::new(),
                skip_extension_files: true,
                skip_manifest: true,
            });
        };

        let env_key = format!("{}-{}", env.namespace, env_name);
        let credentials = load_admin_credentials(self.secrets_file, &env_key)?;

        let project = format!("{}--{}-{}", env.prefix, env.namespace, env_name);

        let (mut deploy_indexes, mut deploy_api_keys) = flags.stages();
        let mut skip_extension_files = flags.skip_update_extensions;
        let mut skip_manifest = flags.skip_update_firebase_config;

        if !credentials.is_complete() {
            warn!("Environment {env_name}: admin credentials incomplete, skipping provisioning");
            deploy_indexes = false;
            deploy_api_keys = false;
            skip_extension_files = true;
            skip_manifest = true;
        }

        let mut indexes: Vec<String> = Vec::new();

        if deploy_indexes {
            indexes = self.config.indexes_for(env);
            let stack = format!("{project}-indexes");
            info!("Deploying {} indexes to stack {stack}", indexes.len());

            match self.index_stage(&project, &stack, &indexes, &credentials).await {
                Ok(StageOutcome::Previewed(report)) => {
                    info!("Preview:\n{report}");
                    return Ok(EnvOutcome::halted(env_name));
                }
                Ok(outcome) => {
                    // An explicit CLI skip wins over the outcome gate
                    skip_extension_files = flags.skip_update_extensions
                        || should_skip_file_update(&outcome, self.verb);
                }
                Err(e) => {
                    error!("Index stage failed for {env_name}: {e:#}");
                    skip_extension_files = true;
                }
            }
        }

        if deploy_api_keys {
            let api_keys = self.config.api_keys_for(env);
            info!(
                "Deploying {} API keys to stack {project}-api-keys",
                api_keys.len()
            );

            match self.api_key_stage(&project, &api_keys, &credentials).await {
                Ok(ApiKeyStage::Previewed(report)) => {
                    info!("Preview:\n{report}");
                    return Ok(EnvOutcome::halted(env_name));
                }
                Ok(ApiKeyStage::Completed(outcome)) => {
                    skip_manifest = flags.skip_update_firebase_config
                        || should_skip_file_update(&outcome, self.verb);
                }
                Err(e) => {
                    error!("API-key stage failed for {env_name}: {e:#}");
                    skip_manifest = true;
                }
            }
        }

        Ok(EnvOutcome {
            environment: env_name.to_string(),
            halted: false,
            indexes,
            admin_app_id: credentials.app_id,
            skip_extension_files,
            skip_manifest,
        })
    }

    async fn index_stage(
        &self,
        project: &str,
        stack: &str,
        indexes: &[String],
        credentials: &AdminCredentials,
    ) -> Result<StageOutcome> {
        let program = StackProgram::indexes(project, indexes);
        let _descriptor = ProgramDescriptor::write(&self.work_dir, &program)?;

        self.engine.create_or_select_stack(stack).await?;
        self.engine
            .set_config(stack, "algolia:apiKey", ConfigValue::secret(&credentials.api_key))
            .await?;
        self.engine
            .set_config(
                stack,
                "algolia:applicationId",
                ConfigValue::plain(&credentials.app_id),
            )
            .await?;

        self.execute_verb(stack).await
    }

    async fn api_key_stage(
        &self,
        project: &str,
        api_keys: &[ApiKeySpec],
        credentials: &AdminCredentials,
    ) -> Result<ApiKeyStage> {
        let keys_stack = format!("{project}-api-keys");

        let outcome = {
            let program = StackProgram::api_keys(project, api_keys);
            let _descriptor = ProgramDescriptor::write(&self.work_dir, &program)?;

            self.engine.create_or_select_stack(&keys_stack).await?;
            self.engine
                .set_config(
                    &keys_stack,
                    "algolia:apiKey",
                    ConfigValue::secret(&credentials.api_key),
                )
                .await?;
            self.engine
                .set_config(
                    &keys_stack,
                    "algolia:applicationId",
                    ConfigValue::plain(&credentials.app_id),
                )
                .await?;

            self.execute_verb(&keys_stack).await?
        };

        match outcome {
            StageOutcome::Previewed(report) => Ok(ApiKeyStage::Previewed(report)),
            outcome => {
                self.mirror_secrets(project, credentials).await?;
                Ok(ApiKeyStage::Completed(outcome))
            }
        }
    }

    /// Mirror the API-key stack's exported key values into the secret store
    async fn mirror_secrets(
        &self,
        project: &str,
        credentials: &AdminCredentials,
    ) -> Result<()> {
        let keys_stack = format!("{project}-api-keys");
        let secrets_stack = format!("{project}-secrets");

        let outputs = self.engine.stack_outputs(&keys_stack).await?;
        debug!("Mirroring {} exported key values from {keys_stack}", outputs.len());

        let program = StackProgram::secrets(
            project,
            &self.operator.username,
            &outputs,
            &self.config.global.secret_name_prefix,
        );
        let _descriptor = ProgramDescriptor::write(&self.work_dir, &program)?;

        self.engine.create_or_select_stack(&secrets_stack).await?;
        self.engine
            .set_config(
                &secrets_stack,
                "gcp:project",
                ConfigValue::plain(&credentials.gcp_project),
            )
            .await?;

        self.execute_verb(&secrets_stack).await?;
        Ok(())
    }

    async fn execute_verb(&self, stack: &str) -> Result<StageOutcome> {
        match self.verb {
            Verb::Preview => {
                let report = self.engine.preview(stack).await?;
                Ok(StageOutcome::Previewed(report))
            }
            Verb::Rm => {
                info!("Removing resources of stack: {stack}");
                self.engine.destroy(stack).await?;
                Ok(StageOutcome::Destroyed)
            }
            Verb::RmStack => {
                info!("Removing resources of stack: {stack}");
                self.engine.destroy(stack).await?;
                info!("Removing stack: {stack}");
                self.engine.remove_stack(stack).await?;
                Ok(StageOutcome::StackRemoved)
            }
            Verb::Up => {
                info!("Updating stack: {stack}");
                debug!("apply begin: {stack}");
                let summary = self.engine.up(stack).await?;
                debug!("apply end: {stack}");
                info!("Stack {stack}: {summary}");
                Ok(StageOutcome::Applied(summary))
            }
        }
    }
}
