//! The artifact-processing module and its framework-facing contract.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::{debug, info};

use crate::aggregate::ResultAggregator;
use crate::backend::{ProcessingBackend, ProcessingConfig};
use crate::config::Config;
use crate::containers::RemoteFsPath;
use crate::dispatch::JobDispatcher;
use crate::filter::PathFilter;
use crate::reporting::MessageSink;
use crate::state::PipelineState;

/// Error surfaced by a module to the framework.
///
/// A critical error aborts the run; a recoverable one marks the current
/// item as failed and lets the rest continue.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ModuleError {
    pub message: String,
    pub critical: bool,
}

impl ModuleError {
    pub fn critical(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            critical: true,
        }
    }

    pub fn recoverable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            critical: false,
        }
    }
}

/// A module whose per-item work the pipeline may run on many pool workers
/// at once.
///
/// The item type and retention policy are ordinary typed methods; the
/// pipeline owns the worker pool and is the sole enforcer of `pool_size`.
pub trait ThreadAwareModule: Send + Sync {
    type Item: Send + Clone;

    /// Maximum number of concurrently running `process` calls.
    fn pool_size(&self) -> usize;

    fn pre_process(&self) -> Result<(), ModuleError>;

    /// Handle one item. Invoked concurrently by distinct pool workers.
    fn process(&self, item: &Self::Item) -> Result<(), ModuleError>;

    fn post_process(&self) -> Result<(), ModuleError>;

    /// Whether processed inputs should be kept in shared state.
    fn retain_processed_input_in_state(&self) -> bool;
}

/// Everything `configure` needs, resolved by the composition root.
#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    pub endpoint: String,
    pub backend_config_file: Option<PathBuf>,
    pub project: String,
    pub recipe: Option<String>,
    pub zone: String,
    pub sketch_id: u64,
    pub output_directory: String,
    pub target_suffix: String,
    pub log_directory: PathBuf,
    pub pool_size: usize,
    pub continue_on_error: bool,
}

impl ProcessorOptions {
    pub fn from_config(cfg: &Config, log_directory: PathBuf) -> Self {
        Self {
            endpoint: cfg.endpoint.clone(),
            backend_config_file: cfg.backend_config_file.clone(),
            project: cfg.project.clone(),
            recipe: cfg.recipe.clone(),
            zone: cfg.zone.clone(),
            sketch_id: cfg.sketch_id,
            output_directory: cfg.output_directory.clone(),
            target_suffix: cfg.target_suffix.clone(),
            log_directory,
            pool_size: cfg.pool_size,
            continue_on_error: cfg.continue_on_error,
        }
    }
}

struct ProcessingContext {
    dispatcher: JobDispatcher,
    aggregator: ResultAggregator,
    output_directory: PathBuf,
    pool_size: usize,
    continue_on_error: bool,
}

/// Relays each collected artifact to the processing backend and republishes
/// the filtered outputs.
pub struct ArtifactProcessor {
    backend: Arc<dyn ProcessingBackend>,
    state: Arc<PipelineState>,
    messages: Arc<dyn MessageSink>,
    ctx: OnceCell<ProcessingContext>,
}

impl ArtifactProcessor {
    pub const NAME: &'static str = "artifact_processor";

    /// Dependencies are explicit; nothing is reached through ambient
    /// globals.
    pub fn new(
        backend: Arc<dyn ProcessingBackend>,
        state: Arc<PipelineState>,
        messages: Arc<dyn MessageSink>,
    ) -> Self {
        Self {
            backend,
            state,
            messages,
            ctx: OnceCell::new(),
        }
    }

    /// One-time setup: resolve the output directory, validate the backend,
    /// and build the dispatch/aggregation machinery.
    ///
    /// A setup failure is critical; a misconfigured backend makes every
    /// subsequent `process` call meaningless.
    pub fn configure(&self, opts: ProcessorOptions) -> Result<(), ModuleError> {
        if self.ctx.get().is_some() {
            return Err(ModuleError::critical("module is already configured"));
        }

        let output_directory = if opts.output_directory.is_empty() {
            let dir = tempfile::Builder::new()
                .prefix("relay-results-")
                .tempdir()
                .map_err(|err| {
                    ModuleError::critical(format!("failed to allocate output directory: {err}"))
                })?
                .keep();
            self.messages.publish_message(&format!(
                "Processing results will be written to {}",
                dir.display()
            ));
            dir
        } else {
            PathBuf::from(&opts.output_directory)
        };

        let processing_config = ProcessingConfig {
            endpoint: opts.endpoint,
            backend_config_file: opts.backend_config_file,
            project: opts.project,
            recipe: opts.recipe,
            zone: opts.zone,
            sketch_id: opts.sketch_id,
        };
        self.backend
            .setup(&processing_config)
            .map_err(|err| ModuleError::critical(err.to_string()))?;

        let filter = PathFilter::new(self.backend.tmp_dir(), &opts.target_suffix);
        let dispatcher = JobDispatcher::new(
            self.backend.clone(),
            processing_config,
            opts.log_directory,
        );
        let aggregator = ResultAggregator::new(filter, self.state.clone(), self.messages.clone());

        let ctx = ProcessingContext {
            dispatcher,
            aggregator,
            output_directory,
            pool_size: opts.pool_size.max(1),
            continue_on_error: opts.continue_on_error,
        };
        self.ctx
            .set(ctx)
            .map_err(|_| ModuleError::critical("module is already configured"))?;
        Ok(())
    }

    /// Where processing results are written; `None` before `configure`.
    pub fn output_directory(&self) -> Option<&Path> {
        self.ctx.get().map(|ctx| ctx.output_directory.as_path())
    }

    fn context(&self) -> Result<&ProcessingContext, ModuleError> {
        self.ctx
            .get()
            .ok_or_else(|| ModuleError::critical("module has not been configured"))
    }
}

impl ThreadAwareModule for ArtifactProcessor {
    type Item = RemoteFsPath;

    fn pool_size(&self) -> usize {
        self.ctx.get().map(|ctx| ctx.pool_size).unwrap_or(1)
    }

    fn pre_process(&self) -> Result<(), ModuleError> {
        Ok(())
    }

    fn process(&self, artifact: &RemoteFsPath) -> Result<(), ModuleError> {
        let ctx = self.context()?;
        let results = match ctx.dispatcher.submit(artifact) {
            Ok(results) => results,
            Err(err) => {
                return Err(if ctx.continue_on_error {
                    ModuleError::recoverable(err.to_string())
                } else {
                    ModuleError::critical(err.to_string())
                });
            }
        };

        info!("files generated by the processing backend:");
        let published = ctx.aggregator.aggregate(&results, &artifact.hostname);
        debug!(
            "published {} artifact(s) for {}",
            published.len(),
            artifact.path
        );
        Ok(())
    }

    fn post_process(&self) -> Result<(), ModuleError> {
        Ok(())
    }

    fn retain_processed_input_in_state(&self) -> bool {
        false
    }
}
