use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tracing::{info, warn};

use artifactrelay::backend::ProcessingBackend;
use artifactrelay::backend::http::HttpBackendClient;
use artifactrelay::module::{ArtifactProcessor, ProcessorOptions};
use artifactrelay::registry::{ModuleDeps, ModuleRegistry, artifact_processor_factory};
use artifactrelay::reporting::{MessageSink, ReportMessageSink, ReportSink};
use artifactrelay::state::PipelineState;
use artifactrelay::{cli, config, containers, logging, pipeline, reporting, util};

fn main() -> Result<()> {
    logging::init_logging();

    let cli_opts = cli::parse();
    let loaded = config::load_config(cli_opts.config_path.as_deref())?;
    let mut cfg = loaded.config;
    if let Some(workers) = cli_opts.workers {
        cfg.pool_size = workers;
    }
    if let Some(sketch_id) = cli_opts.sketch_id {
        cfg.sketch_id = sketch_id;
    }
    if cli_opts.continue_on_error {
        cfg.continue_on_error = true;
    }

    let run_output_dir = cli_opts.output.join(&cfg.run_id);
    util::ensure_output_dir(&run_output_dir)?;

    let artifacts = containers::read_manifest(&cli_opts.input)
        .with_context(|| format!("failed to read manifest {}", cli_opts.input.display()))?;
    if artifacts.is_empty() {
        warn!("manifest {} contains no artifacts", cli_opts.input.display());
    }

    info!(
        "starting run_id={} input={} output={} pool_size={}",
        cfg.run_id,
        cli_opts.input.display(),
        run_output_dir.display(),
        cfg.pool_size
    );

    let tool_version = env!("CARGO_PKG_VERSION");
    let report_sink = reporting::build_sink(
        util::backend_from_cli(cli_opts.report_backend),
        &cfg.run_id,
        tool_version,
        &loaded.config_hash,
        &run_output_dir,
    )?;
    let report: Arc<dyn ReportSink> = Arc::from(report_sink);

    let backend: Arc<dyn ProcessingBackend> =
        Arc::new(HttpBackendClient::new(&cfg.backend_tmp_dir)?);
    let state = Arc::new(PipelineState::new());
    let messages: Arc<dyn MessageSink> = Arc::new(ReportMessageSink::new(report.clone()));

    let mut registry = ModuleRegistry::new();
    registry.register(ArtifactProcessor::NAME, artifact_processor_factory)?;
    let module = registry.create(
        ArtifactProcessor::NAME,
        ModuleDeps {
            backend,
            state: state.clone(),
            messages,
            options: ProcessorOptions::from_config(&cfg, run_output_dir.clone()),
        },
    )?;

    let cancel_flag = Arc::new(AtomicBool::new(false));
    {
        let flag = cancel_flag.clone();
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::Relaxed);
        })?;
    }

    let stats = pipeline::run_pipeline_with_cancel(
        module,
        ArtifactProcessor::NAME,
        artifacts,
        state.clone(),
        report,
        &cfg.run_id,
        cancel_flag,
    )?;

    write_published_artifacts(&run_output_dir, &state)?;
    info!(
        "artifactrelay run finished; handing off {} artifact(s) to the next stage",
        stats.outputs_published
    );
    Ok(())
}

/// Persist the shared-state containers as the hand-off to the next stage.
fn write_published_artifacts(run_output_dir: &Path, state: &PipelineState) -> Result<()> {
    let report_dir = run_output_dir.join("reporting");
    std::fs::create_dir_all(&report_dir)?;
    let path = report_dir.join("published_artifacts.jsonl");
    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);
    for container in state.containers() {
        serde_json::to_writer(&mut writer, &container)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    info!("published artifacts written to {}", path.display());
    Ok(())
}
