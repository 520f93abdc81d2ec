//! # Pipeline Module
//!
//! Drives a thread-aware module over a collection of input artifacts with a
//! bounded worker pool. The pipeline owns the threads; the module only sees
//! one item per `process` call. The dominant latency is each worker's
//! blocking wait on the remote backend, which is why many jobs are kept in
//! flight at once.

pub mod workers;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use crossbeam_channel::bounded;
use tracing::{info, warn};

use crate::constants::{CHANNEL_CAPACITY_MULTIPLIER, MIN_CHANNEL_CAPACITY};
use crate::module::{ModuleError, ThreadAwareModule};
use crate::reporting::{ReportSink, RunSummary};
use crate::state::PipelineState;

/// Statistics collected during a run.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub artifacts_dispatched: u64,
    pub artifacts_processed: u64,
    pub artifacts_failed: u64,
    pub outputs_published: u64,
    pub report_errors: u64,
}

struct PipelineCounters {
    processed: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
    report_errors: Arc<AtomicU64>,
    abort: Arc<AtomicBool>,
    critical_error: Arc<Mutex<Option<ModuleError>>>,
}

impl PipelineCounters {
    fn new() -> Self {
        Self {
            processed: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
            report_errors: Arc::new(AtomicU64::new(0)),
            abort: Arc::new(AtomicBool::new(false)),
            critical_error: Arc::new(Mutex::new(None)),
        }
    }
}

/// Run the module over all artifacts and return the collected statistics.
pub fn run_pipeline<M>(
    module: Arc<M>,
    module_name: &str,
    artifacts: Vec<M::Item>,
    state: Arc<PipelineState>,
    report: Arc<dyn ReportSink>,
    run_id: &str,
) -> Result<PipelineStats>
where
    M: ThreadAwareModule + ?Sized + 'static,
{
    run_pipeline_inner(module, module_name, artifacts, state, report, run_id, None)
}

/// Run the pipeline with an external cancellation flag (e.g., Ctrl+C).
///
/// Cancellation stops feeding new artifacts; a worker blocked on the
/// backend is never interrupted from here.
pub fn run_pipeline_with_cancel<M>(
    module: Arc<M>,
    module_name: &str,
    artifacts: Vec<M::Item>,
    state: Arc<PipelineState>,
    report: Arc<dyn ReportSink>,
    run_id: &str,
    cancel_flag: Arc<AtomicBool>,
) -> Result<PipelineStats>
where
    M: ThreadAwareModule + ?Sized + 'static,
{
    run_pipeline_inner(
        module,
        module_name,
        artifacts,
        state,
        report,
        run_id,
        Some(cancel_flag),
    )
}

fn run_pipeline_inner<M>(
    module: Arc<M>,
    module_name: &str,
    artifacts: Vec<M::Item>,
    state: Arc<PipelineState>,
    report: Arc<dyn ReportSink>,
    run_id: &str,
    cancel_flag: Option<Arc<AtomicBool>>,
) -> Result<PipelineStats>
where
    M: ThreadAwareModule + ?Sized + 'static,
{
    let worker_count = module.pool_size().max(1);
    let channel_cap = worker_count
        .saturating_mul(CHANNEL_CAPACITY_MULTIPLIER)
        .max(MIN_CHANNEL_CAPACITY);
    let (item_tx, item_rx) = bounded::<M::Item>(channel_cap);

    let total = artifacts.len() as u64;
    info!(
        "dispatching {} artifact(s) across {} worker(s)",
        total, worker_count
    );

    module.pre_process().map_err(anyhow::Error::new)?;

    let counters = PipelineCounters::new();
    let handles = workers::spawn_process_workers(
        worker_count,
        module.clone(),
        module_name.to_string(),
        item_rx,
        report.clone(),
        counters.processed.clone(),
        counters.failed.clone(),
        counters.report_errors.clone(),
        counters.abort.clone(),
        counters.critical_error.clone(),
    );

    let mut dispatched = 0u64;
    let mut cancelled = false;
    for artifact in artifacts {
        if counters.abort.load(Ordering::Relaxed) {
            break;
        }
        if let Some(flag) = &cancel_flag {
            if flag.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }
        }
        item_tx
            .send(artifact)
            .map_err(|_| anyhow::anyhow!("artifact channel closed while dispatching"))?;
        dispatched += 1;
    }

    drop(item_tx);
    for handle in handles {
        let _ = handle.join();
    }

    module.post_process().map_err(anyhow::Error::new)?;

    if cancelled {
        info!("shutdown requested; stopping early");
    }
    if dispatched < total && counters.abort.load(Ordering::Relaxed) {
        info!(
            "critical module error; {} artifact(s) were not dispatched",
            total - dispatched
        );
    }

    let summary = RunSummary {
        run_id: run_id.to_string(),
        artifacts_dispatched: dispatched,
        artifacts_processed: counters.processed.load(Ordering::Relaxed),
        artifacts_failed: counters.failed.load(Ordering::Relaxed),
        outputs_published: state.len() as u64,
    };
    if let Err(err) = report.record_run_summary(&summary) {
        counters.report_errors.fetch_add(1, Ordering::Relaxed);
        warn!("failed to record run summary: {err}");
    }
    if let Err(err) = report.flush() {
        counters.report_errors.fetch_add(1, Ordering::Relaxed);
        warn!("report flush error: {err}");
    }

    info!(
        "run_summary artifacts_dispatched={} artifacts_processed={} artifacts_failed={} outputs_published={}",
        summary.artifacts_dispatched,
        summary.artifacts_processed,
        summary.artifacts_failed,
        summary.outputs_published
    );

    if let Some(err) = counters.critical_error.lock().unwrap().take() {
        return Err(anyhow::Error::new(err));
    }

    Ok(PipelineStats {
        artifacts_dispatched: summary.artifacts_dispatched,
        artifacts_processed: summary.artifacts_processed,
        artifacts_failed: summary.artifacts_failed,
        outputs_published: summary.outputs_published,
        report_errors: counters.report_errors.load(Ordering::Relaxed),
    })
}
