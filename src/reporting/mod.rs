//! Progress reporting and operator-facing messages.

pub mod console;
pub mod jsonl;

use std::path::Path;

use thiserror::Error;

/// Where human-readable progress notifications go.
///
/// Publishing is best-effort: implementations swallow their own failures so
/// a cosmetic reporting problem can never cost processing results.
pub trait MessageSink: Send + Sync {
    fn publish_message(&self, message: &str);
}

/// Sink that drops everything; useful for tests and dry wiring.
pub struct NullMessageSink;

impl MessageSink for NullMessageSink {
    fn publish_message(&self, _message: &str) {}
}

/// Forwards published messages into a [`ReportSink`], swallowing failures.
pub struct ReportMessageSink {
    report: std::sync::Arc<dyn ReportSink>,
}

impl ReportMessageSink {
    pub fn new(report: std::sync::Arc<dyn ReportSink>) -> Self {
        Self { report }
    }
}

impl MessageSink for ReportMessageSink {
    fn publish_message(&self, message: &str) {
        if let Err(err) = self.report.record_message(message) {
            tracing::warn!("failed to record message: {err}");
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub artifacts_dispatched: u64,
    pub artifacts_processed: u64,
    pub artifacts_failed: u64,
    pub outputs_published: u64,
}

/// A module-level error surfaced to the operator.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModuleErrorRecord {
    pub module: String,
    pub message: String,
    pub critical: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum ReportBackendKind {
    Jsonl,
    Console,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Durable report output for a run.
pub trait ReportSink: Send + Sync {
    fn record_message(&self, message: &str) -> Result<(), ReportError>;
    fn record_module_error(&self, error: &ModuleErrorRecord) -> Result<(), ReportError>;
    fn record_run_summary(&self, summary: &RunSummary) -> Result<(), ReportError>;
    fn flush(&self) -> Result<(), ReportError>;
}

pub fn build_sink(
    backend: ReportBackendKind,
    run_id: &str,
    tool_version: &str,
    config_hash: &str,
    run_output_dir: &Path,
) -> Result<Box<dyn ReportSink>, ReportError> {
    match backend {
        ReportBackendKind::Jsonl => Ok(Box::new(jsonl::JsonlSink::new(
            run_id,
            tool_version,
            config_hash,
            run_output_dir,
        )?)),
        ReportBackendKind::Console => Ok(Box::new(console::ConsoleSink)),
    }
}
