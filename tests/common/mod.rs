//! Shared test infrastructure for pipeline tests.
//!
//! Provides a mock processing backend with canned per-path results plus a
//! recording report sink. Each integration test file imports this module.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use artifactrelay::backend::{
    BackendError, EvidenceDescriptor, ProcessingBackend, ProcessingConfig, TaskResult,
};
use artifactrelay::module::{ArtifactProcessor, ProcessorOptions};
use artifactrelay::reporting::{
    MessageSink, ModuleErrorRecord, ReportError, ReportMessageSink, ReportSink, RunSummary,
};
use artifactrelay::state::PipelineState;

pub const MOCK_TMP_DIR: &str = "/tmp/backend-worker";

/// In-process stand-in for the remote backend.
///
/// Tracks how many submissions run at once so tests can assert the pool
/// bound is actually enforced.
pub struct MockBackend {
    results: HashMap<String, Vec<TaskResult>>,
    fail_paths: HashSet<String>,
    delay: Option<Duration>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            results: HashMap::new(),
            fail_paths: HashSet::new(),
            delay: None,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn with_result(mut self, source_path: &str, results: Vec<TaskResult>) -> Self {
        self.results.insert(source_path.to_string(), results);
        self
    }

    pub fn with_failure(mut self, source_path: &str) -> Self {
        self.fail_paths.insert(source_path.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl ProcessingBackend for MockBackend {
    fn setup(&self, _cfg: &ProcessingConfig) -> Result<(), BackendError> {
        Ok(())
    }

    fn submit_evidence(
        &self,
        descriptor: &EvidenceDescriptor,
        _cfg: &ProcessingConfig,
    ) -> Result<Vec<TaskResult>, BackendError> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let outcome = if self.fail_paths.contains(&descriptor.source_path) {
            Err(BackendError::JobFailed(format!(
                "backend exploded on {}",
                descriptor.source_path
            )))
        } else {
            Ok(self
                .results
                .get(&descriptor.source_path)
                .cloned()
                .unwrap_or_default())
        };
        self.active.fetch_sub(1, Ordering::SeqCst);
        outcome
    }

    fn tmp_dir(&self) -> String {
        MOCK_TMP_DIR.to_string()
    }
}

/// Report sink that keeps everything in memory for assertions.
#[derive(Default)]
pub struct RecordingSink {
    pub messages: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<ModuleErrorRecord>>,
    pub summaries: Mutex<Vec<RunSummary>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl ReportSink for RecordingSink {
    fn record_message(&self, message: &str) -> Result<(), ReportError> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }

    fn record_module_error(&self, error: &ModuleErrorRecord) -> Result<(), ReportError> {
        self.errors.lock().unwrap().push(error.clone());
        Ok(())
    }

    fn record_run_summary(&self, summary: &RunSummary) -> Result<(), ReportError> {
        self.summaries.lock().unwrap().push(summary.clone());
        Ok(())
    }

    fn flush(&self) -> Result<(), ReportError> {
        Ok(())
    }
}

pub fn task(name: &str, paths: &[&str]) -> TaskResult {
    TaskResult {
        name: name.to_string(),
        saved_paths: Some(paths.iter().map(|p| p.to_string()).collect()),
    }
}

pub fn processor_options(
    log_dir: &std::path::Path,
    pool_size: usize,
    continue_on_error: bool,
) -> ProcessorOptions {
    ProcessorOptions {
        endpoint: "http://localhost:8000/api".to_string(),
        backend_config_file: None,
        project: "test-project".to_string(),
        recipe: None,
        zone: "zone-a".to_string(),
        sketch_id: 0,
        output_directory: log_dir.join("results").display().to_string(),
        target_suffix: ".plaso".to_string(),
        log_directory: log_dir.to_path_buf(),
        pool_size,
        continue_on_error,
    }
}

/// Build and configure a module wired to the given backend and report sink.
pub fn configured_module(
    backend: Arc<dyn ProcessingBackend>,
    state: Arc<PipelineState>,
    report: Arc<dyn ReportSink>,
    options: ProcessorOptions,
) -> Arc<ArtifactProcessor> {
    let messages: Arc<dyn MessageSink> = Arc::new(ReportMessageSink::new(report));
    let module = ArtifactProcessor::new(backend, state, messages);
    module.configure(options).expect("configure module");
    Arc::new(module)
}
