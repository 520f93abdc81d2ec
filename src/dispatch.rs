//! Per-artifact job dispatch to the processing backend.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::backend::{
    BackendError, EvidenceDescriptor, ProcessingBackend, ProcessingConfig, TaskResult,
};
use crate::constants::DISPATCH_LOG_SUFFIX;
use crate::containers::RemoteFsPath;

/// Submits one backend job per input artifact and waits for its terminal
/// state on the calling worker thread.
pub struct JobDispatcher {
    backend: Arc<dyn ProcessingBackend>,
    config: ProcessingConfig,
    log_dir: PathBuf,
}

impl JobDispatcher {
    pub fn new(
        backend: Arc<dyn ProcessingBackend>,
        config: ProcessingConfig,
        log_dir: PathBuf,
    ) -> Self {
        Self {
            backend,
            config,
            log_dir,
        }
    }

    /// Dispatch the artifact and block until the backend reports a terminal
    /// state. No local timeout; no retry. Backend faults come back verbatim.
    pub fn submit(&self, artifact: &RemoteFsPath) -> Result<Vec<TaskResult>, BackendError> {
        self.write_dispatch_record(artifact);
        info!(
            "processing remote FS path {} from previous collector",
            artifact.path
        );
        let descriptor = EvidenceDescriptor::compressed_directory(&artifact.path);
        self.backend.submit_evidence(&descriptor, &self.config)
    }

    /// Record which artifact went to the backend, for operator traceability.
    /// A failure here must never abort the job.
    fn write_dispatch_record(&self, artifact: &RemoteFsPath) {
        let normalized = artifact.path.replace('/', "_");
        let log_path = self.log_dir.join(format!(
            "{}_{}{}",
            artifact.hostname, normalized, DISPATCH_LOG_SUFFIX
        ));
        info!("backend log file: {}", log_path.display());
        let record = format!("{} {}\n", artifact.hostname, normalized);
        if let Err(err) = append_record(&log_path, &record) {
            warn!(
                "failed to write dispatch record {}: {err}",
                log_path.display()
            );
        }
    }
}

fn append_record(path: &Path, record: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(record.as_bytes())
}
