//! Boundary to the external forensic-processing backend.
//!
//! The backend performs the actual analysis; this crate only submits
//! evidence, waits for terminal job state, and reads back task results.

pub mod http;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the evidence blob is, from the backend's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    CompressedDirectory,
}

/// Backend-facing request object built per dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct EvidenceDescriptor {
    pub source_path: String,
    pub kind: EvidenceKind,
}

impl EvidenceDescriptor {
    pub fn compressed_directory(source_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            kind: EvidenceKind::CompressedDirectory,
        }
    }
}

/// One unit of backend work and the paths it saved.
///
/// `saved_paths` is not populated uniformly across backend task types;
/// absent means the task saved nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub name: String,
    #[serde(default)]
    pub saved_paths: Option<Vec<String>>,
}

/// Opaque pass-through settings validated by the backend, not by this core.
#[derive(Debug, Clone)]
pub struct ProcessingConfig {
    pub endpoint: String,
    pub backend_config_file: Option<PathBuf>,
    pub project: String,
    pub recipe: Option<String>,
    pub zone: String,
    pub sketch_id: u64,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend setup failed: {0}")]
    Setup(String),
    #[error("backend job failed: {0}")]
    JobFailed(String),
    #[error("unexpected backend response: {0}")]
    InvalidResponse(String),
}

pub trait ProcessingBackend: Send + Sync {
    /// Validate connectivity and configuration before any dispatch.
    fn setup(&self, cfg: &ProcessingConfig) -> Result<(), BackendError>;

    /// Submit evidence and block until the job reaches a terminal state.
    ///
    /// Returns the backend's task results on success or partial success;
    /// timeout and retry policy belong to the backend, not to callers.
    fn submit_evidence(
        &self,
        descriptor: &EvidenceDescriptor,
        cfg: &ProcessingConfig,
    ) -> Result<Vec<TaskResult>, BackendError>;

    /// Scratch directory prefix backend workers write temporary output under.
    fn tmp_dir(&self) -> String;
}
