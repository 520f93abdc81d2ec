//! Blocking HTTP client for the processing backend API.

use std::thread;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::constants::STATUS_POLL_INTERVAL;

use super::{BackendError, EvidenceDescriptor, ProcessingBackend, ProcessingConfig, TaskResult};

pub struct HttpBackendClient {
    client: reqwest::blocking::Client,
    poll_interval: Duration,
    tmp_dir: String,
}

#[derive(Deserialize)]
struct SubmitResponse {
    request_id: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    tasks: Vec<TaskResult>,
}

impl HttpBackendClient {
    pub fn new(tmp_dir: impl Into<String>) -> Result<Self, BackendError> {
        let client = reqwest::blocking::Client::builder().build()?;
        Ok(Self {
            client,
            poll_interval: STATUS_POLL_INTERVAL,
            tmp_dir: tmp_dir.into(),
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl ProcessingBackend for HttpBackendClient {
    fn setup(&self, cfg: &ProcessingConfig) -> Result<(), BackendError> {
        if let Some(path) = &cfg.backend_config_file {
            if !path.exists() {
                return Err(BackendError::Setup(format!(
                    "backend config file not found: {}",
                    path.display()
                )));
            }
        }

        let base = cfg.endpoint.trim_end_matches('/');
        let response = self.client.get(format!("{base}/version")).send()?;
        if !response.status().is_success() {
            return Err(BackendError::Setup(format!(
                "backend at {} returned {}",
                cfg.endpoint,
                response.status()
            )));
        }

        if let Some(recipe) = &cfg.recipe {
            let response = self.client.get(format!("{base}/recipe/{recipe}")).send()?;
            if !response.status().is_success() {
                return Err(BackendError::Setup(format!(
                    "recipe {recipe} not known to backend: {}",
                    response.status()
                )));
            }
        }

        info!(
            "backend setup validated for project={} zone={}",
            cfg.project, cfg.zone
        );
        Ok(())
    }

    fn submit_evidence(
        &self,
        descriptor: &EvidenceDescriptor,
        cfg: &ProcessingConfig,
    ) -> Result<Vec<TaskResult>, BackendError> {
        let base = cfg.endpoint.trim_end_matches('/').to_string();
        let body = serde_json::json!({
            "evidence": descriptor,
            "project": cfg.project,
            "recipe": cfg.recipe,
            "zone": cfg.zone,
            "sketch_id": cfg.sketch_id,
        });
        let submit: SubmitResponse = self
            .client
            .post(format!("{base}/request"))
            .json(&body)
            .send()?
            .error_for_status()?
            .json()?;
        debug!(
            "submitted evidence {} as request {}",
            descriptor.source_path, submit.request_id
        );

        loop {
            let status: StatusResponse = self
                .client
                .get(format!("{base}/request/{}/status", submit.request_id))
                .send()?
                .error_for_status()?
                .json()?;
            match status.status.as_str() {
                "pending" | "running" => thread::sleep(self.poll_interval),
                "successful" => return Ok(status.tasks),
                "completed_with_errors" => {
                    warn!("request {} completed with task errors", submit.request_id);
                    return Ok(status.tasks);
                }
                "failed" => {
                    return Err(BackendError::JobFailed(status.message.unwrap_or_else(
                        || format!("request {} failed", submit.request_id),
                    )));
                }
                other => {
                    return Err(BackendError::InvalidResponse(format!(
                        "unknown request status: {other}"
                    )));
                }
            }
        }
    }

    fn tmp_dir(&self) -> String {
        self.tmp_dir.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::StatusResponse;
    use crate::backend::{EvidenceDescriptor, EvidenceKind};

    #[test]
    fn descriptor_serializes_kind_as_snake_case() {
        let descriptor = EvidenceDescriptor::compressed_directory("/eat/data");
        let value = serde_json::to_value(&descriptor).expect("serialize");
        assert_eq!(value["kind"], "compressed_directory");
        assert_eq!(value["source_path"], "/eat/data");
        assert_eq!(descriptor.kind, EvidenceKind::CompressedDirectory);
    }

    #[test]
    fn status_response_tolerates_absent_saved_paths() {
        let raw = r#"{"status": "successful", "tasks": [{"name": "t1"}]}"#;
        let status: StatusResponse = serde_json::from_str(raw).expect("parse");
        assert_eq!(status.status, "successful");
        assert_eq!(status.tasks.len(), 1);
        assert!(status.tasks[0].saved_paths.is_none());
    }

    #[test]
    fn status_response_carries_failure_message() {
        let raw = r#"{"status": "failed", "message": "worker lost"}"#;
        let status: StatusResponse = serde_json::from_str(raw).expect("parse");
        assert_eq!(status.message.as_deref(), Some("worker lost"));
        assert!(status.tasks.is_empty());
    }
}
