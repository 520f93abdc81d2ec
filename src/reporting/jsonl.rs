use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;

use crate::reporting::{ModuleErrorRecord, ReportError, ReportSink, RunSummary};

/// Appends one JSON record per report event to `reporting/messages.jsonl`.
pub struct JsonlSink {
    run_id: String,
    tool_version: String,
    config_hash: String,
    writer: Mutex<BufWriter<File>>,
}

#[derive(Serialize)]
struct Record<'a, T: Serialize> {
    kind: &'static str,
    run_id: &'a str,
    tool_version: &'a str,
    config_hash: &'a str,
    recorded_at: String,
    #[serde(flatten)]
    body: T,
}

#[derive(Serialize)]
struct MessageBody<'a> {
    message: &'a str,
}

impl JsonlSink {
    pub fn new(
        run_id: &str,
        tool_version: &str,
        config_hash: &str,
        run_output_dir: &Path,
    ) -> Result<Self, ReportError> {
        let report_dir = run_output_dir.join("reporting");
        std::fs::create_dir_all(&report_dir)?;
        let file = File::create(report_dir.join("messages.jsonl"))?;
        Ok(Self {
            run_id: run_id.to_string(),
            tool_version: tool_version.to_string(),
            config_hash: config_hash.to_string(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    fn write_record<T: Serialize>(&self, kind: &'static str, body: T) -> Result<(), ReportError> {
        let record = Record {
            kind,
            run_id: &self.run_id,
            tool_version: &self.tool_version,
            config_hash: &self.config_hash,
            recorded_at: chrono::Utc::now().to_rfc3339(),
            body,
        };
        let mut guard = self.writer.lock().unwrap();
        serde_json::to_writer(&mut *guard, &record)?;
        guard.write_all(b"\n")?;
        Ok(())
    }
}

impl ReportSink for JsonlSink {
    fn record_message(&self, message: &str) -> Result<(), ReportError> {
        self.write_record("message", MessageBody { message })
    }

    fn record_module_error(&self, error: &ModuleErrorRecord) -> Result<(), ReportError> {
        self.write_record("module_error", error)
    }

    fn record_run_summary(&self, summary: &RunSummary) -> Result<(), ReportError> {
        self.write_record("run_summary", summary)
    }

    fn flush(&self) -> Result<(), ReportError> {
        let mut guard = self.writer.lock().unwrap();
        guard.flush()?;
        Ok(())
    }
}
