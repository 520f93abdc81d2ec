use crate::reporting::{ModuleErrorRecord, ReportError, ReportSink, RunSummary};

/// Prints report events straight to the terminal.
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    fn record_message(&self, message: &str) -> Result<(), ReportError> {
        println!("{message}");
        Ok(())
    }

    fn record_module_error(&self, error: &ModuleErrorRecord) -> Result<(), ReportError> {
        let severity = if error.critical { "CRITICAL" } else { "ERROR" };
        eprintln!("[{severity}] {}: {}", error.module, error.message);
        Ok(())
    }

    fn record_run_summary(&self, summary: &RunSummary) -> Result<(), ReportError> {
        println!(
            "run {} finished: {} dispatched, {} processed, {} failed, {} outputs",
            summary.run_id,
            summary.artifacts_dispatched,
            summary.artifacts_processed,
            summary.artifacts_failed,
            summary.outputs_published
        );
        Ok(())
    }

    fn flush(&self) -> Result<(), ReportError> {
        Ok(())
    }
}
