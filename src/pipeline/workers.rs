//! # Pipeline Workers
//!
//! Worker thread spawning for the processing pipeline.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::Receiver;
use tracing::warn;

use crate::module::{ModuleError, ThreadAwareModule};
use crate::reporting::{ModuleErrorRecord, ReportSink};

/// Spawn the processing worker threads.
///
/// Each worker runs one `process` call to completion before taking the next
/// artifact. A critical module error raises the abort flag so the feeder
/// stops dispatching, but items already in the channel are still drained
/// and completed.
pub fn spawn_process_workers<M>(
    workers: usize,
    module: Arc<M>,
    module_name: String,
    rx: Receiver<M::Item>,
    report: Arc<dyn ReportSink>,
    processed: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
    report_errors: Arc<AtomicU64>,
    abort: Arc<AtomicBool>,
    critical_error: Arc<Mutex<Option<ModuleError>>>,
) -> Vec<thread::JoinHandle<()>>
where
    M: ThreadAwareModule + ?Sized + 'static,
{
    let mut handles = Vec::new();
    let worker_count = workers.max(1);

    for _ in 0..worker_count {
        let module = module.clone();
        let module_name = module_name.clone();
        let rx = rx.clone();
        let report = report.clone();
        let processed = processed.clone();
        let failed = failed.clone();
        let report_errors = report_errors.clone();
        let abort = abort.clone();
        let critical_error = critical_error.clone();

        handles.push(thread::spawn(move || {
            for item in rx {
                match module.process(&item) {
                    Ok(()) => {
                        processed.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(err) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                        let record = ModuleErrorRecord {
                            module: module_name.clone(),
                            message: err.message.clone(),
                            critical: err.critical,
                        };
                        if let Err(report_err) = report.record_module_error(&record) {
                            report_errors.fetch_add(1, Ordering::Relaxed);
                            warn!("failed to record module error: {report_err}");
                        }
                        if err.critical {
                            warn!("critical module error: {}", err.message);
                            abort.store(true, Ordering::Relaxed);
                            let mut guard = critical_error.lock().unwrap();
                            if guard.is_none() {
                                *guard = Some(err);
                            }
                        } else {
                            warn!("module error (continuing): {}", err.message);
                        }
                    }
                }
            }
        }));
    }

    handles
}
