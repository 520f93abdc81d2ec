//! # Utility Module
//!
//! Small helpers shared by the binary: output directory validation and
//! CLI-to-internal enum mapping.

use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Result, anyhow};
use tracing::warn;

use crate::reporting::ReportBackendKind;

/// Convert CLI report backend to internal enum
pub fn backend_from_cli(backend: crate::cli::ReportBackend) -> ReportBackendKind {
    match backend {
        crate::cli::ReportBackend::Jsonl => ReportBackendKind::Jsonl,
        crate::cli::ReportBackend::Console => ReportBackendKind::Console,
    }
}

/// Ensure output directory exists and is writable, warning on unsafe permissions.
pub fn ensure_output_dir(path: &Path) -> Result<()> {
    if path.exists() {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_dir() {
            return Err(anyhow!(
                "output path is not a directory: {}",
                path.display()
            ));
        }
    } else {
        std::fs::create_dir_all(path)?;
    }
    let metadata = std::fs::metadata(path)?;

    let probe_path = path.join(".artifactrelay_write_probe");
    match OpenOptions::new()
        .write(true)
        .create(true)
        .open(&probe_path)
    {
        Ok(_) => {
            let _ = std::fs::remove_file(&probe_path);
        }
        Err(err) => {
            return Err(anyhow!(
                "output directory is not writable: {} ({})",
                path.display(),
                err
            ));
        }
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = metadata.permissions().mode();
        if mode & 0o002 != 0 {
            warn!("output directory is world-writable: {}", path.display());
        }
    }
    #[cfg(not(unix))]
    let _ = metadata;

    Ok(())
}
