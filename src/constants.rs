//! Shared constants for channel sizing and backend defaults.

use std::time::Duration;

/// Artifact channel capacity per worker.
pub const CHANNEL_CAPACITY_MULTIPLIER: usize = 4;

/// Lower bound on channel capacity regardless of worker count.
pub const MIN_CHANNEL_CAPACITY: usize = 16;

/// How often the backend client polls a submitted request for completion.
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Output suffix this stage republishes by default.
pub const DEFAULT_TARGET_SUFFIX: &str = ".plaso";

/// Scratch directory backend workers write temporary output under.
pub const DEFAULT_BACKEND_TMP_DIR: &str = "/tmp/backend-worker";

/// Suffix of the per-artifact dispatch log files.
pub const DISPATCH_LOG_SUFFIX: &str = "-backend.log";
