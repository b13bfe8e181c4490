//! Constants for the download module (timeouts, backoff, payload checks).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large media files).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Base delay for both backoff schedules (1 second).
pub const BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Media payloads smaller than this are treated as disguised error pages.
pub const MIN_MEDIA_BYTES: usize = 1000;
