//! Constants for the download module (timeouts, throttling).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large segments).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default number of throttle time-slices per second.
pub const DEFAULT_SLICES_PER_SECOND: u32 = 1024;

/// Default minimum lag before the throttle suspends (5 ms).
pub const DEFAULT_SLEEP_THRESHOLD: Duration = Duration::from_millis(5);
