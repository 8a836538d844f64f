//! Acquisition options and their validation.
//!
//! [`AcquireOptions`] is the single value every loader receives; the CLI
//! builds it from parsed arguments and a redirect hands the very same value
//! to the next loader.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::download::ThrottleConfig;
use crate::download::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use crate::resolver::QualityRequest;

/// Default segment size for byte-range transfers, in KiB.
pub const DEFAULT_CHUNK_SIZE_KIB: u32 = 1024;

/// Smallest accepted segment size, in KiB.
pub const MINIMUM_CHUNK_SIZE_KIB: u32 = 128;

/// Default requested quality.
pub const DEFAULT_QUALITY: u32 = 720;

/// Lowest quality a caller may request.
pub const MINIMUM_QUALITY: u32 = 144;

/// Default timeout for each page discovery phase, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Shortest accepted discovery timeout, in seconds.
pub const MINIMUM_TIMEOUT_SECS: u64 = 1;

/// Default bound on loader-to-loader redirects.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Invalid configuration value.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("invalid value for `{field}`: {reason}")]
pub struct ConfigError {
    /// The option that failed validation.
    pub field: &'static str,
    /// Why the value was rejected.
    pub reason: String,
}

impl ConfigError {
    /// Creates a validation error for `field`.
    #[must_use]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Options shared by every loader taking part in one acquisition.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquireOptions {
    /// Output file, or a directory when the path has no extension.
    pub output_path: PathBuf,
    /// Byte-range segment size in KiB; also caps throttled pieces.
    pub chunk_size_kib: u32,
    /// Optional speed limit in mebibits per second.
    pub speed_limit_mibps: Option<f64>,
    /// Requested quality.
    pub quality: QualityRequest,
    /// Fail instead of downgrading when the requested quality is absent.
    pub exact: bool,
    /// Replace an existing output file.
    pub overwrite: bool,
    /// Upper bound for each page discovery phase.
    pub timeout: Duration,
    /// Upper bound on loader redirects.
    pub max_redirects: usize,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// HTTP read timeout in seconds.
    pub read_timeout_secs: u64,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("output"),
            chunk_size_kib: DEFAULT_CHUNK_SIZE_KIB,
            speed_limit_mibps: None,
            quality: QualityRequest::AtMost(DEFAULT_QUALITY),
            exact: false,
            overwrite: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
        }
    }
}

impl AcquireOptions {
    /// Checks every option against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size_kib < MINIMUM_CHUNK_SIZE_KIB {
            return Err(ConfigError::invalid(
                "chunk_size",
                format!(
                    "{} KiB is too small, must be at least {MINIMUM_CHUNK_SIZE_KIB} KiB",
                    self.chunk_size_kib
                ),
            ));
        }

        if let Some(limit) = self.speed_limit_mibps
            && !(limit.is_finite() && limit > 0.0)
        {
            return Err(ConfigError::invalid(
                "speed_limit",
                format!("{limit} Mib/s is not a positive speed"),
            ));
        }

        if let QualityRequest::AtMost(quality) = self.quality
            && quality < MINIMUM_QUALITY
        {
            return Err(ConfigError::invalid(
                "quality",
                format!("{quality}p is too small, must be at least {MINIMUM_QUALITY}p"),
            ));
        }

        if self.timeout < Duration::from_secs(MINIMUM_TIMEOUT_SECS) {
            return Err(ConfigError::invalid(
                "timeout",
                format!("must be at least {MINIMUM_TIMEOUT_SECS} second(s)"),
            ));
        }

        if self.connect_timeout_secs == 0 || self.read_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "http_timeout",
                "connect and read timeouts must be positive",
            ));
        }

        Ok(())
    }

    /// Segment size in bytes.
    #[must_use]
    pub fn chunk_size_bytes(&self) -> u64 {
        u64::from(self.chunk_size_kib) * 1024
    }

    /// Speed limit converted to bytes per second.
    #[must_use]
    pub fn speed_limit_bytes_per_second(&self) -> Option<f64> {
        self.speed_limit_mibps
            .map(|mibps| mibps * 1024.0 * 1024.0 / 8.0)
    }

    /// Throttle configuration for segment transfers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the speed limit or chunk size is invalid.
    pub fn throttle_config(&self) -> Result<ThrottleConfig, ConfigError> {
        let config = ThrottleConfig::from_rate(self.speed_limit_bytes_per_second())?;
        let chunk = usize::try_from(self.chunk_size_bytes())
            .map_err(|_| ConfigError::invalid("chunk_size", "does not fit in memory"))?;
        config.with_chunk_limit(chunk)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        assert!(AcquireOptions::default().validate().is_ok());
    }

    #[test]
    fn test_chunk_size_below_minimum_rejected() {
        let options = AcquireOptions {
            chunk_size_kib: 64,
            ..AcquireOptions::default()
        };
        let error = options.validate().unwrap_err();
        assert_eq!(error.field, "chunk_size");
    }

    #[test]
    fn test_non_positive_speed_limit_rejected() {
        for limit in [0.0, -1.0, f64::NAN] {
            let options = AcquireOptions {
                speed_limit_mibps: Some(limit),
                ..AcquireOptions::default()
            };
            assert_eq!(options.validate().unwrap_err().field, "speed_limit");
        }
    }

    #[test]
    fn test_quality_below_minimum_rejected_but_sentinels_accepted() {
        let low = AcquireOptions {
            quality: QualityRequest::AtMost(100),
            ..AcquireOptions::default()
        };
        assert_eq!(low.validate().unwrap_err().field, "quality");

        for quality in [QualityRequest::Min, QualityRequest::Max] {
            let options = AcquireOptions {
                quality,
                ..AcquireOptions::default()
            };
            assert!(options.validate().is_ok());
        }
    }

    #[test]
    fn test_short_timeout_rejected() {
        let options = AcquireOptions {
            timeout: Duration::from_millis(500),
            ..AcquireOptions::default()
        };
        assert_eq!(options.validate().unwrap_err().field, "timeout");
    }

    #[test]
    fn test_speed_limit_converted_from_mebibits() {
        let options = AcquireOptions {
            speed_limit_mibps: Some(8.0),
            ..AcquireOptions::default()
        };
        assert_eq!(options.speed_limit_bytes_per_second(), Some(1024.0 * 1024.0));
    }

    #[test]
    fn test_throttle_config_unlimited_without_speed_limit() {
        let config = AcquireOptions::default().throttle_config().unwrap();
        assert!(config.is_unlimited());
    }

    #[test]
    fn test_chunk_size_bytes() {
        assert_eq!(AcquireOptions::default().chunk_size_bytes(), 1024 * 1024);
    }
}
