//! Amortized bandwidth shaping for segment transfers.
//!
//! [`ThrottledTransport`] wraps a byte stream and re-chunks it into pieces of
//! at most `floor(R / K)` bytes, where `R` is the configured rate in bytes per
//! second and `K` the number of time-slices per second. After every piece the
//! wall-clock time spent is compared against the nominal slice duration
//! `1 / K`; the difference accumulates in a lag counter. Once the transfer is
//! ahead of schedule by more than the sleep threshold, the stream suspends for
//! exactly the accumulated lead and resets the counter.
//!
//! Only the average rate is bounded. Short bursts are tolerated as long as
//! later slices compensate, and the underlying connection is never touched.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use futures_util::{StreamExt, stream};
//! use vidloader_core::download::{ThrottleConfig, ThrottledTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // 64 KiB/s, shaped in 1024 slices per second.
//! let transport = ThrottledTransport::new(ThrottleConfig::limited(64.0 * 1024.0)?);
//! let body = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from(vec![0u8; 4096]))]);
//!
//! let mut shaped = transport.throttle(body);
//! while let Some(piece) = shaped.next().await {
//!     assert!(piece?.len() <= 64);
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use tokio::time::Instant;
use tracing::{debug, trace};

use super::constants::{DEFAULT_SLEEP_THRESHOLD, DEFAULT_SLICES_PER_SECOND};
use crate::config::ConfigError;

/// Immutable shaping parameters for one transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottleConfig {
    rate_per_second: Option<f64>,
    slices_per_second: u32,
    sleep_threshold: Duration,
    chunk_limit: Option<usize>,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl ThrottleConfig {
    /// No rate limit: bytes pass through untouched.
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            rate_per_second: None,
            slices_per_second: DEFAULT_SLICES_PER_SECOND,
            sleep_threshold: DEFAULT_SLEEP_THRESHOLD,
            chunk_limit: None,
        }
    }

    /// Limits the average transfer rate to `bytes_per_second`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the rate is not a finite value of at
    /// least one byte per second.
    pub fn limited(bytes_per_second: f64) -> Result<Self, ConfigError> {
        if !bytes_per_second.is_finite() || bytes_per_second < 1.0 {
            return Err(ConfigError::invalid(
                "speed_limit",
                format!("{bytes_per_second} bytes/s is not a positive transfer rate"),
            ));
        }
        Ok(Self {
            rate_per_second: Some(bytes_per_second),
            ..Self::unlimited()
        })
    }

    /// Builds a config from an optional rate, `None` meaning unlimited.
    ///
    /// # Errors
    ///
    /// Same as [`limited`](Self::limited).
    pub fn from_rate(bytes_per_second: Option<f64>) -> Result<Self, ConfigError> {
        bytes_per_second.map_or_else(|| Ok(Self::unlimited()), Self::limited)
    }

    /// Overrides the number of time-slices per second (default 1024).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `slices` is zero.
    pub fn with_slices_per_second(mut self, slices: u32) -> Result<Self, ConfigError> {
        if slices == 0 {
            return Err(ConfigError::invalid(
                "slices_per_second",
                "must be at least 1",
            ));
        }
        self.slices_per_second = slices;
        Ok(self)
    }

    /// Overrides the minimum lead before the transfer suspends (default 5 ms).
    #[must_use]
    pub fn with_sleep_threshold(mut self, threshold: Duration) -> Self {
        self.sleep_threshold = threshold;
        self
    }

    /// Caps each yielded piece at `limit` bytes, on top of the per-slice cap.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `limit` is zero.
    pub fn with_chunk_limit(mut self, limit: usize) -> Result<Self, ConfigError> {
        if limit == 0 {
            return Err(ConfigError::invalid("chunk_size", "must be at least 1 byte"));
        }
        self.chunk_limit = Some(limit);
        Ok(self)
    }

    /// Configured rate in bytes per second, if any.
    #[must_use]
    pub fn rate_per_second(&self) -> Option<f64> {
        self.rate_per_second
    }

    /// Returns true when no rate limit is configured.
    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        self.rate_per_second.is_none()
    }

    /// Per-slice read cap and nominal slice duration, or `None` when unlimited.
    ///
    /// Rates below one byte per slice lower the slice count to the rate so
    /// every slice still carries at least one byte.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn slice_plan(&self) -> Option<SlicePlan> {
        let rate = self.rate_per_second?;
        let slices = f64::from(self.slices_per_second).min(rate.floor()).max(1.0);
        let mut read_cap = ((rate / slices).floor() as usize).max(1);
        if let Some(limit) = self.chunk_limit {
            read_cap = read_cap.min(limit);
        }
        Some(SlicePlan {
            read_cap,
            slice_secs: 1.0 / slices,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct SlicePlan {
    read_cap: usize,
    slice_secs: f64,
}

/// Rate-shapes byte streams according to a [`ThrottleConfig`].
///
/// The transport itself holds no mutable state: every call to
/// [`throttle`](Self::throttle) owns a fresh lag accumulator, so concurrent
/// transfers never influence each other.
#[derive(Debug, Clone, Copy)]
pub struct ThrottledTransport {
    config: ThrottleConfig,
}

impl ThrottledTransport {
    /// Creates a transport for the given configuration.
    #[must_use]
    pub fn new(config: ThrottleConfig) -> Self {
        Self { config }
    }

    /// Returns the transport configuration.
    #[must_use]
    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Wraps `source`, yielding the same bytes in rate-shaped pieces.
    ///
    /// Without a rate limit the source is returned as-is. The first error
    /// from `source` is forwarded and ends the shaped stream.
    pub fn throttle<S, E>(&self, source: S) -> BoxStream<'static, Result<Bytes, E>>
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Send + 'static,
    {
        let Some(plan) = self.config.slice_plan() else {
            return source.boxed();
        };

        trace!(
            read_cap = plan.read_cap,
            slice_secs = plan.slice_secs,
            "starting throttled transfer"
        );

        let state = TransferState {
            source: source.boxed(),
            pending: Bytes::new(),
            plan,
            threshold_secs: self.config.sleep_threshold.as_secs_f64(),
            lag_secs: 0.0,
            slice_started: None,
            transferred: 0,
            finished: false,
        };

        stream::unfold(state, TransferState::next_piece).boxed()
    }
}

/// Per-transfer bookkeeping, owned by exactly one shaped stream.
struct TransferState<E> {
    source: BoxStream<'static, Result<Bytes, E>>,
    pending: Bytes,
    plan: SlicePlan,
    threshold_secs: f64,
    /// Negative when the transfer runs ahead of schedule.
    lag_secs: f64,
    slice_started: Option<Instant>,
    transferred: u64,
    finished: bool,
}

impl<E> TransferState<E> {
    async fn next_piece(mut self) -> Option<(Result<Bytes, E>, Self)> {
        if self.finished {
            return None;
        }

        self.pace().await;
        self.slice_started = Some(Instant::now());

        while self.pending.is_empty() {
            match self.source.next().await {
                Some(Ok(bytes)) => self.pending = bytes,
                Some(Err(error)) => {
                    self.finished = true;
                    return Some((Err(error), self));
                }
                None => {
                    debug!(bytes = self.transferred, "throttled transfer finished");
                    return None;
                }
            }
        }

        let take = self.plan.read_cap.min(self.pending.len());
        let piece = self.pending.split_to(take);
        self.transferred += piece.len() as u64;
        Some((Ok(piece), self))
    }

    /// Accounts for the previous slice and suspends if far enough ahead.
    async fn pace(&mut self) {
        let Some(started) = self.slice_started else {
            return;
        };

        self.lag_secs += started.elapsed().as_secs_f64() - self.plan.slice_secs;
        if self.lag_secs < -self.threshold_secs {
            let pause = Duration::from_secs_f64(-self.lag_secs);
            trace!(pause_us = pause.as_micros(), "throttle ahead of schedule, sleeping");
            tokio::time::sleep(pause).await;
            self.lag_secs = 0.0;
        }
    }
}
