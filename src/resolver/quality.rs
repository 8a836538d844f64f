//! Target quality negotiation.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, info};

use super::ResolveError;
use crate::config::ConfigError;

/// Distinct qualities a source advertises, in ascending order.
pub type QualitySet = BTreeSet<u32>;

/// Quality requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityRequest {
    /// Lowest advertised quality.
    Min,
    /// Highest advertised quality.
    Max,
    /// Greatest advertised quality not above the value.
    AtMost(u32),
}

impl FromStr for QualityRequest {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().trim_end_matches(['p', 'P']);
        match value.to_ascii_lowercase().as_str() {
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            other => match other.parse::<u32>() {
                Ok(quality) if quality > 0 => Ok(Self::AtMost(quality)),
                _ => Err(ConfigError::invalid(
                    "quality",
                    format!("'{s}' is neither 'min', 'max' nor a positive integer"),
                )),
            },
        }
    }
}

impl fmt::Display for QualityRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Min => f.write_str("min"),
            Self::Max => f.write_str("max"),
            Self::AtMost(quality) => write!(f, "{quality}p"),
        }
    }
}

/// Picks the target quality from what a page advertises.
#[derive(Debug, Clone, Copy)]
pub struct QualityResolver {
    request: QualityRequest,
    exact: bool,
}

impl QualityResolver {
    /// Creates a resolver for `request`; `exact` forbids downgrading.
    #[must_use]
    pub fn new(request: QualityRequest, exact: bool) -> Self {
        Self { request, exact }
    }

    /// Selects the target quality from `available`.
    ///
    /// # Errors
    ///
    /// - `NoQualities` if `available` is empty
    /// - `NoQualityAtOrBelow` if every quality exceeds the request
    /// - `QualityNotFound` if the request is absent and downgrading is forbidden
    pub fn resolve(&self, available: &QualitySet) -> Result<u32, ResolveError> {
        let (Some(&lowest), Some(&highest)) = (available.first(), available.last()) else {
            return Err(ResolveError::NoQualities);
        };
        debug!(qualities = ?available, request = %self.request, "negotiating quality");

        let requested = match self.request {
            QualityRequest::Min => return Ok(lowest),
            QualityRequest::Max => return Ok(highest),
            QualityRequest::AtMost(requested) => requested,
        };

        let Some(&selected) = available.range(..=requested).next_back() else {
            return Err(ResolveError::no_quality_at_or_below(requested, lowest));
        };

        if selected < requested {
            if self.exact {
                return Err(ResolveError::quality_not_found(requested));
            }
            info!(
                requested,
                selected, "requested quality unavailable, using the nearest lower quality"
            );
        }

        Ok(selected)
    }
}
