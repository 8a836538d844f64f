//! Page adapters: the per-site boundary between a live page session and the
//! acquisition engine.
//!
//! # Architecture
//!
//! - [`PageAdapter`] - Async trait every site variant implements
//! - [`MediaLocator`] - How the adapter wants its media resolved
//! - [`SessionInfo`] - User-Agent and cookies the signed URLs are bound to
//! - [`ResourceEntry`] - One observed network fetch (resource timing)
//! - [`DashPage`] - Browser-less adapter for hosts publishing a plain manifest
//!
//! Browser-driven adapters (clicking controls, reading the DOM) live outside
//! this crate; they only need to implement [`PageAdapter`].

mod dash;

pub use dash::{DashPage, DashPageFactory};

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::download::DownloadError;
use crate::media::MediaSpec;
use crate::resolver::QualitySet;

/// Errors raised by page adapters.
#[derive(Debug, Error)]
pub enum PageError {
    /// The page could not be opened
    #[error("failed to open '{url}': {reason}")]
    Navigation {
        /// The page URL
        url: String,
        /// Why navigation failed
        reason: String,
    },

    /// A page interaction did not complete in time
    #[error("page operation '{operation}' timed out after {}s", .timeout.as_secs())]
    Timeout {
        /// The interaction that timed out
        operation: &'static str,
        /// The applied limit
        timeout: Duration,
    },

    /// The page content could not be interpreted
    #[error("unexpected page content: {reason}")]
    Content {
        /// What was unexpected
        reason: String,
    },

    /// Called before [`PageAdapter::open`]
    #[error("no page is open")]
    NotOpen,

    /// An HTTP request made by the adapter failed
    #[error(transparent)]
    Transfer(#[from] DownloadError),
}

impl PageError {
    /// Creates a `Navigation` error.
    #[must_use]
    pub fn navigation(url: &str, reason: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a `Timeout` error.
    #[must_use]
    pub fn timeout(operation: &'static str, timeout: Duration) -> Self {
        Self::Timeout { operation, timeout }
    }

    /// Creates a `Content` error.
    #[must_use]
    pub fn content(reason: impl Into<String>) -> Self {
        Self::Content {
            reason: reason.into(),
        }
    }
}

/// A cookie set by the page session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Domain as reported by the browser; a leading dot marks a domain cookie.
    pub domain: String,
    /// Cookie path.
    pub path: String,
    /// Only sent over HTTPS.
    pub secure: bool,
}

impl SessionCookie {
    /// Creates a non-secure cookie for path `/`.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: "/".to_string(),
            secure: false,
        }
    }
}

/// Identity of the page session that signed media URLs are bound to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    /// The browser's User-Agent, if known.
    pub user_agent: Option<String>,
    /// Cookies to replay on media requests.
    pub cookies: Vec<SessionCookie>,
}

/// One entry of the page's resource-timing log.
///
/// Deserializes directly from `performance.getEntriesByType('resource')`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceEntry {
    /// Requested URL.
    pub name: String,
    /// What issued the request (`fetch`, `xmlhttprequest`, `img`, ...).
    #[serde(rename = "initiatorType", default)]
    pub initiator_type: String,
}

impl ResourceEntry {
    /// Creates an entry for `url` issued by `initiator_type`.
    #[must_use]
    pub fn new(url: impl Into<String>, initiator_type: impl Into<String>) -> Self {
        Self {
            name: url.into(),
            initiator_type: initiator_type.into(),
        }
    }

    /// Parses the JSON array a page returns for its resource-timing log.
    ///
    /// # Errors
    ///
    /// Returns `PageError::Content` if the text is not an array of entries.
    pub fn parse_log(json: &str) -> Result<Vec<Self>, PageError> {
        serde_json::from_str(json)
            .map_err(|e| PageError::content(format!("malformed resource-timing log: {e}")))
    }
}

/// How the media of the open page should be resolved.
#[derive(Debug)]
pub enum MediaLocator {
    /// The adapter already produced the download plans.
    Resolved(MediaSpec),
    /// Resolve from the manifest at this URL.
    Manifest {
        /// Manifest URL.
        url: String,
    },
    /// Resolve from byte-range fetches in the resource-timing log.
    ResourceTiming,
}

/// Capability trait implemented by every site variant.
///
/// # Object Safety
///
/// This trait uses `async_trait` to support dynamic dispatch via
/// `Box<dyn PageAdapter>`, which the loader registry hands out.
#[async_trait]
pub trait PageAdapter: Send {
    /// Adapter name for logs (e.g., "dash").
    fn name(&self) -> &str;

    /// Navigates to `url`.
    async fn open(&mut self, url: &str) -> Result<(), PageError>;

    /// Message describing why the video is not accessible, if it is not.
    async fn check_restrictions(&mut self) -> Result<Option<String>, PageError> {
        Ok(None)
    }

    /// Turns off autoplay of follow-up videos.
    async fn disable_autoplay(&mut self) -> Result<(), PageError> {
        Ok(())
    }

    /// Video title, if the page shows one.
    async fn title(&mut self) -> Result<Option<String>, PageError> {
        Ok(None)
    }

    /// Qualities the player offers.
    async fn qualities(&mut self) -> Result<QualitySet, PageError>;

    /// Canonical URL of the embedded video source.
    async fn source_url(&mut self) -> Result<Option<String>, PageError>;

    /// How to obtain media for `target` quality; `scratch` may hold temporary files.
    async fn resolve_media(&mut self, target: u32, scratch: &Path) -> Result<MediaLocator, PageError>;

    /// Current resource-timing log.
    async fn resource_entries(&mut self) -> Result<Vec<ResourceEntry>, PageError> {
        Ok(Vec::new())
    }

    /// Restarts playback so that missing segment requests are issued again.
    async fn replay(&mut self) -> Result<(), PageError> {
        Ok(())
    }

    /// Session identity for follow-up HTTP requests.
    async fn session(&mut self) -> Result<SessionInfo, PageError> {
        Ok(SessionInfo::default())
    }

    /// Further video page URLs when the open page is a playlist.
    async fn playlist(&mut self) -> Result<Vec<String>, PageError> {
        Ok(Vec::new())
    }
}
