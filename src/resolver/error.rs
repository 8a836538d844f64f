//! Error types for quality negotiation and media resolution.
//!
//! This module defines structured errors for resolution,
//! following the What/Why/Fix pattern used across the project.

use thiserror::Error;

use crate::download::DownloadError;
use crate::media::MediaKind;
use crate::page::PageError;

/// Errors that can occur while resolving a page to downloadable media.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Exact quality requested but not advertised
    #[error(
        "quality {requested}p not found\n  Suggestion: Drop --exact to accept the nearest lower quality"
    )]
    QualityNotFound {
        /// The requested quality
        requested: u32,
    },

    /// Every advertised quality exceeds the request
    #[error(
        "no quality at or below {requested}p, lowest available is {lowest}p\n  Suggestion: Request at least {lowest}p or use 'min'"
    )]
    NoQualityAtOrBelow {
        /// The requested quality
        requested: u32,
        /// The lowest advertised quality
        lowest: u32,
    },

    /// The page advertised no qualities at all
    #[error("no qualities advertised by the page\n  Suggestion: Check that the video is playable")]
    NoQualities,

    /// No track of the target quality exists
    #[error("no {kind} content found for quality {quality}p")]
    MediaNotFound {
        /// Track kind
        kind: MediaKind,
        /// Target quality
        quality: u32,
    },

    /// No registered loader serves the redirect target
    #[error("no loader found for host '{host}'\n  Suggestion: {suggestion}")]
    LoaderNotFound {
        /// Host of the canonical source URL
        host: String,
        /// How to fix the issue
        suggestion: String,
    },

    /// Manifest document is malformed or incomplete
    #[error("invalid manifest: {reason}")]
    InvalidManifest {
        /// What was wrong with the manifest
        reason: String,
    },

    /// Both a manifest and byte-range URLs were observed
    #[error(
        "ambiguous media sources: manifest '{manifest_url}' observed alongside byte-range URLs"
    )]
    AmbiguousSources {
        /// The observed manifest URL
        manifest_url: String,
    },

    /// Content type is neither audio nor video
    #[error("unrecognized MIME type '{mime_type}'")]
    InvalidMimeType {
        /// The offending content type
        mime_type: String,
    },

    /// Response carried no content type
    #[error("no MIME type provided for '{url}'")]
    MimeTypeNotFound {
        /// URL of the response without `Content-Type`
        url: String,
    },

    /// Not enough media URLs were observed in time
    #[error(
        "timed out discovering media URLs: found {found}, need {required}\n  Suggestion: Increase --timeout"
    )]
    DiscoveryTimeout {
        /// URLs observed when the timeout elapsed
        found: usize,
        /// URLs required
        required: usize,
    },

    /// Too many loader redirects
    #[error(
        "too many redirects ({count}) resolving '{input}'\n  Suggestion: Check for circular redirects or simplify the URL"
    )]
    TooManyRedirects {
        /// The original page URL
        input: String,
        /// Number of redirects encountered
        count: usize,
    },

    /// The page exposes no canonical video source
    #[error("no video source found on '{url}'")]
    VideoSourceNotFound {
        /// The page URL
        url: String,
    },

    /// A probe file could not be inspected
    #[error("failed to probe '{path}': {reason}")]
    Probe {
        /// The probed file
        path: String,
        /// Why probing failed
        reason: String,
    },

    /// A manifest or probe download failed
    #[error(transparent)]
    Transfer(#[from] DownloadError),

    /// The page adapter failed during discovery
    #[error(transparent)]
    Page(#[from] PageError),
}

impl ResolveError {
    /// Creates a `QualityNotFound` error.
    #[must_use]
    pub fn quality_not_found(requested: u32) -> Self {
        Self::QualityNotFound { requested }
    }

    /// Creates a `NoQualityAtOrBelow` error.
    #[must_use]
    pub fn no_quality_at_or_below(requested: u32, lowest: u32) -> Self {
        Self::NoQualityAtOrBelow { requested, lowest }
    }

    /// Creates a `MediaNotFound` error.
    #[must_use]
    pub fn media_not_found(kind: MediaKind, quality: u32) -> Self {
        Self::MediaNotFound { kind, quality }
    }

    /// Creates a `LoaderNotFound` error.
    #[must_use]
    pub fn loader_not_found(host: &str) -> Self {
        Self::LoaderNotFound {
            host: host.to_string(),
            suggestion: "Register a loader for this host or open the source URL directly"
                .to_string(),
        }
    }

    /// Creates an `InvalidManifest` error.
    #[must_use]
    pub fn invalid_manifest(reason: impl Into<String>) -> Self {
        Self::InvalidManifest {
            reason: reason.into(),
        }
    }

    /// Creates an `AmbiguousSources` error.
    #[must_use]
    pub fn ambiguous_sources(manifest_url: &str) -> Self {
        Self::AmbiguousSources {
            manifest_url: manifest_url.to_string(),
        }
    }

    /// Creates an `InvalidMimeType` error.
    #[must_use]
    pub fn invalid_mime_type(mime_type: &str) -> Self {
        Self::InvalidMimeType {
            mime_type: mime_type.to_string(),
        }
    }

    /// Creates a `MimeTypeNotFound` error.
    #[must_use]
    pub fn mime_type_not_found(url: &str) -> Self {
        Self::MimeTypeNotFound {
            url: url.to_string(),
        }
    }

    /// Creates a `DiscoveryTimeout` error.
    #[must_use]
    pub fn discovery_timeout(found: usize, required: usize) -> Self {
        Self::DiscoveryTimeout { found, required }
    }

    /// Creates a `TooManyRedirects` error.
    #[must_use]
    pub fn too_many_redirects(input: &str, count: usize) -> Self {
        Self::TooManyRedirects {
            input: input.to_string(),
            count,
        }
    }

    /// Creates a `VideoSourceNotFound` error.
    #[must_use]
    pub fn video_source_not_found(url: &str) -> Self {
        Self::VideoSourceNotFound {
            url: url.to_string(),
        }
    }

    /// Creates a `Probe` error.
    #[must_use]
    pub fn probe(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::Probe {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }
}
