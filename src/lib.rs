//! Vidloader Core Library
//!
//! This library retrieves the audio and video streams of a video that is
//! only reachable through signed, short-lived URLs inside a page session,
//! and hands both tracks to an external muxer.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`acquire`] - Per-video orchestration from page URL to saved file
//! - [`config`] - Acquisition options and validation
//! - [`download`] - HTTP client, throttling and append-only segment transfers
//! - [`media`] - Segment sources and per-track download plans
//! - [`mux`] - External tools for merging tracks and probing dimensions
//! - [`page`] - Page adapter trait and the browser-less manifest adapter
//! - [`resolver`] - Quality negotiation, manifest and byte-range resolution, loader routing

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod acquire;
pub mod config;
pub mod download;
pub mod media;
pub mod mux;
pub mod page;
pub mod resolver;
pub(crate) mod user_agent;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use acquire::{AcquireError, Acquisition, VideoOutcome};
pub use config::{AcquireOptions, ConfigError};
pub use download::{DownloadError, HttpClient, SegmentedDownloader, ThrottleConfig, ThrottledTransport};
pub use media::{MediaKind, MediaSpec, ResourceSpec, Segment, SegmentSource};
pub use mux::{FfmpegMuxer, FfprobeProbe, MediaProbe, MuxError, Muxer};
pub use page::{DashPage, DashPageFactory, PageAdapter, PageError};
pub use resolver::{LoaderFactory, LoaderRegistry, QualityRequest, QualityResolver, ResolveError};
