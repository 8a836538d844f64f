//! Resolution pipeline from a page to downloadable segment sources.
//!
//! # Architecture
//!
//! - [`QualityResolver`] - Negotiates the target quality
//! - [`ManifestResolver`] - Expands an MPD manifest into [`TemplateSegments`]
//! - [`DirectSourceResolver`] - Probes observed byte-range fetches into [`ByteRangeSegments`]
//! - [`LoaderRegistry`] - Host-suffix table of [`LoaderFactory`]s
//! - [`RedirectRouter`] - Moves acquisition to the loader of the canonical origin
//!
//! # Example
//!
//! ```no_run
//! use vidloader_core::media::MediaKind;
//! use vidloader_core::resolver::{ManifestResolver, QualityRequest, QualityResolver};
//!
//! # fn example(manifest: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = ManifestResolver::parse(manifest, "https://cdn.example.com/v/manifest.mpd")?;
//! let target = QualityResolver::new(QualityRequest::AtMost(720), false)
//!     .resolve(&resolver.video_qualities()?)?;
//! let video = resolver.resolve(target, MediaKind::Video)?;
//! println!("{} video segments", video.remaining());
//! # Ok(())
//! # }
//! ```

mod direct;
mod error;
mod manifest;
pub mod mpd;
mod quality;
mod registry;

pub use direct::{ByteRangeGroups, ByteRangeSegments, DEFAULT_POLL_INTERVAL, DirectSourceResolver};
pub use error::ResolveError;
pub use manifest::{AUDIO_TIERS, ManifestResolver, TemplateSegments, audio_tier_quality};
pub use quality::{QualityRequest, QualityResolver, QualitySet};
pub use registry::{LoaderFactory, LoaderRegistry, RedirectRouter, Route};
