//! Segment transfer: HTTP client, bandwidth shaping and append-only downloads.
//!
//! # Features
//!
//! - Session-aware client (page User-Agent and cookies)
//! - Streaming, append-only segment downloads that can be resumed
//! - Optional rate limiting with sub-second slices
//! - Configurable timeouts (30s connect, 5min read by default)
//!
//! # Example
//!
//! ```no_run
//! use vidloader_core::download::{HttpClient, SegmentedDownloader, ThrottleConfig, ThrottledTransport};
//! use vidloader_core::media::{ResourceSpec, Segment, SegmentList};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = ThrottledTransport::new(ThrottleConfig::limited(512.0 * 1024.0)?);
//! let downloader = SegmentedDownloader::new(HttpClient::new(), transport);
//! let source = SegmentList::new([Segment::new("https://cdn.example.com/seg-1.m4s")]);
//! let bytes = downloader.run(ResourceSpec::new(source, "video.mp4")).await?;
//! println!("Downloaded {bytes} bytes");
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;
mod segmented;
mod throttle;

pub use client::{FetchedFile, HttpClient, declared_packet_length};
pub use error::DownloadError;
pub use segmented::SegmentedDownloader;
pub use throttle::{ThrottleConfig, ThrottledTransport};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
