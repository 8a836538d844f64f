//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use vidloader_core::config::{
    DEFAULT_CHUNK_SIZE_KIB, DEFAULT_MAX_REDIRECTS, DEFAULT_QUALITY, DEFAULT_TIMEOUT_SECS,
    MINIMUM_CHUNK_SIZE_KIB, MINIMUM_TIMEOUT_SECS,
};
use vidloader_core::{AcquireOptions, QualityRequest};

/// Download a video and its audio track, then merge them into one file.
///
/// Vidloader negotiates a quality, resolves the signed segment URLs of
/// both tracks, downloads them with optional bandwidth shaping and merges
/// them with ffmpeg.
#[derive(Parser, Debug)]
#[command(name = "vidloader")]
#[command(author, version, about)]
pub struct Args {
    /// Video page URL
    pub url: String,

    /// Output file, or a directory when the path has no extension
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Segment size in KiB for byte-range transfers (min 128)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CHUNK_SIZE_KIB, value_parser = clap::value_parser!(u32).range(i64::from(MINIMUM_CHUNK_SIZE_KIB)..))]
    pub chunk_size: u32,

    /// Speed limit in Mibit/s
    #[arg(short = 's', long)]
    pub speed_limit: Option<f64>,

    /// Quality: a height such as 720 (or 720p), 'min' or 'max'
    #[arg(short = 'q', long, default_value_t = QualityRequest::AtMost(DEFAULT_QUALITY))]
    pub quality: QualityRequest,

    /// Seconds to wait for each page discovery phase (min 1)
    #[arg(short = 't', long, default_value_t = DEFAULT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(MINIMUM_TIMEOUT_SECS..))]
    pub timeout: u64,

    /// Fail instead of downgrading when the requested quality is missing
    #[arg(short = 'e', long)]
    pub exact: bool,

    /// Replace the output file if it exists
    #[arg(short = 'w', long)]
    pub overwrite: bool,

    /// Acquire every video when the page is a playlist
    #[arg(short = 'p', long)]
    pub playlist: bool,

    /// Maximum loader redirects
    #[arg(long, default_value_t = DEFAULT_MAX_REDIRECTS)]
    pub max_redirects: usize,

    /// Host suffix whose pages are plain MPD manifests (repeatable)
    #[arg(long, value_name = "SUFFIX")]
    pub manifest_host: Vec<String>,

    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long)]
    pub quiet: bool,
}

impl Args {
    /// Builds acquisition options from the parsed arguments.
    #[must_use]
    pub fn to_options(&self) -> AcquireOptions {
        AcquireOptions {
            output_path: self.output.clone(),
            chunk_size_kib: self.chunk_size,
            speed_limit_mibps: self.speed_limit,
            quality: self.quality,
            exact: self.exact,
            overwrite: self.overwrite,
            timeout: Duration::from_secs(self.timeout),
            max_redirects: self.max_redirects,
            ..AcquireOptions::default()
        }
    }
}
