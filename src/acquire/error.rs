//! Top-level error for one acquisition.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ConfigError;
use crate::download::DownloadError;
use crate::mux::MuxError;
use crate::page::PageError;
use crate::resolver::ResolveError;

/// Errors that abort the acquisition of a video.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// Options failed validation
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Quality negotiation, media resolution or loader routing failed
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A track transfer failed
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// The page adapter failed
    #[error(transparent)]
    Page(#[from] PageError),

    /// Merging the tracks failed
    #[error(transparent)]
    Mux(#[from] MuxError),

    /// The page reports that the video cannot be watched
    #[error("video is not accessible: {message}")]
    AccessRestricted {
        /// Message shown by the page
        message: String,
    },

    /// The output file exists and overwriting is disabled
    #[error("output file already exists: {}\n  Suggestion: Pass --overwrite or choose another output path", .path.display())]
    FileExists {
        /// The existing file
        path: PathBuf,
    },

    /// Local filesystem operation failed
    #[error("IO error at '{}': {source}", .path.display())]
    Io {
        /// The path involved
        path: PathBuf,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },
}

impl AcquireError {
    /// Creates an `AccessRestricted` error.
    #[must_use]
    pub fn access_restricted(message: impl Into<String>) -> Self {
        Self::AccessRestricted {
            message: message.into(),
        }
    }

    /// Creates a `FileExists` error.
    #[must_use]
    pub fn file_exists(path: &Path) -> Self {
        Self::FileExists {
            path: path.to_path_buf(),
        }
    }

    /// Creates an `Io` error.
    #[must_use]
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
