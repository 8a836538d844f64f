//! External media tools: merging tracks and probing frame dimensions.
//!
//! Both run as child processes located on `PATH` via the `which` crate.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Errors raised by external media tools.
#[derive(Debug, Error)]
pub enum MuxError {
    /// The tool is not installed
    #[error("'{tool}' not found on PATH\n  Suggestion: Install {tool} or add it to PATH")]
    ToolNotFound {
        /// Tool name
        tool: &'static str,
    },

    /// The tool could not be started
    #[error("failed to execute '{program}': {source}")]
    Spawn {
        /// Program path
        program: String,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The tool exited unsuccessfully
    #[error("'{program}' exited with {status}: {stderr}")]
    Failed {
        /// Program path
        program: String,
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// The tool's output could not be understood
    #[error("unexpected output from '{program}': {output}")]
    UnparseableOutput {
        /// Program path
        program: String,
        /// The output that failed to parse
        output: String,
    },
}

/// Merges separately downloaded audio and video tracks into one file.
#[async_trait]
pub trait Muxer: Send + Sync {
    /// Writes `output` from `audio` and `video`, replacing any existing file.
    async fn mux(&self, audio: &Path, video: &Path, output: &Path) -> Result<(), MuxError>;
}

/// Reads the frame dimensions of a (possibly partial) video file.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Returns `(width, height)` of the first video stream.
    async fn dimensions(&self, path: &Path) -> Result<(u32, u32), MuxError>;
}

/// [`Muxer`] backed by `ffmpeg`, copying streams without re-encoding.
#[derive(Debug, Clone)]
pub struct FfmpegMuxer {
    binary_path: PathBuf,
}

impl FfmpegMuxer {
    /// Uses the `ffmpeg` binary at `binary_path`.
    #[must_use]
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Locates `ffmpeg` on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns `MuxError::ToolNotFound` if it is not installed.
    pub fn from_path() -> Result<Self, MuxError> {
        which::which("ffmpeg")
            .map(Self::new)
            .map_err(|_| MuxError::ToolNotFound { tool: "ffmpeg" })
    }
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    #[instrument(skip(self), fields(audio = %audio.display(), video = %video.display(), output = %output.display()))]
    async fn mux(&self, audio: &Path, video: &Path, output: &Path) -> Result<(), MuxError> {
        let mut command = Command::new(&self.binary_path);
        command
            .args(["-hide_banner", "-loglevel", "error", "-y", "-i"])
            .arg(video)
            .arg("-i")
            .arg(audio)
            .args(["-map", "0:v:0", "-map", "1:a:0", "-c", "copy"])
            .arg(output);
        run(&self.binary_path, command).await?;
        debug!("tracks merged");
        Ok(())
    }
}

/// [`MediaProbe`] backed by `ffprobe`.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary_path: PathBuf,
}

impl FfprobeProbe {
    /// Uses the `ffprobe` binary at `binary_path`.
    #[must_use]
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Locates `ffprobe` on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns `MuxError::ToolNotFound` if it is not installed.
    pub fn from_path() -> Result<Self, MuxError> {
        which::which("ffprobe")
            .map(Self::new)
            .map_err(|_| MuxError::ToolNotFound { tool: "ffprobe" })
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    #[instrument(level = "debug", skip(self), fields(path = %path.display()))]
    async fn dimensions(&self, path: &Path) -> Result<(u32, u32), MuxError> {
        let mut command = Command::new(&self.binary_path);
        command
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height",
                "-of",
                "csv=s=x:p=0",
            ])
            .arg(path);
        let stdout = run(&self.binary_path, command).await?;
        parse_dimensions(&stdout).ok_or_else(|| MuxError::UnparseableOutput {
            program: self.binary_path.display().to_string(),
            output: stdout.trim().to_string(),
        })
    }
}

/// Runs `command` to completion, returning its standard output.
async fn run(program: &Path, mut command: Command) -> Result<String, MuxError> {
    let program = program.display().to_string();
    let output = command
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| MuxError::Spawn {
            program: program.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(MuxError::Failed {
            program,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parses `ffprobe` CSV output such as `1280x720`.
fn parse_dimensions(output: &str) -> Option<(u32, u32)> {
    let line = output.lines().map(str::trim).find(|l| !l.is_empty())?;
    let (width, height) = line.split_once('x')?;
    let width = width.trim().parse().ok()?;
    let height = height.trim().trim_end_matches('x').parse().ok()?;
    Some((width, height))
}
