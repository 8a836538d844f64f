//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod socket_guard;

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use vidloader_core::mux::{MediaProbe, MuxError, Muxer};

/// Muxer that writes the video bytes followed by the audio bytes.
#[derive(Debug, Default)]
pub struct ConcatMuxer {
    calls: AtomicUsize,
}

impl ConcatMuxer {
    /// Number of completed `mux` calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Muxer for ConcatMuxer {
    async fn mux(&self, audio: &Path, video: &Path, output: &Path) -> Result<(), MuxError> {
        let mut merged = tokio::fs::read(video).await.expect("video track readable");
        merged.extend(tokio::fs::read(audio).await.expect("audio track readable"));
        tokio::fs::write(output, merged).await.expect("output writable");
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Probe for flows that never measure a track.
#[derive(Debug, Default)]
pub struct UnusedProbe;

#[async_trait]
impl MediaProbe for UnusedProbe {
    async fn dimensions(&self, path: &Path) -> Result<(u32, u32), MuxError> {
        panic!("unexpected probe of {}", path.display());
    }
}
