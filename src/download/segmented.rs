//! Drains a [`ResourceSpec`] into its target file.
//!
//! Segments are requested strictly in source order and appended to the
//! target, so the file is a byte-for-byte concatenation of the responses.
//! The file is opened in append mode: running the downloader again against a
//! partially written target continues it, provided the caller hands over only
//! the segments that were not consumed yet.

use std::path::Path;

use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};

use super::client::{HttpClient, declared_packet_length, stream_body};
use super::error::DownloadError;
use super::throttle::ThrottledTransport;
use crate::media::{ResourceSpec, SegmentSource};

/// Sequential, append-only segment downloader.
#[derive(Debug, Clone)]
pub struct SegmentedDownloader {
    client: HttpClient,
    transport: ThrottledTransport,
}

impl SegmentedDownloader {
    /// Creates a downloader issuing requests through `client` and shaping
    /// every body with `transport`.
    #[must_use]
    pub fn new(client: HttpClient, transport: ThrottledTransport) -> Self {
        Self { client, transport }
    }

    /// Downloads every segment of `spec`, returning the number of bytes appended.
    ///
    /// The transfer stops when the source is exhausted, when a response
    /// declares a non-positive length (the previous segment was the last), or
    /// after a segment shorter than its expected size. Bytes already appended
    /// stay in the file when an error aborts the transfer.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::HttpStatus` for any non-2xx response (no
    /// retry), and `Network`, `Timeout` or `Io` for transport failures.
    #[instrument(skip(self, spec), fields(target = %spec.target.display()))]
    pub async fn run(&self, spec: ResourceSpec) -> Result<u64, DownloadError> {
        let ResourceSpec {
            mut source,
            target,
        } = spec;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&target)
            .await
            .map_err(|e| DownloadError::io(&target, e))?;
        let mut writer = BufWriter::new(file);

        let outcome = self.drain(source.as_mut(), &mut writer, &target).await;
        // Flush even on failure so appended bytes survive for a resumed run.
        let flushed = writer.flush().await.map_err(|e| DownloadError::io(&target, e));
        let (bytes, segments) = outcome?;
        flushed?;

        info!(bytes, segments, "resource downloaded");
        Ok(bytes)
    }

    async fn drain(
        &self,
        source: &mut dyn SegmentSource,
        writer: &mut BufWriter<tokio::fs::File>,
        target: &Path,
    ) -> Result<(u64, usize), DownloadError> {
        let mut bytes_total: u64 = 0;
        let mut segments: usize = 0;
        let mut previous: Option<u64> = None;

        while let Some(segment) = source.next_segment(previous) {
            let response = self.client.get(&segment.url).await?;
            let declared = declared_packet_length(response.headers());

            if declared.is_some_and(|len| len <= 0) {
                debug!(url = %segment.url, "empty packet, previous segment was the last");
                break;
            }

            let written = stream_body(response, &self.transport, writer, &segment.url, target).await?;
            bytes_total += written;
            segments += 1;

            #[allow(clippy::cast_sign_loss)]
            let observed = declared.map_or(written, |len| len as u64);
            debug!(url = %segment.url, observed, written, "segment appended");

            if observed == 0 {
                break;
            }

            if let Some(expected) = segment.expected_size {
                if expected == 0 {
                    warn!(url = %segment.url, "expected segment size must be positive, got 0");
                }
                if observed < expected {
                    debug!(observed, expected, "short segment, resource exhausted");
                    break;
                }
            }

            previous = Some(observed);
        }

        Ok((bytes_total, segments))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use crate::download::ThrottleConfig;
    use crate::media::{Segment, SegmentList};
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn downloader() -> SegmentedDownloader {
        SegmentedDownloader::new(
            HttpClient::new(),
            ThrottledTransport::new(ThrottleConfig::unlimited()),
        )
    }

    async fn mount_body(server: &MockServer, route: &str, body: &[u8]) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .mount(server)
            .await;
    }

    /// Source that records the observed sizes it is handed back.
    struct RecordingSource {
        inner: SegmentList,
        seen: Arc<Mutex<Vec<Option<u64>>>>,
    }

    impl SegmentSource for RecordingSource {
        fn next_segment(&mut self, previous: Option<u64>) -> Option<Segment> {
            self.seen.lock().unwrap().push(previous);
            self.inner.next_segment(previous)
        }
    }

    #[tokio::test]
    async fn test_short_segment_stops_before_next_request() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_body(&server, "/part/0", &[1u8; 8]).await;
        mount_body(&server, "/part/1", &[2u8; 8]).await;
        mount_body(&server, "/part/2", &[3u8; 5]).await;
        Mock::given(method("GET"))
            .and(path("/part/3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![4u8; 8]))
            .expect(0)
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("video.mp4");
        let segments = (0..4).map(|i| Segment::sized(format!("{}/part/{i}", server.uri()), 8));

        let written = downloader()
            .run(ResourceSpec::new(SegmentList::new(segments), &target))
            .await
            .unwrap();

        assert_eq!(written, 21);
        let mut expected = vec![1u8; 8];
        expected.extend([2u8; 8]);
        expected.extend([3u8; 5]);
        assert_eq!(std::fs::read(&target).unwrap(), expected);
    }

    #[tokio::test]
    async fn test_empty_source_appends_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("audio.mp4");
        std::fs::write(&target, b"already complete").unwrap();

        let written = downloader()
            .run(ResourceSpec::new(SegmentList::default(), &target))
            .await
            .unwrap();

        assert_eq!(written, 0);
        assert_eq!(std::fs::read(&target).unwrap(), b"already complete");
    }

    #[tokio::test]
    async fn test_existing_bytes_are_preserved_on_resume() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_body(&server, "/seg-3.m4s", b"-tail").await;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("video.mp4");
        std::fs::write(&target, b"head").unwrap();

        let source = SegmentList::new([Segment::new(format!("{}/seg-3.m4s", server.uri()))]);
        downloader().run(ResourceSpec::new(source, &target)).await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"head-tail");
    }

    #[tokio::test]
    async fn test_http_error_aborts_and_keeps_written_bytes() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_body(&server, "/seg-1.m4s", b"first").await;
        Mock::given(method("GET"))
            .and(path("/seg-2.m4s"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/seg-3.m4s"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"third".to_vec()))
            .expect(0)
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("video.mp4");
        let source = SegmentList::new(
            (1..=3).map(|i| Segment::new(format!("{}/seg-{i}.m4s", server.uri()))),
        );

        let result = downloader().run(ResourceSpec::new(source, &target)).await;

        match result {
            Err(DownloadError::HttpStatus { status, .. }) => assert_eq!(status, 403),
            other => panic!("Expected HttpStatus error, got: {other:?}"),
        }
        assert_eq!(std::fs::read(&target).unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_empty_packet_ends_transfer_without_writing() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_body(&server, "/range/0", b"payload").await;
        mount_body(&server, "/range/1", b"").await;
        Mock::given(method("GET"))
            .and(path("/range/2"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"never".to_vec()))
            .expect(0)
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("audio.mp4");
        let source = SegmentList::new(
            (0..3).map(|i| Segment::new(format!("{}/range/{i}", server.uri()))),
        );

        let written = downloader().run(ResourceSpec::new(source, &target)).await.unwrap();

        assert_eq!(written, 7);
        assert_eq!(std::fs::read(&target).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_content_range_length_is_reported_to_source() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/chunk"))
            .respond_with(
                ResponseTemplate::new(206)
                    .insert_header("Content-Range", "bytes 0-3/100")
                    .set_body_bytes(b"abcd".to_vec()),
            )
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("video.mp4");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let source = RecordingSource {
            inner: SegmentList::new([
                Segment::new(format!("{}/chunk", server.uri())),
                Segment::new(format!("{}/chunk", server.uri())),
            ]),
            seen: Arc::clone(&seen),
        };

        downloader().run(ResourceSpec::new(source, &target)).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![None, Some(4), Some(4)]);
    }
}
