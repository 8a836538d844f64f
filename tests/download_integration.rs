//! Integration tests for byte-range segment transfers.
//!
//! These tests drive a `ByteRangeSegments` source through the
//! `SegmentedDownloader` against a mock server answering range requests.

mod support;

use support::socket_guard::start_mock_server_or_skip;
use tempfile::TempDir;
use vidloader_core::download::{
    DownloadError, HttpClient, SegmentedDownloader, ThrottleConfig, ThrottledTransport,
};
use vidloader_core::media::{ResourceSpec, Segment, SegmentList};
use vidloader_core::resolver::ByteRangeSegments;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const CONTENT: &[u8] = b"0123456789";

/// Serves `CONTENT` in inclusive `bytes=<start>-<end>` pieces, `Content-Range` included.
async fn mount_ranges(server: &MockServer, chunk: usize) {
    let mut start = 0;
    while start < CONTENT.len() {
        let end = (start + chunk).min(CONTENT.len()) - 1;
        Mock::given(method("GET"))
            .and(path("/media"))
            .and(query_param("bytes", format!("{start}-{}", start + chunk - 1)))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(
                        "Content-Range",
                        format!("bytes {start}-{end}/{}", CONTENT.len()),
                    )
                    .set_body_bytes(CONTENT[start..=end].to_vec()),
            )
            .expect(1)
            .mount(server)
            .await;
        start += chunk;
    }
}

/// Answers any `bytes=<a>-<b>` request with `body[a..=b]`, like a CDN would.
///
/// Ranges starting past the end get an empty body.
struct InclusiveRanges(&'static [u8]);

impl Respond for InclusiveRanges {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let range = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "bytes")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();
        let Some((start, end)) = range
            .split_once('-')
            .and_then(|(a, b)| Some((a.parse::<usize>().ok()?, b.parse::<usize>().ok()?)))
        else {
            return ResponseTemplate::new(400);
        };
        if start >= self.0.len() {
            return ResponseTemplate::new(200);
        }
        let end = end.min(self.0.len() - 1);
        ResponseTemplate::new(206)
            .insert_header(
                "Content-Range",
                format!("bytes {start}-{end}/{}", self.0.len()),
            )
            .set_body_bytes(self.0[start..=end].to_vec())
    }
}

fn downloader() -> SegmentedDownloader {
    SegmentedDownloader::new(
        HttpClient::new(),
        ThrottledTransport::new(ThrottleConfig::unlimited()),
    )
}

#[tokio::test]
async fn test_byte_range_transfer_stops_after_short_piece() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_ranges(&server, 4).await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let target = temp_dir.path().join("video.mp4");

    let observed_url = format!("{}/media?type=2&bytes=0-1&sig=abc", server.uri());
    let source = ByteRangeSegments::new(&observed_url, 4).expect("url has a bytes parameter");
    let written = downloader()
        .run(ResourceSpec::new(source, &target))
        .await
        .expect("transfer succeeds");

    assert_eq!(written, CONTENT.len() as u64);
    assert_eq!(std::fs::read(&target).expect("target readable"), CONTENT);
}

#[tokio::test]
async fn test_inclusive_ranges_reassemble_exact_bytes() {
    const BODY: &[u8] = b"0123456789abcdef";
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/media"))
        .respond_with(InclusiveRanges(BODY))
        .mount(&server)
        .await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let target = temp_dir.path().join("video.mp4");

    let observed_url = format!("{}/media?type=2&bytes=0-1", server.uri());
    let source = ByteRangeSegments::new(&observed_url, 4).expect("url has a bytes parameter");
    let written = downloader()
        .run(ResourceSpec::new(source, &target))
        .await
        .expect("transfer succeeds");

    assert_eq!(written, BODY.len() as u64);
    assert_eq!(std::fs::read(&target).expect("target readable"), BODY);

    let requested: Vec<String> = server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .filter_map(|r| {
            r.url
                .query_pairs()
                .find(|(key, _)| key == "bytes")
                .map(|(_, value)| value.into_owned())
        })
        .collect();
    assert_eq!(requested, vec!["0-3", "4-7", "8-11", "12-15", "16-19"]);
}

#[tokio::test]
async fn test_resumed_transfer_appends_after_existing_bytes() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/seg-2.m4s"))
        .respond_with(ResponseTemplate::new(200).set_body_string("second"))
        .mount(&server)
        .await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let target = temp_dir.path().join("audio.mp4");
    std::fs::write(&target, "first|").expect("seed target");

    let remaining = SegmentList::new([Segment::new(format!("{}/seg-2.m4s", server.uri()))]);
    downloader()
        .run(ResourceSpec::new(remaining, &target))
        .await
        .expect("transfer succeeds");

    assert_eq!(std::fs::read_to_string(&target).expect("target readable"), "first|second");
}

#[tokio::test]
async fn test_expired_signature_aborts_with_http_status() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/media"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let target = temp_dir.path().join("video.mp4");

    let source = ByteRangeSegments::new(&format!("{}/media?bytes=0-1", server.uri()), 4)
        .expect("url has a bytes parameter");
    let result = downloader().run(ResourceSpec::new(source, &target)).await;

    match result {
        Err(DownloadError::HttpStatus { status, .. }) => assert_eq!(status, 410),
        other => panic!("Expected HttpStatus, got: {other:?}"),
    }
    assert_eq!(std::fs::metadata(&target).expect("target created").len(), 0);
}
