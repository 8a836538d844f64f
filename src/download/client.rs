//! HTTP client wrapper for fetching segments, manifests and probe files.
//!
//! Signed media URLs are only honoured for the session that obtained them,
//! so the client is normally built from the page's [`SessionInfo`]: the same
//! User-Agent and the same cookies.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::cookie::Jar;
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, HeaderMap};
use reqwest::{Client, ClientBuilder};
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, instrument, warn};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use super::throttle::ThrottledTransport;
use crate::page::{SessionCookie, SessionInfo};
use crate::user_agent;

/// HTTP client for segment transfers.
///
/// Created once per acquisition and reused for every request, taking
/// advantage of connection pooling.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

/// A file fetched in full, e.g. a probe sample.
#[derive(Debug, Clone)]
pub struct FetchedFile {
    /// Where the body was written.
    pub path: PathBuf,
    /// Number of bytes written.
    pub bytes_written: u64,
    /// `Content-Type` header value, if present.
    pub content_type: Option<String>,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts and no session.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_session(&SessionInfo::default(), CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
            .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a client that shares the page session's User-Agent and cookies.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::Network` if the underlying client cannot be built.
    #[instrument(level = "debug", skip(session), fields(cookies = session.cookies.len()))]
    pub fn with_session(
        session: &SessionInfo,
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, DownloadError> {
        let user_agent = session
            .user_agent
            .clone()
            .unwrap_or_else(user_agent::default_download_user_agent);
        debug!(user_agent = %user_agent, "building HTTP client");

        let jar = session_cookie_jar(&session.cookies);
        let client = base_client_builder(jar, &user_agent, connect_timeout_secs, read_timeout_secs)
            .build()
            .map_err(|e| DownloadError::network("<client builder>", e))?;
        Ok(Self { client })
    }

    /// Sends a GET request and rejects any status outside 200..=299.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl`, `Timeout`, `Network` or `HttpStatus`.
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn get(&self, url: &str) -> Result<reqwest::Response, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e))?;

        let status = response.status();
        debug!(status = status.as_u16(), headers = ?response.headers(), "response received");

        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }
        Ok(response)
    }

    /// Fetches `url` as text (manifest documents).
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get), plus `Network` if the body cannot be read.
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn fetch_text(&self, url: &str) -> Result<String, DownloadError> {
        let response = self.get(url).await?;
        response
            .text()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e))
    }

    /// Fetches `url` in full and writes it to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get), plus `Io` on write failures.
    #[instrument(skip(self, transport), fields(url = %url, path = %path.display()))]
    pub async fn fetch_to_file(
        &self,
        url: &str,
        path: &Path,
        transport: &ThrottledTransport,
    ) -> Result<FetchedFile, DownloadError> {
        let response = self.get(url).await?;
        let content_type = header_str(response.headers(), CONTENT_TYPE.as_str()).map(str::to_string);

        let file = File::create(path)
            .await
            .map_err(|e| DownloadError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        let bytes_written = stream_body(response, transport, &mut writer, url, path).await?;
        writer.flush().await.map_err(|e| DownloadError::io(path, e))?;

        debug!(bytes = bytes_written, "file fetched");
        Ok(FetchedFile {
            path: path.to_path_buf(),
            bytes_written,
            content_type,
        })
    }
}

/// Streams a response body through `transport` into `writer`, returning bytes written.
pub(crate) async fn stream_body<W>(
    response: reqwest::Response,
    transport: &ThrottledTransport,
    writer: &mut W,
    url: &str,
    path: &Path,
) -> Result<u64, DownloadError>
where
    W: AsyncWrite + Unpin,
{
    let mut stream = transport.throttle(response.bytes_stream());
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| DownloadError::from_reqwest(url, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(path, e))?;
        bytes_written += chunk.len() as u64;
    }

    Ok(bytes_written)
}

/// Declared length of a response packet.
///
/// `Content-Range: bytes <start>-<end>/<total>` is inclusive and yields
/// `end - start + 1`;
/// otherwise a (possibly negative) `Content-Length` is used. `None` means the
/// length is only known after reading the body.
#[must_use]
pub fn declared_packet_length(headers: &HeaderMap) -> Option<i64> {
    if let Some(range) = header_str(headers, CONTENT_RANGE.as_str()) {
        match parse_content_range(range) {
            Some((start, end)) => return Some(end - start + 1),
            None => warn!(content_range = %range, "unparseable Content-Range header"),
        }
    }

    header_str(headers, CONTENT_LENGTH.as_str()).and_then(|v| v.trim().parse::<i64>().ok())
}

/// Parses `bytes <start>-<end>/<total>` into `(start, end)`.
fn parse_content_range(value: &str) -> Option<(i64, i64)> {
    let range = value.trim().strip_prefix("bytes")?.trim_start();
    let (span, _total) = range.split_once('/')?;
    let (start, end) = span.split_once('-')?;
    Some((start.trim().parse().ok()?, end.trim().parse().ok()?))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn base_client_builder(
    cookie_jar: Arc<Jar>,
    user_agent: &str,
    connect_timeout_secs: u64,
    read_timeout_secs: u64,
) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .timeout(Duration::from_secs(read_timeout_secs))
        .gzip(true)
        .user_agent(user_agent)
        .cookie_provider(cookie_jar)
}

/// Loads page-session cookies into a `reqwest::cookie::Jar`.
fn session_cookie_jar(cookies: &[SessionCookie]) -> Arc<Jar> {
    let jar = Arc::new(Jar::default());

    for cookie in cookies {
        let domain = cookie.domain.strip_prefix('.').unwrap_or(&cookie.domain);
        let scheme = if cookie.secure { "https" } else { "http" };
        let origin = format!("{scheme}://{domain}{}", cookie.path);

        // Browsers report domain cookies with a leading dot; anything else is host-only.
        let mut set_cookie = format!("{}={}; Path={}", cookie.name, cookie.value, cookie.path);
        if cookie.domain.starts_with('.') {
            set_cookie.push_str(&format!("; Domain={}", cookie.domain));
        }
        if cookie.secure {
            set_cookie.push_str("; Secure");
        }

        if let Ok(url) = origin.parse::<Url>() {
            jar.add_cookie_str(&set_cookie, &url);
            debug!(domain = %cookie.domain, name = %cookie.name, "loaded session cookie");
        } else {
            warn!(
                domain = %cookie.domain,
                name = %cookie.name,
                "skipping session cookie with unparseable domain"
            );
        }
    }

    jar
}
