//! Fallback resolution from observed byte-range fetches.
//!
//! Pages without a published manifest request every (quality tier × media
//! kind) pair as a `bytes=0-...` fetch. Those requests show up in the
//! resource-timing log grouped by their `type` query parameter; each group
//! is probed to find the one carrying the target video quality.

use std::path::Path;
use std::time::Duration;

use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::ResolveError;
use crate::download::{HttpClient, ThrottledTransport};
use crate::media::{MediaKind, MediaSpec, ResourceSpec, Segment, SegmentSource};
use crate::mux::MediaProbe;
use crate::page::{PageAdapter, ResourceEntry};

/// Pause between two looks at the resource-timing log.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Distinct byte-range URLs grouped by their `type` parameter, in observation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteRangeGroups {
    groups: Vec<(String, Vec<String>)>,
}

impl ByteRangeGroups {
    /// Collects byte-range fetches from a resource-timing log.
    ///
    /// # Errors
    ///
    /// Returns `AmbiguousSources` if a manifest request was observed as well.
    pub fn from_entries(entries: &[ResourceEntry]) -> Result<Self, ResolveError> {
        let mut groups = Self::default();
        let mut manifest_url = None;

        for entry in entries {
            let Ok(url) = Url::parse(&entry.name) else {
                continue;
            };
            if url.path().ends_with(".mpd") {
                manifest_url.get_or_insert_with(|| entry.name.clone());
                continue;
            }
            if entry.initiator_type != "fetch" {
                continue;
            }

            let mut bytes = None;
            let mut group = None;
            for (key, value) in url.query_pairs() {
                match key.as_ref() {
                    "bytes" => bytes = Some(value.into_owned()),
                    "type" => group = Some(value.into_owned()),
                    _ => {}
                }
            }
            if !bytes.is_some_and(|b| b.starts_with('0')) {
                continue;
            }
            let Some(group) = group else {
                debug!(url = %entry.name, "byte-range fetch without type parameter, skipping");
                continue;
            };
            groups.push(group, &entry.name);
        }

        if let Some(manifest_url) = manifest_url
            && groups.url_count() > 0
        {
            return Err(ResolveError::ambiguous_sources(&manifest_url));
        }
        Ok(groups)
    }

    fn push(&mut self, group: String, url: &str) {
        let urls = match self.groups.iter().position(|(name, _)| *name == group) {
            Some(index) => &mut self.groups[index].1,
            None => {
                self.groups.push((group, Vec::new()));
                let last = self.groups.len() - 1;
                &mut self.groups[last].1
            }
        };
        if !urls.iter().any(|u| u == url) {
            urls.push(url.to_string());
        }
    }

    /// Total number of distinct URLs.
    #[must_use]
    pub fn url_count(&self) -> usize {
        self.groups.iter().map(|(_, urls)| urls.len()).sum()
    }

    /// Groups as `(type, urls)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.groups
            .iter()
            .map(|(name, urls)| (name.as_str(), urls.as_slice()))
    }
}

/// Resolves media by probing observed byte-range URLs.
pub struct DirectSourceResolver<'a> {
    client: &'a HttpClient,
    transport: &'a ThrottledTransport,
    probe: &'a dyn MediaProbe,
    chunk_size: u64,
    poll_interval: Duration,
}

impl<'a> DirectSourceResolver<'a> {
    /// Creates a resolver issuing `chunk_size`-byte ranges.
    #[must_use]
    pub fn new(
        client: &'a HttpClient,
        transport: &'a ThrottledTransport,
        probe: &'a dyn MediaProbe,
        chunk_size: u64,
    ) -> Self {
        Self {
            client,
            transport,
            probe,
            chunk_size,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Overrides the resource-timing poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Discovers URLs, then builds plans for the group matching `target`.
    ///
    /// # Errors
    ///
    /// See [`discover`](Self::discover) and [`select`](Self::select).
    pub async fn resolve(
        &self,
        page: &mut dyn PageAdapter,
        quality_count: usize,
        target: u32,
        scratch: &Path,
        timeout: Duration,
    ) -> Result<MediaSpec, ResolveError> {
        let groups = self.discover(page, quality_count, timeout).await?;
        self.select(&groups, target, scratch).await
    }

    /// Polls the page until at least two URLs per advertised quality are seen.
    ///
    /// Playback is replayed between polls so that short videos issue their
    /// requests again.
    ///
    /// # Errors
    ///
    /// - `AmbiguousSources` if a manifest request is observed
    /// - `DiscoveryTimeout` if too few URLs appear within `timeout`
    /// - `Page` if the adapter fails
    #[instrument(skip(self, page), fields(page = page.name()))]
    pub async fn discover(
        &self,
        page: &mut dyn PageAdapter,
        quality_count: usize,
        timeout: Duration,
    ) -> Result<ByteRangeGroups, ResolveError> {
        let required = 2 * quality_count;
        let deadline = Instant::now() + timeout;

        let mut found = 0;
        loop {
            let Ok(entries) = timeout_at(deadline, page.resource_entries()).await else {
                return Err(ResolveError::discovery_timeout(found, required));
            };
            let entries = entries?;
            let groups = ByteRangeGroups::from_entries(&entries)?;
            found = groups.url_count();
            debug!(found, required, entries = entries.len(), "resource-timing log scanned");

            if found >= required && found > 0 {
                return Ok(groups);
            }

            if Instant::now() >= deadline {
                return Err(ResolveError::discovery_timeout(found, required));
            }

            timeout_at(deadline, page.replay())
                .await
                .map_err(|_| ResolveError::discovery_timeout(found, required))??;
            let now = Instant::now();
            if now >= deadline {
                return Err(ResolveError::discovery_timeout(found, required));
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    /// Probes `groups` in order and builds plans from the first one whose
    /// video quality equals `target`.
    ///
    /// # Errors
    ///
    /// - `MimeTypeNotFound` / `InvalidMimeType` for unclassifiable responses
    /// - `MediaNotFound` if no group matches or the match has no audio
    /// - `Transfer` / `Probe` on download or probe failures
    #[instrument(skip(self, groups), fields(groups = groups.groups.len()))]
    pub async fn select(
        &self,
        groups: &ByteRangeGroups,
        target: u32,
        scratch: &Path,
    ) -> Result<MediaSpec, ResolveError> {
        for (group, urls) in groups.iter() {
            let mut audio: Option<(&str, String)> = None;
            let mut video: Option<(&str, String, u32)> = None;

            for (index, url) in urls.iter().enumerate() {
                let probe_path = scratch.join(format!("probe-{index}.type{group}"));
                let fetched = self
                    .client
                    .fetch_to_file(url, &probe_path, self.transport)
                    .await?;
                let content_type = fetched
                    .content_type
                    .ok_or_else(|| ResolveError::mime_type_not_found(url))?;
                let kind = MediaKind::from_mime_type(&content_type)
                    .ok_or_else(|| ResolveError::invalid_mime_type(&content_type))?;

                match kind {
                    MediaKind::Audio => audio = Some((url.as_str(), content_type)),
                    MediaKind::Video => {
                        let (width, height) = self
                            .probe
                            .dimensions(&probe_path)
                            .await
                            .map_err(|e| ResolveError::probe(&probe_path, e.to_string()))?;
                        let quality = width.min(height);
                        debug!(group, quality, width, height, "video probed");
                        video = Some((url.as_str(), content_type, quality));
                    }
                }
            }

            let Some((video_url, video_type, _)) = video.filter(|(_, _, q)| *q == target) else {
                continue;
            };
            let (audio_url, audio_type) =
                audio.ok_or_else(|| ResolveError::media_not_found(MediaKind::Audio, target))?;
            info!(group, target, "matched byte-range group");

            return Ok(MediaSpec {
                audio: ResourceSpec::new(
                    ByteRangeSegments::new(audio_url, self.chunk_size)?,
                    scratch.join(track_file_name(&audio_type)),
                ),
                video: ResourceSpec::new(
                    ByteRangeSegments::new(video_url, self.chunk_size)?,
                    scratch.join(track_file_name(&video_type)),
                ),
            });
        }

        Err(ResolveError::media_not_found(MediaKind::Video, target))
    }
}

/// `video/mp4` → `video.mp4`.
fn track_file_name(content_type: &str) -> String {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    essence.replacen('/', ".", 1)
}

/// Lazy source of consecutive `bytes=<start>-<end>` requests against one URL.
///
/// Ranges are inclusive: a chunk of `n` bytes starting at `s` is requested
/// as `bytes=s-(s+n-1)` and the next one starts at `s+n`.
#[derive(Debug, Clone)]
pub struct ByteRangeSegments {
    prefix: String,
    params: Vec<String>,
    bytes_index: usize,
    chunk_size: u64,
    next_start: u64,
    started: bool,
    finished: bool,
}

impl ByteRangeSegments {
    /// Creates a source over `url`, which must carry a `bytes` query parameter.
    ///
    /// # Errors
    ///
    /// Returns `InvalidManifest` if the URL has no `bytes` parameter or the
    /// chunk size is zero.
    pub fn new(url: &str, chunk_size: u64) -> Result<Self, ResolveError> {
        if chunk_size == 0 {
            return Err(ResolveError::invalid_manifest("byte-range chunk size must be positive"));
        }
        let (prefix, query) = url.split_once('?').unwrap_or((url, ""));
        let params: Vec<String> = query.split('&').map(str::to_string).collect();
        let bytes_index = params
            .iter()
            .position(|p| p.starts_with("bytes="))
            .ok_or_else(|| {
                ResolveError::invalid_manifest(format!("no bytes parameter in '{url}'"))
            })?;

        Ok(Self {
            prefix: prefix.to_string(),
            params,
            bytes_index,
            chunk_size,
            next_start: 0,
            started: false,
            finished: false,
        })
    }

    fn url_for(&self, start: u64) -> String {
        let mut params = self.params.clone();
        params[self.bytes_index] = format!("bytes={start}-{}", start + self.chunk_size - 1);
        format!("{}?{}", self.prefix, params.join("&"))
    }
}

impl SegmentSource for ByteRangeSegments {
    fn next_segment(&mut self, previous: Option<u64>) -> Option<Segment> {
        if self.finished {
            return None;
        }
        if self.started {
            match previous {
                Some(observed) if observed >= self.chunk_size => {
                    self.next_start += self.chunk_size;
                }
                Some(_) => {
                    self.finished = true;
                    return None;
                }
                None => {
                    warn!(prefix = %self.prefix, "no content length observed, ending byte-range source");
                    self.finished = true;
                    return None;
                }
            }
        }
        self.started = true;
        Some(Segment::sized(self.url_for(self.next_start), self.chunk_size))
    }
}
