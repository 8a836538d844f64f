//! Per-video acquisition: from a page URL to one muxed file.
//!
//! # Architecture
//!
//! [`Acquisition`] drives a [`PageAdapter`] through these phases:
//!
//! 1. Open the page, check access restrictions and follow cross-origin
//!    redirects through the [`LoaderRegistry`]
//! 2. Pick the output path and refuse to clobber an existing file
//! 3. Negotiate the target quality with [`QualityResolver`]
//! 4. Resolve a [`MediaSpec`] (adapter, manifest or resource timing)
//! 5. Download audio, then video, with the [`SegmentedDownloader`]
//! 6. Merge both tracks with the [`Muxer`]
//!
//! Track files live in a scratch directory next to the output, removed
//! when the acquisition ends.
//!
//! # Example
//!
//! ```no_run
//! use vidloader_core::acquire::Acquisition;
//! use vidloader_core::config::AcquireOptions;
//! use vidloader_core::mux::{FfmpegMuxer, FfprobeProbe};
//! use vidloader_core::page::DashPageFactory;
//! use vidloader_core::resolver::LoaderRegistry;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = LoaderRegistry::new();
//! registry.register("cdn.example.com", Box::new(DashPageFactory));
//! let muxer = FfmpegMuxer::from_path()?;
//! let probe = FfprobeProbe::from_path()?;
//!
//! let acquisition = Acquisition::new(&registry, AcquireOptions::default(), &muxer, &probe);
//! let saved = acquisition.run_url("https://cdn.example.com/v/manifest.mpd").await?;
//! println!("saved {}", saved.display());
//! # Ok(())
//! # }
//! ```

mod error;
pub mod output;

pub use error::AcquireError;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::config::{AcquireOptions, ConfigError};
use crate::download::{HttpClient, SegmentedDownloader, ThrottledTransport};
use crate::media::MediaSpec;
use crate::mux::{MediaProbe, Muxer};
use crate::page::{MediaLocator, PageAdapter, PageError};
use crate::resolver::{
    DEFAULT_POLL_INTERVAL, DirectSourceResolver, LoaderRegistry, ManifestResolver, QualityResolver,
    QualitySet, RedirectRouter, ResolveError, Route,
};

/// Result of acquiring one video of a playlist.
#[derive(Debug)]
pub struct VideoOutcome {
    /// The video page URL.
    pub url: String,
    /// Saved file, or why the video failed.
    pub result: Result<PathBuf, AcquireError>,
}

impl VideoOutcome {
    /// Returns true if the video was saved.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Orchestrates the acquisition of videos with one set of options.
pub struct Acquisition<'a> {
    registry: &'a LoaderRegistry,
    options: AcquireOptions,
    muxer: &'a dyn Muxer,
    probe: &'a dyn MediaProbe,
    poll_interval: Duration,
}

impl<'a> Acquisition<'a> {
    /// Creates an acquisition routing redirects through `registry`.
    #[must_use]
    pub fn new(
        registry: &'a LoaderRegistry,
        options: AcquireOptions,
        muxer: &'a dyn Muxer,
        probe: &'a dyn MediaProbe,
    ) -> Self {
        Self {
            registry,
            options,
            muxer,
            probe,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Overrides the resource-timing poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Returns the options every loader receives.
    #[must_use]
    pub fn options(&self) -> &AcquireOptions {
        &self.options
    }

    /// Acquires `url` with a loader chosen from the registry.
    ///
    /// # Errors
    ///
    /// `Resolve(LoaderNotFound)` if no loader serves the host, otherwise see
    /// [`run`](Self::run).
    pub async fn run_url(&self, url: &str) -> Result<PathBuf, AcquireError> {
        let factory = self.registry.find_for_url(url)?;
        let page = factory.create(&self.options)?;
        self.run(page, url).await
    }

    /// Acquires the video at `url` using `adapter`, returning the saved file.
    ///
    /// # Errors
    ///
    /// - `Config` if the options are invalid
    /// - `AccessRestricted` if the page refuses playback
    /// - `FileExists` if the output exists and overwriting is off
    /// - `Resolve` for quality, media or redirect failures
    /// - `Page`, `Download`, `Mux` or `Io` when a phase fails
    #[instrument(skip(self, adapter), fields(loader = adapter.name()))]
    pub async fn run(
        &self,
        adapter: Box<dyn PageAdapter>,
        url: &str,
    ) -> Result<PathBuf, AcquireError> {
        self.options.validate()?;
        let (mut page, page_url) = self.open_canonical(adapter, url).await?;

        let title = match self.within("title", page.title()).await {
            Ok(title) => title,
            Err(error) => {
                warn!(error = %error, "could not read the title");
                None
            }
        };
        let output = output::resolve_output_path(&self.options.output_path, title.as_deref());
        output::check_output(&output, self.options.overwrite)?;

        if let Err(error) = self.within("disable_autoplay", page.disable_autoplay()).await {
            warn!(error = %error, "could not disable autoplay");
        }

        let qualities = self.within("qualities", page.qualities()).await?;
        let target =
            QualityResolver::new(self.options.quality, self.options.exact).resolve(&qualities)?;
        info!(url = %page_url, target, available = ?qualities, "quality selected");

        let directory = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        tokio::fs::create_dir_all(directory)
            .await
            .map_err(|e| AcquireError::io(directory, e))?;
        let scratch = tempfile::Builder::new()
            .prefix(".vidloader-")
            .tempdir_in(directory)
            .map_err(|e| AcquireError::io(directory, e))?;

        let session = self.within("session", page.session()).await?;
        let client = HttpClient::with_session(
            &session,
            self.options.connect_timeout_secs,
            self.options.read_timeout_secs,
        )?;
        let transport = ThrottledTransport::new(self.options.throttle_config()?);

        let MediaSpec { audio, video } = self
            .resolve_media(
                page.as_mut(),
                &client,
                &transport,
                &qualities,
                target,
                scratch.path(),
            )
            .await?;
        let audio_path = audio.target.clone();
        let video_path = video.target.clone();

        let downloader = SegmentedDownloader::new(client, transport);
        let audio_bytes = downloader.run(audio).await?;
        let video_bytes = downloader.run(video).await?;
        info!(audio_bytes, video_bytes, "tracks downloaded");

        let output = if self.options.overwrite {
            output
        } else {
            output::collision_free(&output)
        };
        self.muxer.mux(&audio_path, &video_path, &output).await?;
        info!(output = %output.display(), "video saved");
        Ok(output)
    }

    /// Acquires every video of the playlist at `url`, continuing past failures.
    ///
    /// A page without a playlist is acquired as a single video.
    ///
    /// # Errors
    ///
    /// Fails only if the playlist page itself cannot be read or a playlist
    /// is paired with a file output path. Per-video errors are reported in
    /// the returned outcomes.
    #[instrument(skip(self, adapter), fields(loader = adapter.name()))]
    pub async fn run_playlist(
        &self,
        mut adapter: Box<dyn PageAdapter>,
        url: &str,
    ) -> Result<Vec<VideoOutcome>, AcquireError> {
        self.options.validate()?;
        adapter.open(url).await?;
        let urls = self.within("playlist", adapter.playlist()).await?;

        if urls.is_empty() {
            debug!("page is not a playlist");
            let result = self.run(adapter, url).await;
            return Ok(vec![VideoOutcome {
                url: url.to_string(),
                result,
            }]);
        }

        let output = &self.options.output_path;
        if output.extension().is_some() && !output.is_dir() {
            return Err(ConfigError::invalid(
                "output_path",
                format!("{} is a file, a playlist needs a directory", output.display()),
            )
            .into());
        }

        info!(videos = urls.len(), "playlist found");
        let mut outcomes = Vec::with_capacity(urls.len());
        for (index, video_url) in urls.into_iter().enumerate() {
            let result = self.run_url(&video_url).await;
            match &result {
                Ok(path) => info!(index, path = %path.display(), "playlist video saved"),
                Err(error) => warn!(index, url = %video_url, error = %error, "playlist video failed, continuing"),
            }
            outcomes.push(VideoOutcome {
                url: video_url,
                result,
            });
        }
        Ok(outcomes)
    }

    /// Opens `url`, following cross-origin redirects to the canonical page.
    async fn open_canonical(
        &self,
        adapter: Box<dyn PageAdapter>,
        url: &str,
    ) -> Result<(Box<dyn PageAdapter>, String), AcquireError> {
        let router = RedirectRouter::new(self.registry);
        let mut page = adapter;
        let mut current = url.to_string();
        let mut redirects: usize = 0;

        loop {
            debug!(url = %current, loader = page.name(), "opening page");
            page.open(&current).await?;

            if let Some(message) = self
                .within("check_restrictions", page.check_restrictions())
                .await?
            {
                return Err(AcquireError::access_restricted(message));
            }

            let source = self.within("source_url", page.source_url()).await?;
            match router.route(&current, source.as_deref())? {
                Route::Stay => return Ok((page, current)),
                Route::Redirect { url: next, factory } => {
                    redirects += 1;
                    if redirects > self.options.max_redirects {
                        return Err(ResolveError::too_many_redirects(url, redirects).into());
                    }
                    page = factory.create(&self.options)?;
                    current = next;
                }
            }
        }
    }

    async fn resolve_media(
        &self,
        page: &mut dyn PageAdapter,
        client: &HttpClient,
        transport: &ThrottledTransport,
        qualities: &QualitySet,
        target: u32,
        scratch: &Path,
    ) -> Result<MediaSpec, AcquireError> {
        let locator = self
            .within("resolve_media", page.resolve_media(target, scratch))
            .await?;
        match locator {
            MediaLocator::Resolved(spec) => {
                debug!("adapter resolved media");
                Ok(spec)
            }
            MediaLocator::Manifest { url } => {
                debug!(manifest = %url, "resolving from manifest");
                let text = client.fetch_text(&url).await?;
                let manifest = ManifestResolver::parse(&text, &url)?;
                Ok(manifest.media_spec(target, scratch)?)
            }
            MediaLocator::ResourceTiming => {
                debug!("resolving from resource timing");
                let resolver = DirectSourceResolver::new(
                    client,
                    transport,
                    self.probe,
                    self.options.chunk_size_bytes(),
                )
                .with_poll_interval(self.poll_interval);
                let spec = resolver
                    .resolve(page, qualities.len(), target, scratch, self.options.timeout)
                    .await?;
                Ok(spec)
            }
        }
    }

    /// Bounds one page interaction by the discovery timeout.
    async fn within<T, F>(&self, operation: &'static str, future: F) -> Result<T, PageError>
    where
        F: Future<Output = Result<T, PageError>>,
    {
        let limit = self.options.timeout;
        tokio::time::timeout(limit, future)
            .await
            .map_err(|_| PageError::timeout(operation, limit))?
    }
}
