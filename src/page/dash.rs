//! Browser-less adapter for hosts that publish a plain MPD manifest URL.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{MediaLocator, PageAdapter, PageError, SessionInfo};
use crate::config::AcquireOptions;
use crate::download::HttpClient;
use crate::resolver::{LoaderFactory, ManifestResolver, QualitySet, mpd};

/// Treats the page URL as the manifest itself.
#[derive(Debug, Clone)]
pub struct DashPage {
    client: HttpClient,
    opened: Option<Opened>,
}

#[derive(Debug, Clone)]
struct Opened {
    url: String,
    manifest: ManifestResolver,
    title: Option<String>,
}

impl DashPage {
    /// Creates an adapter fetching manifests with `client`.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            opened: None,
        }
    }

    fn opened(&self) -> Result<&Opened, PageError> {
        self.opened.as_ref().ok_or(PageError::NotOpen)
    }
}

#[async_trait]
impl PageAdapter for DashPage {
    fn name(&self) -> &str {
        "dash"
    }

    #[instrument(skip(self))]
    async fn open(&mut self, url: &str) -> Result<(), PageError> {
        let text = self.client.fetch_text(url).await?;
        let manifest = ManifestResolver::parse(&text, url)
            .map_err(|e| PageError::navigation(url, e.to_string()))?;
        let title = program_title(&text);
        debug!(title = ?title, "manifest opened");
        self.opened = Some(Opened {
            url: url.to_string(),
            manifest,
            title,
        });
        Ok(())
    }

    async fn title(&mut self) -> Result<Option<String>, PageError> {
        Ok(self.opened()?.title.clone())
    }

    async fn qualities(&mut self) -> Result<QualitySet, PageError> {
        self.opened()?
            .manifest
            .video_qualities()
            .map_err(|e| PageError::content(e.to_string()))
    }

    async fn source_url(&mut self) -> Result<Option<String>, PageError> {
        Ok(Some(self.opened()?.url.clone()))
    }

    /// Plans both tracks from the manifest read by [`open`](Self::open).
    async fn resolve_media(&mut self, target: u32, scratch: &Path) -> Result<MediaLocator, PageError> {
        let spec = self
            .opened()?
            .manifest
            .media_spec(target, scratch)
            .map_err(|e| PageError::content(e.to_string()))?;
        Ok(MediaLocator::Resolved(spec))
    }

    async fn session(&mut self) -> Result<SessionInfo, PageError> {
        Ok(SessionInfo::default())
    }
}

/// `ProgramInformation/Title` of a manifest, if present.
fn program_title(text: &str) -> Option<String> {
    let root = mpd::parse_document(&mpd::strip_root_attributes(text).ok()?).ok()?;
    let title = root.child("ProgramInformation")?.child("Title")?.text();
    (!title.is_empty()).then(|| title.to_string())
}

/// [`LoaderFactory`] producing [`DashPage`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct DashPageFactory;

impl LoaderFactory for DashPageFactory {
    fn name(&self) -> &str {
        "dash"
    }

    fn create(&self, options: &AcquireOptions) -> Result<Box<dyn PageAdapter>, PageError> {
        let client = HttpClient::with_session(
            &SessionInfo::default(),
            options.connect_timeout_secs,
            options.read_timeout_secs,
        )?;
        Ok(Box::new(DashPage::new(client)))
    }
}
