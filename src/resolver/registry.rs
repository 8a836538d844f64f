//! Loader registry and cross-origin redirect routing.
//!
//! The [`LoaderRegistry`] maps host suffixes to [`LoaderFactory`]s. When a
//! page embeds its video from a different origin, the [`RedirectRouter`]
//! picks the factory responsible for that origin so acquisition can continue
//! with a fresh loader at the canonical URL.

use tracing::{debug, warn};
use url::Url;

use super::ResolveError;
use crate::config::AcquireOptions;
use crate::page::{PageAdapter, PageError};

/// Creates page adapters for one site.
pub trait LoaderFactory: Send + Sync {
    /// Factory name for logs (e.g., "dash").
    fn name(&self) -> &str;

    /// Creates a new adapter configured with `options`.
    ///
    /// # Errors
    ///
    /// Returns `PageError` if the adapter cannot be set up.
    fn create(&self, options: &AcquireOptions) -> Result<Box<dyn PageAdapter>, PageError>;
}

/// Host-suffix → loader-factory table.
///
/// Lookups pick the longest registered suffix that matches the host on a
/// label boundary, so `video.example.com` wins over `example.com`.
pub struct LoaderRegistry {
    entries: Vec<(String, Box<dyn LoaderFactory>)>,
}

impl LoaderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers `factory` for hosts equal to or ending in `.suffix`.
    #[tracing::instrument(skip(self, factory), fields(factory_name = factory.name()))]
    pub fn register(&mut self, suffix: &str, factory: Box<dyn LoaderFactory>) {
        let suffix = suffix.trim_start_matches('.').to_ascii_lowercase();
        if self.entries.iter().any(|(existing, _)| *existing == suffix) {
            warn!(suffix = %suffix, "replacing loader already registered for suffix");
            self.entries.retain(|(existing, _)| *existing != suffix);
        }
        debug!(suffix = %suffix, "Registering loader");
        self.entries.push((suffix, factory));
    }

    /// Returns the number of registered loaders.
    #[must_use]
    pub fn loader_count(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no loaders are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Factory for `host`, by longest matching suffix.
    #[must_use]
    pub fn find(&self, host: &str) -> Option<&dyn LoaderFactory> {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.entries
            .iter()
            .filter(|(suffix, _)| {
                host == *suffix
                    || host
                        .strip_suffix(suffix.as_str())
                        .is_some_and(|rest| rest.ends_with('.'))
            })
            .max_by_key(|(suffix, _)| suffix.len())
            .map(|(_, factory)| factory.as_ref())
    }

    /// Factory for the host of `url`.
    ///
    /// # Errors
    ///
    /// Returns `LoaderNotFound` if the URL has no host or no loader serves it.
    pub fn find_for_url(&self, url: &str) -> Result<&dyn LoaderFactory, ResolveError> {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .ok_or_else(|| ResolveError::loader_not_found(url))?;
        self.find(&host)
            .ok_or_else(|| ResolveError::loader_not_found(&host))
    }
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let loaders: Vec<(&str, &str)> = self
            .entries
            .iter()
            .map(|(suffix, factory)| (suffix.as_str(), factory.name()))
            .collect();
        f.debug_struct("LoaderRegistry")
            .field("loader_count", &self.entries.len())
            .field("loaders", &loaders)
            .finish()
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of comparing a page URL with its canonical video source.
pub enum Route<'r> {
    /// Same origin; continue with the current loader.
    Stay,
    /// Different origin; continue at `url` with a loader from `factory`.
    Redirect {
        /// Canonical source URL.
        url: String,
        /// Factory serving the canonical origin.
        factory: &'r dyn LoaderFactory,
    },
}

impl std::fmt::Debug for Route<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stay => f.write_str("Stay"),
            Self::Redirect { url, factory } => f
                .debug_struct("Redirect")
                .field("url", url)
                .field("factory", &factory.name())
                .finish(),
        }
    }
}

/// Decides whether acquisition must move to another loader.
#[derive(Debug, Clone, Copy)]
pub struct RedirectRouter<'r> {
    registry: &'r LoaderRegistry,
}

impl<'r> RedirectRouter<'r> {
    /// Creates a router over `registry`.
    #[must_use]
    pub fn new(registry: &'r LoaderRegistry) -> Self {
        Self { registry }
    }

    /// Compares the origins of `page_url` and `source_url`.
    ///
    /// # Errors
    ///
    /// - `VideoSourceNotFound` if the page has no source URL
    /// - `LoaderNotFound` if the source origin differs and no loader serves it
    #[tracing::instrument(skip(self))]
    pub fn route(&self, page_url: &str, source_url: Option<&str>) -> Result<Route<'r>, ResolveError> {
        let source_url = source_url
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ResolveError::video_source_not_found(page_url))?;

        let page_origin = Url::parse(page_url).map(|u| u.origin());
        let source_origin = Url::parse(source_url).map(|u| u.origin());
        let same_origin = matches!((&page_origin, &source_origin), (Ok(a), Ok(b)) if a == b);
        if same_origin {
            debug!("video source shares the page origin");
            return Ok(Route::Stay);
        }

        let factory = self.registry.find_for_url(source_url)?;
        warn!(
            source = %source_url,
            loader = factory.name(),
            "Redirecting to the video source"
        );
        Ok(Route::Redirect {
            url: source_url.to_string(),
            factory,
        })
    }
}
