//! The fetcher that resolves site-relative URLs without a web server.
//!
//! Rendered templates link to `/static/...` assets and sometimes to pages
//! of the application itself. [`StaticFilesUrlFetcher`] answers those from
//! the static sources and the route table, and hands everything else to the
//! network fetcher.

use crate::network::DefaultUrlFetcher;
use crate::routes::RouteTable;
use log::{debug, warn};
use renderpdf_traits::{
    FetchError, FetchedResource, NoFinder, RouteResolver, StaticFinder, StaticStorage, UrlFetcher,
    synthetic_request,
};
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_STATIC_URL: &str = "/static/";

/// Outcome of checking a URL against the static sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaticLookup {
    /// A finder located the asset on disk.
    Found(PathBuf),
    /// The storage had the asset.
    Stored(Vec<u8>),
    /// Not a static asset; try the next strategy.
    NotStatic,
}

/// Guesses from the path extension, ignoring query and fragment.
pub fn guess_mime_type(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

pub struct StaticFilesUrlFetcher {
    static_url: String,
    finder: Arc<dyn StaticFinder>,
    storage: Arc<dyn StaticStorage>,
    routes: Arc<dyn RouteResolver>,
    external: Arc<dyn UrlFetcher>,
}

impl std::fmt::Debug for StaticFilesUrlFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticFilesUrlFetcher")
            .field("static_url", &self.static_url)
            .field("finder", &self.finder)
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

impl StaticFilesUrlFetcher {
    /// Creates a fetcher with no finder, no routes and the default network
    /// fetcher for external URLs.
    pub fn new(storage: Arc<dyn StaticStorage>) -> Self {
        Self {
            static_url: DEFAULT_STATIC_URL.to_string(),
            finder: Arc::new(NoFinder),
            storage,
            routes: Arc::new(RouteTable::new()),
            external: Arc::new(DefaultUrlFetcher::default()),
        }
    }

    pub fn with_static_url(mut self, static_url: impl Into<String>) -> Self {
        self.static_url = static_url.into();
        self
    }

    pub fn with_finder(mut self, finder: Arc<dyn StaticFinder>) -> Self {
        self.finder = finder;
        self
    }

    pub fn with_routes(mut self, routes: Arc<dyn RouteResolver>) -> Self {
        self.routes = routes;
        self
    }

    pub fn with_external(mut self, external: Arc<dyn UrlFetcher>) -> Self {
        self.external = external;
        self
    }

    pub fn static_url(&self) -> &str {
        &self.static_url
    }

    /// Decides whether `url` names a static asset.
    ///
    /// The finder is consulted first; on a miss the storage is asked. A
    /// storage that reports the name as missing or invalid means "not
    /// static", any other storage failure is returned.
    pub fn lookup_static(&self, url: &str) -> Result<StaticLookup, FetchError> {
        let Some(rest) = url.strip_prefix(self.static_url.as_str()) else {
            return Ok(StaticLookup::NotStatic);
        };
        let name = rest.split(['?', '#']).next().unwrap_or(rest);

        if let Some(path) = self.finder.find(name) {
            return Ok(StaticLookup::Found(path));
        }

        match self.storage.open(name) {
            Ok(bytes) => Ok(StaticLookup::Stored(bytes)),
            Err(e) if e.is_not_found() => {
                debug!("'{}' is not in static storage ({})", name, e);
                Ok(StaticLookup::NotStatic)
            }
            Err(e) => Err(FetchError::Static(e)),
        }
    }

    fn resolve_route(&self, url: &str) -> Result<FetchedResource, FetchError> {
        let request = synthetic_request(url).map_err(|e| {
            debug!("'{}' is not a routable path: {}", url, e);
            FetchError::UnresolvableRelativeUrl(url.to_string())
        })?;
        match self.routes.dispatch(request)? {
            Some(response) => {
                if !response.status().is_success() {
                    warn!("Route for '{}' answered with {}", url, response.status());
                }
                Ok(FetchedResource::new(response.into_body(), guess_mime_type(url)))
            }
            None => Err(FetchError::UnresolvableRelativeUrl(url.to_string())),
        }
    }
}

impl UrlFetcher for StaticFilesUrlFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedResource, FetchError> {
        match self.lookup_static(url)? {
            StaticLookup::Found(path) => {
                debug!("Serving '{}' from {}", url, path.display());
                let content = std::fs::read(&path)?;
                return Ok(FetchedResource::new(content, guess_mime_type(url)));
            }
            StaticLookup::Stored(content) => {
                debug!("Serving '{}' from static storage", url);
                return Ok(FetchedResource::new(content, guess_mime_type(url)));
            }
            StaticLookup::NotStatic => {}
        }

        if url.starts_with('/') {
            debug!("Dispatching '{}' through the routes", url);
            return self.resolve_route(url);
        }

        debug!("Fetching '{}' externally", url);
        self.external.fetch(url)
    }
}
