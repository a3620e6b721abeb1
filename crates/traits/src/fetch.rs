//! The `UrlFetcher` trait used by the PDF engine to load linked resources.
//!
//! Every `<img>`, stylesheet or other URL referenced by the HTML being
//! converted is handed to a fetcher, which returns the raw bytes and the
//! MIME type (when one can be determined).

use thiserror::Error;

use crate::routing::RouteError;
use crate::staticfiles::StaticError;

/// Error type for resource fetching.
#[derive(Error, Debug)]
pub enum FetchError {
    /// A site-relative URL matched neither a static asset nor a route.
    #[error("Relative URL '{0}' did not match any static file or route")]
    UnresolvableRelativeUrl(String),

    #[error("Static file error: {0}")]
    Static(#[from] StaticError),

    #[error("Route dispatch failed: {0}")]
    Route(#[from] RouteError),

    #[error("Network request for '{url}' failed: {message}")]
    Network { url: String, message: String },

    #[error("Unsupported URL scheme in '{0}'")]
    UnsupportedScheme(String),

    #[error("Malformed URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The bytes behind a URL, plus the MIME type if one could be determined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResource {
    pub content: Vec<u8>,
    pub mime_type: Option<String>,
}

impl FetchedResource {
    pub fn new(content: impl Into<Vec<u8>>, mime_type: Option<String>) -> Self {
        Self {
            content: content.into(),
            mime_type,
        }
    }
}

/// Loads the resource behind a URL.
///
/// Implementations must not mutate state they don't own; a fetch may read
/// local files, dispatch an in-process request or hit the network, and
/// blocks the calling thread while doing so.
///
/// Plain functions and closures with the right signature are fetchers too:
///
/// ```ignore
/// let fetcher = |url: &str| -> Result<FetchedResource, FetchError> {
///     Ok(FetchedResource::new(b"".to_vec(), None))
/// };
/// engine.write_pdf(HtmlDocument::new(html, "not-used://", &fetcher), &mut out, &options)?;
/// ```
pub trait UrlFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<FetchedResource, FetchError>;
}

impl<F> UrlFetcher for F
where
    F: Fn(&str) -> Result<FetchedResource, FetchError> + Send + Sync,
{
    fn fetch(&self, url: &str) -> Result<FetchedResource, FetchError> {
        self(url)
    }
}
