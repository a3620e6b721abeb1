//! The PDF engine seam.

use std::io::Write;
use thiserror::Error;

use crate::fetch::{FetchError, UrlFetcher};
use crate::options::RenderOptions;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load resource '{url}': {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("Failed to parse HTML: {0}")]
    Html(String),

    #[error("Unknown render option '{0}'")]
    UnknownOption(String),

    #[error("Invalid value for render option '{key}': {message}")]
    InvalidOption { key: String, message: String },

    #[error("PDF generation error: {0}")]
    Pdf(String),
}

/// An HTML string ready for conversion, plus how to load what it links to.
pub struct HtmlDocument<'a> {
    pub html: &'a str,
    /// URL that relative references are resolved against. Engines only
    /// join against hierarchical URLs; anything else leaves references
    /// untouched for the fetcher.
    pub base_url: &'a str,
    pub url_fetcher: &'a dyn UrlFetcher,
}

impl<'a> HtmlDocument<'a> {
    pub fn new(html: &'a str, base_url: &'a str, url_fetcher: &'a dyn UrlFetcher) -> Self {
        Self {
            html,
            base_url,
            url_fetcher,
        }
    }
}

/// Converts HTML into a PDF byte stream.
pub trait PdfEngine: Send + Sync {
    /// Writes the PDF for `document` into `target`.
    ///
    /// `options` are engine-specific and passed through untouched by
    /// callers; engines reject keys or values they don't understand.
    fn write_pdf(
        &self,
        document: HtmlDocument<'_>,
        target: &mut dyn Write,
        options: &RenderOptions,
    ) -> Result<(), RenderError>;

    fn name(&self) -> &'static str;
}
