//! # renderpdf-core
//!
//! Turns Handlebars templates into PDF documents.
//!
//! - **templates**: template lookup by candidate names and Handlebars rendering
//! - **fetcher**: the fetcher that serves static assets and in-process routes
//! - **network**: `data:`, `file://` and `http(s)://` loading
//! - **routes**: a small route table for in-process dispatch
//! - **render**: the [`PdfRenderer`] facade tying it all together
//! - **error**: error types for the pipeline
//!
//! ```ignore
//! let fetcher = StaticFilesUrlFetcher::new(Arc::new(FilesystemStorage::new("collected")));
//! let renderer = PdfRenderer::new(TemplateLoader::new(["templates"]), Arc::new(fetcher));
//! renderer.render_to_file(&RenderRequest::new("invoice.html"), "invoice.pdf")?;
//! ```

// Re-export foundation crates
pub use renderpdf_resource as resource;
pub use renderpdf_traits as traits;

pub mod error;
pub mod fetcher;
pub mod network;
pub mod render;
pub mod routes;
pub mod templates;

pub use error::{PipelineError, TemplateError};
pub use fetcher::{DEFAULT_STATIC_URL, StaticFilesUrlFetcher, StaticLookup, guess_mime_type};
pub use network::DefaultUrlFetcher;
pub use render::{PLACEHOLDER_BASE_URL, PdfRenderer, RenderRequest};
pub use routes::{Params, RouteTable};
pub use templates::{Template, TemplateLoader, TemplateNames};

pub use traits::{
    FetchError, FetchedResource, HtmlDocument, PdfEngine, RenderError, RenderOptions,
    RouteError, RouteResolver, StaticError, StaticFinder, StaticStorage, UrlFetcher,
};
pub use renderpdf_render_lopdf::LopdfEngine;
