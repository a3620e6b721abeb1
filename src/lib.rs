//! # renderpdf
//!
//! Renders Handlebars templates to PDF and serves them over HTTP.
//!
//! The heavy lifting lives in the workspace crates; this crate wires them
//! into an application:
//! - **config**: [`Settings`] loaded from TOML and `RENDERPDF__*` variables
//! - **routing**: an axum `Router` used as the in-process route resolver
//! - **view**: an axum handler that answers with a PDF (or its HTML)

// Re-export workspace crates
pub use renderpdf_core as core;
pub use renderpdf_render_lopdf as render_lopdf;
pub use renderpdf_resource as resource;
pub use renderpdf_traits as traits;

pub mod config;
pub mod routing;
pub mod view;

pub use config::{Settings, SettingsError};
pub use routing::AxumRouteResolver;
pub use view::{ContextSource, PdfView, ResponseMode, ViewError, pdf_route};

pub use renderpdf_core::{
    DefaultUrlFetcher, PdfRenderer, PipelineError, RenderRequest, RouteTable,
    StaticFilesUrlFetcher, TemplateError, TemplateLoader, TemplateNames,
};
pub use renderpdf_traits::{FetchError, FetchedResource, RenderOptions, UrlFetcher};
