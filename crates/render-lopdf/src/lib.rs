//! A small HTML to PDF engine using lopdf.
//!
//! This crate implements the `PdfEngine` trait from renderpdf-traits. It
//! understands enough HTML to turn a rendered template into a readable
//! document: block text with word wrapping and pagination, headings, list
//! items, preformatted text, rules and raster images. Linked stylesheets and
//! images are loaded through the document's `UrlFetcher`.

mod css;
mod html;
mod layout;
mod options;
mod renderer;
mod text;

pub use options::PageSetup;
pub use renderer::LopdfEngine;
