//! Error types for template selection and the render pipeline.

use crate::templates::TemplateNames;
use renderpdf_traits::RenderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("None of the templates {0} exist")]
    NotFound(TemplateNames),

    #[error("Failed to read template '{name}': {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render template '{name}': {message}")]
    Render { name: String, message: String },
}

/// The main error enum for a full template-to-PDF render.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Rendering error: {0}")]
    Render(#[from] RenderError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
