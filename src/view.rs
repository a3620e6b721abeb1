//! An axum endpoint that renders a template to PDF.
//!
//! ```ignore
//! let view = PdfView::new(renderer)
//!     .template_name("reports/summary.html")
//!     .prompt_download(true)
//!     .download_name("summary.pdf");
//! let app = Router::new().merge(pdf_route("/summary.pdf", view));
//! ```
//!
//! Appending `?html=true` to the URL returns the rendered HTML instead,
//! which is handy while working on a template.

use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use renderpdf_core::{
    PdfRenderer, PipelineError, RenderRequest, TemplateError, TemplateNames,
};
use renderpdf_traits::{RenderOptions, UrlFetcher};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewError {
    #[error("PdfView is missing a template name")]
    MissingTemplateName,

    #[error("PdfView has prompt_download set but no download_name")]
    MissingDownloadName,

    #[error("Invalid download name '{0}'")]
    InvalidDownloadName(String),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("PDF generation failed: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Render task failed: {0}")]
    Join(String),
}

impl ViewError {
    fn code(&self) -> &'static str {
        match self {
            Self::MissingTemplateName => "MissingTemplateName",
            Self::MissingDownloadName => "MissingDownloadName",
            Self::InvalidDownloadName(_) => "InvalidDownloadName",
            Self::Template(_) | Self::Pipeline(PipelineError::Template(_)) => "TemplateError",
            Self::Pipeline(_) => "PipelineError",
            Self::Join(_) => "InternalError",
        }
    }
}

impl IntoResponse for ViewError {
    fn into_response(self) -> Response {
        log::error!("PDF view failed: {}", self);
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

/// Whether a request gets the PDF or the HTML it was rendered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Html,
    Pdf,
}

impl ResponseMode {
    /// `Html` only when forcing is allowed and `html` is present and non-empty.
    pub fn for_request(allow_force_html: bool, query: &HashMap<String, String>) -> Self {
        let wants_html = query.get("html").is_some_and(|v| !v.is_empty());
        if allow_force_html && wants_html {
            ResponseMode::Html
        } else {
            ResponseMode::Pdf
        }
    }
}

/// Builds the template context from the request's query parameters.
pub type ContextSource = Arc<dyn Fn(&HashMap<String, String>) -> Map<String, Value> + Send + Sync>;

/// Every query parameter as a string value.
fn query_context(query: &HashMap<String, String>) -> Map<String, Value> {
    query
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}

#[derive(Clone)]
pub struct PdfView {
    renderer: Arc<PdfRenderer>,
    template_name: Option<TemplateNames>,
    allow_force_html: bool,
    prompt_download: bool,
    download_name: Option<String>,
    options: RenderOptions,
    url_fetcher: Option<Arc<dyn UrlFetcher>>,
    context: ContextSource,
}

impl PdfView {
    pub fn new(renderer: Arc<PdfRenderer>) -> Self {
        Self {
            renderer,
            template_name: None,
            allow_force_html: true,
            prompt_download: false,
            download_name: None,
            options: RenderOptions::new(),
            url_fetcher: None,
            context: Arc::new(query_context),
        }
    }

    /// One name, or several to try in order.
    pub fn template_name(mut self, names: impl Into<TemplateNames>) -> Self {
        self.template_name = Some(names.into());
        self
    }

    pub fn allow_force_html(mut self, allow: bool) -> Self {
        self.allow_force_html = allow;
        self
    }

    pub fn prompt_download(mut self, prompt: bool) -> Self {
        self.prompt_download = prompt;
        self
    }

    pub fn download_name(mut self, name: impl Into<String>) -> Self {
        self.download_name = Some(name.into());
        self
    }

    pub fn options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn url_fetcher(mut self, fetcher: Arc<dyn UrlFetcher>) -> Self {
        self.url_fetcher = Some(fetcher);
        self
    }

    pub fn context<F>(mut self, source: F) -> Self
    where
        F: Fn(&HashMap<String, String>) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.context = Arc::new(source);
        self
    }

    fn content_disposition(&self) -> Result<Option<HeaderValue>, ViewError> {
        if !self.prompt_download {
            return Ok(None);
        }
        let name = self
            .download_name
            .as_deref()
            .ok_or(ViewError::MissingDownloadName)?;
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", name))
            .map(Some)
            .map_err(|_| ViewError::InvalidDownloadName(name.to_string()))
    }

    /// Answers one request. Rendering runs on the blocking pool.
    pub async fn respond(&self, query: HashMap<String, String>) -> Result<Response, ViewError> {
        let templates = self
            .template_name
            .clone()
            .ok_or(ViewError::MissingTemplateName)?;
        let context = (self.context)(&query);
        let renderer = self.renderer.clone();

        match ResponseMode::for_request(self.allow_force_html, &query) {
            ResponseMode::Html => {
                let html =
                    tokio::task::spawn_blocking(move || renderer.render_html(&templates, &context))
                        .await
                        .map_err(|e| ViewError::Join(e.to_string()))??;
                Ok(([(header::CONTENT_TYPE, "text/html; charset=utf-8")], html).into_response())
            }
            ResponseMode::Pdf => {
                let disposition = self.content_disposition()?;
                let request = RenderRequest {
                    templates,
                    context,
                    options: self.options.clone(),
                    url_fetcher: self.url_fetcher.clone(),
                };
                let pdf = tokio::task::spawn_blocking(move || renderer.render_to_vec(&request))
                    .await
                    .map_err(|e| ViewError::Join(e.to_string()))??;

                log::info!(
                    "PDF view rendered {} ({} bytes)",
                    request_label(&self.template_name),
                    pdf.len()
                );
                let mut response =
                    ([(header::CONTENT_TYPE, "application/pdf")], pdf).into_response();
                if let Some(disposition) = disposition {
                    response
                        .headers_mut()
                        .insert(header::CONTENT_DISPOSITION, disposition);
                }
                Ok(response)
            }
        }
    }
}

fn request_label(names: &Option<TemplateNames>) -> String {
    names.as_ref().map(ToString::to_string).unwrap_or_default()
}

async fn pdf_view_handler(
    State(view): State<PdfView>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, ViewError> {
    view.respond(query).await
}

/// A router serving `view` with `GET` at `path`.
pub fn pdf_route(path: &str, view: PdfView) -> Router {
    Router::new()
        .route(path, get(pdf_view_handler))
        .with_state(view)
}
