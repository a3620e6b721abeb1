//! Template-to-PDF rendering.

use crate::error::{PipelineError, TemplateError};
use crate::templates::{TemplateLoader, TemplateNames};
use log::info;
use renderpdf_render_lopdf::LopdfEngine;
use renderpdf_traits::{HtmlDocument, PdfEngine, RenderOptions, UrlFetcher};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// Base URL handed to the engine. It is not hierarchical, so relative
/// references reach the fetcher exactly as written in the HTML.
pub const PLACEHOLDER_BASE_URL: &str = "not-used://";

/// One render: which template, with what data, how.
pub struct RenderRequest {
    pub templates: TemplateNames,
    pub context: Map<String, Value>,
    /// Merged over the renderer's defaults, key by key.
    pub options: RenderOptions,
    /// Replaces the renderer's default fetcher for this request.
    pub url_fetcher: Option<Arc<dyn UrlFetcher>>,
}

impl RenderRequest {
    pub fn new(templates: impl Into<TemplateNames>) -> Self {
        Self {
            templates: templates.into(),
            context: Map::new(),
            options: RenderOptions::new(),
            url_fetcher: None,
        }
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn UrlFetcher>) -> Self {
        self.url_fetcher = Some(fetcher);
        self
    }
}

pub struct PdfRenderer {
    templates: TemplateLoader,
    engine: Arc<dyn PdfEngine>,
    default_fetcher: Arc<dyn UrlFetcher>,
    default_options: RenderOptions,
}

impl PdfRenderer {
    /// Creates a renderer using the lopdf engine and no default options.
    pub fn new(templates: TemplateLoader, default_fetcher: Arc<dyn UrlFetcher>) -> Self {
        Self {
            templates,
            engine: Arc::new(LopdfEngine::new()),
            default_fetcher,
            default_options: RenderOptions::new(),
        }
    }

    pub fn with_engine(mut self, engine: Arc<dyn PdfEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_default_options(mut self, options: RenderOptions) -> Self {
        self.default_options = options;
        self
    }

    pub fn templates(&self) -> &TemplateLoader {
        &self.templates
    }

    pub fn default_options(&self) -> &RenderOptions {
        &self.default_options
    }

    /// Renders the first existing template to HTML, without converting it.
    pub fn render_html(
        &self,
        templates: &TemplateNames,
        context: &Map<String, Value>,
    ) -> Result<String, TemplateError> {
        self.templates.render(templates, context)
    }

    /// Renders the request's template and writes the resulting PDF to `sink`.
    pub fn render(
        &self,
        request: &RenderRequest,
        sink: &mut dyn Write,
    ) -> Result<(), PipelineError> {
        let html = self.render_html(&request.templates, &request.context)?;
        let options = RenderOptions::merged(&self.default_options, &request.options);
        let fetcher: &dyn UrlFetcher = match &request.url_fetcher {
            Some(fetcher) => &**fetcher,
            None => &*self.default_fetcher,
        };

        self.engine.write_pdf(
            HtmlDocument::new(&html, PLACEHOLDER_BASE_URL, fetcher),
            sink,
            &options,
        )?;
        info!(
            "Rendered {} with the {} engine",
            request.templates,
            self.engine.name()
        );
        Ok(())
    }

    pub fn render_to_vec(&self, request: &RenderRequest) -> Result<Vec<u8>, PipelineError> {
        let mut buffer = Vec::new();
        self.render(request, &mut buffer)?;
        Ok(buffer)
    }

    pub fn render_to_file<P: AsRef<Path>>(
        &self,
        request: &RenderRequest,
        path: P,
    ) -> Result<(), PipelineError> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.render(request, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
