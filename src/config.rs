use renderpdf_core::{
    DEFAULT_STATIC_URL, DefaultUrlFetcher, PdfRenderer, StaticFilesUrlFetcher, TemplateLoader,
};
use renderpdf_resource::{FilesystemFinder, FilesystemStorage, InMemoryStaticStorage};
use renderpdf_traits::{RenderOptions, RouteResolver, StaticError, StaticStorage, UrlFetcher};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Static files error: {0}")]
    Static(#[from] StaticError),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub templates: TemplateSettings,
    pub staticfiles: StaticSettings,
    pub render: RenderSettings,
    pub network: NetworkSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemplateSettings {
    /// Searched in order for template names.
    pub dirs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaticSettings {
    /// URL prefix under which static assets are linked.
    pub url: String,
    /// Source directories searched by the finder, first hit wins.
    pub dirs: Vec<PathBuf>,
    /// Collected root opened by the storage.
    pub root: Option<PathBuf>,
    /// Resolve names through the root's `staticfiles.json`.
    pub manifest: bool,
}

impl Default for StaticSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_STATIC_URL.to_string(),
            dirs: Vec::new(),
            root: None,
            manifest: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Engine options applied to every render unless a request overrides them.
    pub options: RenderOptions,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub timeout_secs: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl Settings {
    /// Loads settings from `path` (or `renderpdf.toml` in the working
    /// directory if present), then layers `RENDERPDF__*` environment
    /// variables on top, e.g. `RENDERPDF__NETWORK__TIMEOUT_SECS=30`.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = config::Config::builder();

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name("renderpdf").required(false)),
        };

        builder = builder.add_source(
            config::Environment::with_prefix("RENDERPDF")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("templates.dirs")
                .with_list_parse_key("staticfiles.dirs"),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        log::debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    pub fn template_loader(&self) -> TemplateLoader {
        TemplateLoader::new(self.templates.dirs.iter().cloned())
    }

    /// The storage for collected assets, or an empty one without a root.
    pub fn build_storage(&self) -> Result<Arc<dyn StaticStorage>, SettingsError> {
        let Some(root) = &self.staticfiles.root else {
            return Ok(Arc::new(InMemoryStaticStorage::new()));
        };
        let storage = FilesystemStorage::new(root);
        if self.staticfiles.manifest {
            Ok(Arc::new(storage.with_manifest()?))
        } else {
            Ok(Arc::new(storage))
        }
    }

    /// The static-files fetcher; `routes` answers site-relative URLs that
    /// aren't assets.
    pub fn build_fetcher(
        &self,
        routes: Option<Arc<dyn RouteResolver>>,
    ) -> Result<StaticFilesUrlFetcher, SettingsError> {
        let external = DefaultUrlFetcher::new(Duration::from_secs(self.network.timeout_secs));
        let mut fetcher = StaticFilesUrlFetcher::new(self.build_storage()?)
            .with_static_url(self.staticfiles.url.clone())
            .with_finder(Arc::new(FilesystemFinder::new(&self.staticfiles.dirs)))
            .with_external(Arc::new(external));
        if let Some(routes) = routes {
            fetcher = fetcher.with_routes(routes);
        }
        Ok(fetcher)
    }

    pub fn build_renderer(&self, fetcher: Arc<dyn UrlFetcher>) -> PdfRenderer {
        PdfRenderer::new(self.template_loader(), fetcher)
            .with_default_options(self.render.options.clone())
    }
}
