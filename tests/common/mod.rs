#![allow(dead_code)]

use lopdf::Document as LopdfDocument;
use lopdf::Object;
use renderpdf::{DefaultUrlFetcher, PdfRenderer, StaticFilesUrlFetcher, TemplateLoader};
use renderpdf::config::{Settings, StaticSettings, TemplateSettings};
use std::path::PathBuf;
use std::sync::Arc;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

/// Settings pointing at the fixture templates and static directory.
pub fn fixture_settings() -> Settings {
    let fixtures = fixtures_dir();
    Settings {
        templates: TemplateSettings {
            dirs: vec![fixtures.join("templates")],
        },
        staticfiles: StaticSettings {
            dirs: vec![fixtures.join("static")],
            ..StaticSettings::default()
        },
        ..Settings::default()
    }
}

/// A renderer over the fixture templates whose fetcher only knows static files.
pub fn fixture_renderer() -> PdfRenderer {
    let settings = fixture_settings();
    let fetcher = settings
        .build_fetcher(None)
        .expect("fixture settings build a fetcher");
    settings.build_renderer(Arc::new(fetcher))
}

/// A renderer over in-memory templates, with an empty static storage.
pub fn in_memory_renderer(templates: &[(&str, &str)]) -> PdfRenderer {
    let mut loader = TemplateLoader::new(Vec::<PathBuf>::new());
    for (name, source) in templates {
        loader.add_template(*name, *source);
    }
    let storage = Arc::new(renderpdf::traits::InMemoryStaticStorage::new());
    let fetcher = StaticFilesUrlFetcher::new(storage)
        .with_external(Arc::new(DefaultUrlFetcher::default()));
    PdfRenderer::new(loader, Arc::new(fetcher))
}

/// Wrapper around a generated PDF with helper methods
pub struct GeneratedPdf {
    pub bytes: Vec<u8>,
    pub doc: LopdfDocument,
}

impl GeneratedPdf {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Box<dyn std::error::Error>> {
        let doc = LopdfDocument::load_mem(&bytes)?;
        Ok(Self { bytes, doc })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Every string shown with `Tj`, page by page, in content order.
    pub fn shown_text(&self) -> Vec<String> {
        let mut shown = Vec::new();
        for page_id in self.doc.get_pages().values() {
            let Ok(content) = self.doc.get_and_decode_page_content(*page_id) else {
                continue;
            };
            for op in content.operations {
                if op.operator != "Tj" {
                    continue;
                }
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    shown.push(bytes.iter().map(|&b| b as char).collect());
                }
            }
        }
        shown
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.shown_text().join(" ").contains(needle)
    }

    /// Width and height of the first page.
    pub fn page_size(&self) -> Option<(f32, f32)> {
        let page_id = *self.doc.get_pages().values().next()?;
        let page = self.doc.get_dictionary(page_id).ok()?;
        let media_box = page.get(b"MediaBox").ok()?.as_array().ok()?;
        let width = media_box.get(2)?.as_float().ok()?;
        let height = media_box.get(3)?.as_float().ok()?;
        Some((width, height))
    }

    /// The `/Title` entry of the document info dictionary.
    pub fn title(&self) -> Option<String> {
        let info = self.doc.trailer.get(b"Info").ok()?.as_reference().ok()?;
        let dict = self.doc.get_dictionary(info).ok()?;
        match dict.get(b"Title").ok()? {
            Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }
}
