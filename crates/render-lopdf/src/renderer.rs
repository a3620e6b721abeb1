use crate::css::Stylesheet;
use crate::html::{self, BlockKind, ImageRef, StyleSource};
use crate::layout::{self, Content as Flowed, DecodedImage, Page, Placed};
use crate::options::PageSetup;
use crate::text::{self, Font};
use log::{debug, warn};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use renderpdf_traits::{FetchedResource, HtmlDocument, PdfEngine, RenderError, RenderOptions};
use std::io::Write;
use url::Url;

/// HTML to PDF engine writing standard-14 fonts and RGB images with lopdf.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfEngine;

impl LopdfEngine {
    pub fn new() -> Self {
        Self
    }
}

/// Joins `href` onto `base` when `base` is hierarchical; otherwise the
/// reference is handed to the fetcher as written.
fn resolve_url(base: &str, href: &str) -> String {
    match Url::parse(base) {
        Ok(base) if matches!(base.scheme(), "http" | "https" | "file") => base
            .join(href)
            .map(String::from)
            .unwrap_or_else(|_| href.to_string()),
        _ => href.to_string(),
    }
}

fn fetch(document: &HtmlDocument<'_>, href: &str) -> Result<FetchedResource, RenderError> {
    let url = resolve_url(document.base_url, href);
    debug!("Loading resource '{}'", url);
    document
        .url_fetcher
        .fetch(&url)
        .map_err(|source| RenderError::Fetch { url, source })
}

fn decode_image(resource: &FetchedResource) -> Result<DecodedImage, image::ImageError> {
    let rgb = image::load_from_memory(&resource.content)?.to_rgb8();
    Ok(DecodedImage {
        width_px: rgb.width(),
        height_px: rgb.height(),
        rgb: rgb.into_raw(),
    })
}

fn pdf_error(err: impl std::fmt::Display) -> RenderError {
    RenderError::Pdf(err.to_string())
}

impl PdfEngine for LopdfEngine {
    fn write_pdf(
        &self,
        document: HtmlDocument<'_>,
        mut target: &mut dyn Write,
        options: &RenderOptions,
    ) -> Result<(), RenderError> {
        let setup = PageSetup::from_options(options)?;
        let parsed = html::parse(document.html)?;

        let mut sheet = Stylesheet::default();
        for source in &parsed.stylesheets {
            match source {
                StyleSource::Inline(css) => sheet.add_source(css),
                StyleSource::Linked(href) => {
                    let resource = fetch(&document, href)?;
                    sheet.add_source(&String::from_utf8_lossy(&resource.content));
                }
            }
        }

        let mut images = Vec::new();
        let mut flowed = Vec::with_capacity(parsed.blocks.len());
        for block in &parsed.blocks {
            let content = match &block.kind {
                BlockKind::Image(ImageRef {
                    src,
                    width,
                    height,
                    alt,
                }) => {
                    let resource = fetch(&document, src)?;
                    match decode_image(&resource) {
                        Ok(image) => {
                            images.push(image);
                            Flowed::Image {
                                index: images.len() - 1,
                                width: *width,
                                height: *height,
                            }
                        }
                        Err(e) => {
                            warn!("Could not decode image '{}': {}", src, e);
                            match alt {
                                Some(alt) if !alt.trim().is_empty() => Flowed::Alt(alt.clone()),
                                _ => continue,
                            }
                        }
                    }
                }
                kind => Flowed::Block(kind),
            };
            flowed.push((block, content));
        }

        let pages = layout::layout(&flowed, &images, &sheet, &setup);
        debug!(
            "Laid out {} block(s) on {} page(s) with {} image(s)",
            flowed.len(),
            pages.len(),
            images.len()
        );

        let title = setup.title.as_deref().or(parsed.title.as_deref());
        let mut pdf = build_document(&pages, images, &setup, title)?;
        if setup.compress {
            pdf.compress();
        }
        pdf.save_to(&mut target).map_err(pdf_error)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "lopdf"
    }
}

fn build_document(
    pages: &[Page],
    images: Vec<DecodedImage>,
    setup: &PageSetup,
    title: Option<&str>,
) -> Result<Document, RenderError> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for font in Font::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), font_id);
    }

    let mut xobjects = Dictionary::new();
    for (index, image) in images.into_iter().enumerate() {
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width_px as i64,
                "Height" => image.height_px as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            image.rgb,
        );
        let image_id = doc.add_object(stream);
        xobjects.set(image_name(index), image_id);
    }

    let resources_id = doc.add_object(dictionary! {
        "Font" => fonts,
        "XObject" => xobjects,
    });

    let mut page_ids: Vec<ObjectId> = Vec::with_capacity(pages.len());
    for page in pages {
        let content = Content {
            operations: page_operations(page),
        };
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content.encode().map_err(pdf_error)?,
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), setup.width.into(), setup.height.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        page_ids.push(page_id);
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| Object::from(*id)).collect::<Vec<_>>(),
            "Count" => page_ids.len() as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut info = dictionary! {
        "Producer" => Object::string_literal("renderpdf"),
    };
    if let Some(title) = title {
        info.set("Title", info_string(title));
    }
    if let Some(author) = &setup.author {
        info.set("Author", info_string(author));
    }
    let info_id = doc.add_object(info);
    doc.trailer.set("Info", info_id);

    Ok(doc)
}

fn image_name(index: usize) -> String {
    format!("Im{}", index + 1)
}

fn info_string(value: &str) -> Object {
    Object::String(text::encode_win_ansi(value), StringFormat::Literal)
}

fn page_operations(page: &Page) -> Vec<Operation> {
    let mut ops = Vec::new();
    for item in &page.items {
        match item {
            Placed::Text {
                x,
                y,
                size,
                font,
                color,
                text,
            } => {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new(
                    "Tf",
                    vec![Object::Name(font.resource_name().as_bytes().to_vec()), (*size).into()],
                ));
                ops.push(Operation::new(
                    "rg",
                    vec![color.r.into(), color.g.into(), color.b.into()],
                ));
                ops.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::String(text::encode_win_ansi(text), StringFormat::Literal)],
                ));
                ops.push(Operation::new("ET", vec![]));
            }
            Placed::Rule { x1, x2, y } => {
                ops.push(Operation::new("w", vec![0.5.into()]));
                ops.push(Operation::new("RG", vec![0.6.into(), 0.6.into(), 0.6.into()]));
                ops.push(Operation::new("m", vec![(*x1).into(), (*y).into()]));
                ops.push(Operation::new("l", vec![(*x2).into(), (*y).into()]));
                ops.push(Operation::new("S", vec![]));
            }
            Placed::Image {
                index,
                x,
                y,
                width,
                height,
            } => {
                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new(
                    "cm",
                    vec![
                        (*width).into(),
                        0.into(),
                        0.into(),
                        (*height).into(),
                        (*x).into(),
                        (*y).into(),
                    ],
                ));
                ops.push(Operation::new(
                    "Do",
                    vec![Object::Name(image_name(*index).into_bytes())],
                ));
                ops.push(Operation::new("Q", vec![]));
            }
        }
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderpdf_traits::FetchError;
    use std::io::Cursor;
    use std::sync::Mutex;

    fn no_fetch(url: &str) -> Result<FetchedResource, FetchError> {
        Err(FetchError::UnresolvableRelativeUrl(url.to_string()))
    }

    fn render(html: &str, options: &RenderOptions) -> Result<Vec<u8>, RenderError> {
        let mut out = Vec::new();
        let document = HtmlDocument::new(html, "not-used://", &no_fetch);
        LopdfEngine::new().write_pdf(document, &mut out, options)?;
        Ok(out)
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 10, 10]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_writes_a_loadable_pdf() {
        let html = "<html><head><title>Report</title></head>\
                    <body><h1>Hello</h1><p>World</p></body></html>";
        let bytes = render(html, &RenderOptions::new()).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = doc.get_dictionary(info_id).unwrap();
        assert_eq!(info.get(b"Title").unwrap().as_str().unwrap(), b"Report");
    }

    #[test]
    fn test_long_documents_paginate() {
        let body: String = (0..300).map(|i| format!("<p>Paragraph {}</p>", i)).collect();
        let bytes = render(&format!("<body>{}</body>", body), &RenderOptions::new()).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() > 1);
    }

    #[test]
    fn test_unknown_option_is_rejected() {
        let err = render("<p>x</p>", &RenderOptions::new().with("landscape", true)).unwrap_err();
        assert!(matches!(err, RenderError::UnknownOption(ref k) if k == "landscape"));
    }

    #[test]
    fn test_compressed_output_still_loads() {
        let options = RenderOptions::new().with("compress", true).with("page_size", "Letter");
        let bytes = render("<p>compressed</p>", &options).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_linked_resources_go_through_fetcher_in_order() {
        let seen = Mutex::new(Vec::new());
        let png = png_bytes(4, 2);
        let fetcher = |url: &str| -> Result<FetchedResource, FetchError> {
            seen.lock().unwrap().push(url.to_string());
            if url.ends_with(".css") {
                Ok(FetchedResource::new("p { color: red }", Some("text/css".into())))
            } else {
                Ok(FetchedResource::new(png.clone(), Some("image/png".into())))
            }
        };
        let html = r#"<html><head><link rel="stylesheet" href="/static/styles.css"></head>
            <body><p>Logo</p><img src="/static/logo.png" width="40"></body></html>"#;

        let mut out = Vec::new();
        let document = HtmlDocument::new(html, "not-used://", &fetcher);
        LopdfEngine::new()
            .write_pdf(document, &mut out, &RenderOptions::new())
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["/static/styles.css".to_string(), "/static/logo.png".to_string()]
        );
        let doc = Document::load_mem(&out).unwrap();
        let has_image = doc.objects.values().any(|obj| {
            obj.as_stream()
                .map(|s| {
                    s.dict.get(b"Subtype").and_then(Object::as_name).ok()
                        == Some(b"Image".as_slice())
                })
                .unwrap_or(false)
        });
        assert!(has_image);
    }

    #[test]
    fn test_fetch_failure_propagates() {
        let err = render(r#"<img src="/missing.png">"#, &RenderOptions::new()).unwrap_err();
        match err {
            RenderError::Fetch { url, source } => {
                assert_eq!(url, "/missing.png");
                assert!(matches!(source, FetchError::UnresolvableRelativeUrl(_)));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_undecodable_image_falls_back_to_alt_text() {
        let fetcher = |_: &str| -> Result<FetchedResource, FetchError> {
            Ok(FetchedResource::new(b"not an image".to_vec(), None))
        };
        let html = r#"<img src="x.png" alt="Company logo">"#;
        let mut out = Vec::new();
        LopdfEngine::new()
            .write_pdf(
                HtmlDocument::new(html, "not-used://", &fetcher),
                &mut out,
                &RenderOptions::new(),
            )
            .unwrap();
        assert!(out.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_resolve_url_only_joins_hierarchical_bases() {
        assert_eq!(resolve_url("not-used://", "/static/a.css"), "/static/a.css");
        assert_eq!(
            resolve_url("https://example.com/docs/index.html", "a.css"),
            "https://example.com/docs/a.css"
        );
        assert_eq!(resolve_url("file:///srv/site/", "/img/x.png"), "file:///img/x.png");
    }
}
