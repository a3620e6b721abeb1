mod common;

use common::{GeneratedPdf, TestResult, fixture_renderer, fixture_settings, in_memory_renderer};
use http::Response;
use renderpdf::traits::{FetchError, RenderError, RouteResolver};
use renderpdf::{
    FetchedResource, PipelineError, RenderOptions, RenderRequest, RouteTable, TemplateError,
    TemplateNames, UrlFetcher,
};
use serde_json::{Map, Value, json};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn invoice_context() -> Map<String, Value> {
    match json!({
        "title": "Invoice 42",
        "customer": "Ada Lovelace",
        "items": ["Analytical engine", "Punch cards"],
    }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

#[test]
fn test_fixture_template_renders_to_pdf() -> TestResult {
    let renderer = fixture_renderer();
    let request = RenderRequest::new("test_template.html").with_context(invoice_context());

    let bytes = renderer.render_to_vec(&request)?;
    assert!(bytes.starts_with(b"%PDF-"));
    assert!(bytes.len() > 500, "suspiciously small PDF: {} bytes", bytes.len());

    let pdf = GeneratedPdf::from_bytes(bytes)?;
    assert_eq!(pdf.page_count(), 1);
    assert_eq!(pdf.title().as_deref(), Some("Invoice 42"));
    assert!(pdf.contains_text("Prepared for Ada Lovelace."));
    assert!(pdf.contains_text("Punch cards"));
    Ok(())
}

#[test]
fn test_first_existing_template_wins() -> TestResult {
    let renderer = fixture_renderer();
    let names = TemplateNames::new(["custom/invoice.html", "test_template.html"]).unwrap();
    let request = RenderRequest::new(names).with_context(invoice_context());

    let pdf = GeneratedPdf::from_bytes(renderer.render_to_vec(&request)?)?;
    assert!(pdf.contains_text("Invoice 42"));
    Ok(())
}

#[test]
fn test_all_templates_missing_is_not_found() {
    let renderer = fixture_renderer();
    let names = TemplateNames::new(["nope.html", "also/nope.html"]).unwrap();
    let err = renderer.render_to_vec(&RenderRequest::new(names)).unwrap_err();

    match err {
        PipelineError::Template(TemplateError::NotFound(names)) => {
            assert_eq!(names.to_string(), "[nope.html, also/nope.html]");
        }
        other => panic!("expected TemplateError::NotFound, got {:?}", other),
    }
}

#[test]
fn test_static_files_and_routes_feed_the_engine() -> TestResult {
    let settings = fixture_settings();
    let themes = Arc::new(Mutex::new(Vec::new()));
    let routes = {
        let themes = themes.clone();
        RouteTable::new().route("/theme/{file}", move |_req, params| {
            themes.lock().unwrap().push(params["file"].clone());
            Ok(Response::new(b"p { color: #444; }".to_vec()))
        })
    };
    let fetcher = settings.build_fetcher(Some(Arc::new(routes) as Arc<dyn RouteResolver>))?;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recording = {
        let seen = seen.clone();
        move |url: &str| -> Result<FetchedResource, FetchError> {
            let resource = fetcher.fetch(url)?;
            seen.lock()
                .unwrap()
                .push((url.to_string(), resource.mime_type.clone()));
            Ok(resource)
        }
    };

    let renderer = settings.build_renderer(Arc::new(DefaultOnly));
    let mut context = Map::new();
    context.insert("theme".into(), json!("dark"));
    let request = RenderRequest::new("styled.html")
        .with_context(context)
        .with_fetcher(Arc::new(recording));

    let pdf = GeneratedPdf::from_bytes(renderer.render_to_vec(&request)?)?;
    assert!(pdf.contains_text("Quarterly summary"));

    let seen = seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            ("/static/styles.css".to_string(), Some("text/css".to_string())),
            ("/theme/dark.css".to_string(), Some("text/css".to_string())),
        ]
    );
    assert_eq!(*themes.lock().unwrap(), vec!["dark.css".to_string()]);
    Ok(())
}

/// Fails any fetch; used where a request must bring its own fetcher.
struct DefaultOnly;

impl UrlFetcher for DefaultOnly {
    fn fetch(&self, url: &str) -> Result<FetchedResource, FetchError> {
        panic!("default fetcher used for {}", url)
    }
}

#[test]
fn test_unresolvable_link_fails_the_render() {
    let renderer = fixture_renderer();
    let err = renderer
        .render_to_vec(&RenderRequest::new("broken_link.html"))
        .unwrap_err();

    match err {
        PipelineError::Render(RenderError::Fetch { url, source }) => {
            assert_eq!(url, "/missing.css");
            assert!(
                matches!(source, FetchError::UnresolvableRelativeUrl(ref u) if u == "/missing.css")
            );
        }
        other => panic!("expected a fetch failure, got {:?}", other),
    }
}

#[test]
fn test_default_options_and_overrides_reach_the_engine() -> TestResult {
    let mut settings = fixture_settings();
    settings.render.options = RenderOptions::new()
        .with("page_size", "Letter")
        .with("title", "Default title");
    let fetcher = settings.build_fetcher(None)?;
    let renderer = settings.build_renderer(Arc::new(fetcher));

    let request = RenderRequest::new("test_template.html")
        .with_context(invoice_context())
        .with_options(RenderOptions::new().with("title", "Override"));
    let pdf = GeneratedPdf::from_bytes(renderer.render_to_vec(&request)?)?;

    assert_eq!(pdf.title().as_deref(), Some("Override"));
    assert_eq!(pdf.page_size(), Some((612.0, 792.0)));
    Ok(())
}

#[test]
fn test_unknown_option_is_an_engine_error() {
    let renderer = in_memory_renderer(&[("page.html", "<p>hi</p>")]);
    let options = RenderOptions::new().with("orientation", "landscape");
    let request = RenderRequest::new("page.html").with_options(options);

    let err = renderer.render_to_vec(&request).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Render(RenderError::UnknownOption(ref key)) if key == "orientation"
    ));
}

#[test]
fn test_markup_characters_in_text_survive_rendering() -> TestResult {
    let renderer = in_memory_renderer(&[(
        "page.html",
        "<style>p { color: red; }</style>\
         <script>if (a < b) { go(); }</script>\
         <p>Fish & Chips</p><p>1 < 2</p>",
    )]);

    let pdf = GeneratedPdf::from_bytes(renderer.render_to_vec(&RenderRequest::new("page.html"))?)?;
    assert!(pdf.contains_text("Fish & Chips"));
    assert!(pdf.contains_text("1 < 2"));
    assert!(!pdf.contains_text("go()"));
    Ok(())
}

#[test]
fn test_render_to_file() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("out.pdf");
    let renderer = in_memory_renderer(&[("page.html", "<h1>{{heading}}</h1>")]);

    let mut context = Map::new();
    context.insert("heading".into(), json!("Written to disk"));
    renderer.render_to_file(&RenderRequest::new("page.html").with_context(context), &path)?;

    let pdf = GeneratedPdf::from_bytes(std::fs::read(&path)?)?;
    assert!(pdf.contains_text("Written to disk"));
    Ok(())
}
