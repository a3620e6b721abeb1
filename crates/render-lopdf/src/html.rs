//! Lenient HTML reader producing a flat list of blocks.
//!
//! quick-xml does the tokenizing with end-name checks disabled, so unclosed
//! `<p>` or `<li>` elements and HTML void elements (`<meta>`, `<br>`) are
//! tolerated.

use crate::css::parse_pixels;
use quick_xml::Reader;
use quick_xml::escape::{resolve_html5_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use renderpdf_traits::RenderError;
use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StyleSource {
    Inline(String),
    Linked(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ImageRef {
    pub src: String,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BlockKind {
    Text(String),
    ListItem(String),
    Preformatted(String),
    Rule,
    Image(ImageRef),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Block {
    /// Name of the element the block came from, for styling.
    pub element: String,
    pub kind: BlockKind,
}

#[derive(Debug, Default)]
pub(crate) struct ParsedHtml {
    pub title: Option<String>,
    pub stylesheets: Vec<StyleSource>,
    pub blocks: Vec<Block>,
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "li", "main", "nav", "ol",
    "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Elements whose text never reaches the page.
const HIDDEN_ELEMENTS: &[&str] = &["head", "noscript", "template", "title"];

struct Builder {
    parsed: ParsedHtml,
    stack: Vec<String>,
    buffer: String,
    captured: String,
}

impl Builder {
    fn new() -> Self {
        Self {
            parsed: ParsedHtml::default(),
            stack: Vec::new(),
            buffer: String::new(),
            captured: String::new(),
        }
    }

    fn is_open(&self, name: &str) -> bool {
        self.stack.iter().any(|n| n == name)
    }

    fn innermost_block(&self) -> &str {
        self.stack
            .iter()
            .rev()
            .find(|n| BLOCK_ELEMENTS.contains(&n.as_str()))
            .map_or("body", String::as_str)
    }

    fn hidden(&self) -> bool {
        self.stack
            .iter()
            .any(|n| HIDDEN_ELEMENTS.contains(&n.as_str()))
    }

    fn start(&mut self, name: String, attributes: Vec<(String, String)>) {
        if VOID_ELEMENTS.contains(&name.as_str()) {
            self.void(&name, &attributes);
            return;
        }
        if BLOCK_ELEMENTS.contains(&name.as_str()) {
            self.flush();
        }
        if name == "title" {
            self.captured.clear();
        }
        self.stack.push(name);
    }

    fn end(&mut self, name: &str) {
        let Some(position) = self.stack.iter().rposition(|n| n == name) else {
            return;
        };
        if name == "title" {
            let title = collapse_whitespace(&std::mem::take(&mut self.captured));
            let title = title.trim();
            if !title.is_empty() {
                self.parsed.title = Some(title.to_string());
            }
        }
        if BLOCK_ELEMENTS.contains(&name) {
            self.flush();
        }
        self.stack.truncate(position);
    }

    fn void(&mut self, name: &str, attributes: &[(String, String)]) {
        if self.hidden() && name != "link" {
            return;
        }
        let attr = |key: &str| {
            attributes
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };
        match name {
            "br" => {
                if self.is_open("pre") {
                    self.buffer.push('\n');
                } else {
                    self.flush();
                }
            }
            "hr" => {
                self.flush();
                self.push_block(BlockKind::Rule);
            }
            "img" => {
                let Some(src) = attr("src").filter(|s| !s.is_empty()) else {
                    return;
                };
                self.flush();
                self.push_block(BlockKind::Image(ImageRef {
                    src,
                    width: attr("width").and_then(|w| parse_pixels(&w)),
                    height: attr("height").and_then(|h| parse_pixels(&h)),
                    alt: attr("alt"),
                }));
            }
            "link" => {
                let is_stylesheet = attr("rel").is_some_and(|rel| {
                    rel.split_whitespace()
                        .any(|r| r.eq_ignore_ascii_case("stylesheet"))
                });
                if let Some(href) = attr("href").filter(|_| is_stylesheet) {
                    self.parsed.stylesheets.push(StyleSource::Linked(href));
                }
            }
            _ => {}
        }
    }

    /// The body of a `<style>` or `<script>` element.
    fn raw_text(&mut self, name: &str, body: &str) {
        if name == "style" {
            self.parsed.stylesheets.push(StyleSource::Inline(body.to_string()));
        }
    }

    fn text(&mut self, text: &str) {
        if self.is_open("title") {
            self.captured.push_str(text);
            return;
        }
        if self.hidden() {
            return;
        }
        if self.is_open("pre") {
            self.buffer.push_str(text);
        } else {
            self.buffer.push_str(&collapse_whitespace(text));
        }
    }

    fn flush(&mut self) {
        let text = std::mem::take(&mut self.buffer);
        let kind = if self.is_open("pre") {
            let text = text.trim_matches('\n');
            if text.trim().is_empty() {
                return;
            }
            BlockKind::Preformatted(text.to_string())
        } else {
            let text = collapse_whitespace(&text).trim().to_string();
            if text.is_empty() {
                return;
            }
            if self.innermost_block() == "li" {
                BlockKind::ListItem(text)
            } else {
                BlockKind::Text(text)
            }
        };
        self.push_block(kind);
    }

    fn push_block(&mut self, kind: BlockKind) {
        let element = self.innermost_block().to_string();
        self.parsed.blocks.push(Block { element, kind });
    }

    fn finish(mut self) -> ParsedHtml {
        self.flush();
        self.parsed
    }
}

/// Elements whose content is raw text rather than markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

fn html_reader(input: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(input);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.allow_dangling_amp = true;
    reader
}

pub(crate) fn parse(html: &str) -> Result<ParsedHtml, RenderError> {
    let source = escape_stray_lt(html);
    let mut builder = Builder::new();
    let mut offset = 0;

    // Raw-text bodies are sliced out of the source by hand, and tokenizing
    // restarts after their closing tag.
    'document: loop {
        let mut reader = html_reader(&source[offset..]);
        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let (name, attributes) = element(&e)?;
                    if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                        let body_start = offset + reader.buffer_position() as usize;
                        let (body_end, resume) = raw_text_end(&source, body_start, &name);
                        builder.raw_text(&name, &source[body_start..body_end]);
                        offset = resume;
                        continue 'document;
                    }
                    builder.start(name, attributes);
                }
                Ok(Event::Empty(e)) => {
                    let (name, attributes) = element(&e)?;
                    if VOID_ELEMENTS.contains(&name.as_str()) {
                        builder.void(&name, &attributes);
                    } else {
                        // `<div/>` and friends: open and close immediately.
                        builder.start(name.clone(), attributes);
                        builder.end(&name);
                    }
                }
                Ok(Event::End(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                    builder.end(&name);
                }
                Ok(Event::Text(e)) => {
                    builder.text(&String::from_utf8_lossy(&e));
                }
                Ok(Event::CData(e)) => {
                    builder.text(&String::from_utf8_lossy(&e));
                }
                Ok(Event::GeneralRef(e)) => {
                    let reference = format!("&{};", String::from_utf8_lossy(&e));
                    builder.text(&unescape_html(&reference));
                }
                Ok(Event::Eof) => break 'document,
                Ok(_) => {}
                Err(e) => {
                    return Err(RenderError::Html(format!(
                        "at byte {}: {}",
                        offset + reader.error_position() as usize,
                        e
                    )));
                }
            }
        }
    }

    Ok(builder.finish())
}

type Attributes = Vec<(String, String)>;

fn element(e: &BytesStart<'_>) -> Result<(String, Attributes), RenderError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
    let mut attributes = Vec::new();
    for attr in e.html_attributes().with_checks(false) {
        let attr = attr.map_err(|err| RenderError::Html(format!("<{}>: {}", name, err)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
        let value = unescape_html(&String::from_utf8_lossy(&attr.value));
        attributes.push((key, value));
    }
    Ok((name, attributes))
}

/// Resolves character references and every HTML5 named entity.
///
/// Text that isn't well-formed escaped content (a lone `&`, an unknown
/// entity) is kept verbatim.
pub(crate) fn unescape_html(raw: &str) -> String {
    unescape_with(raw, resolve_html5_entity)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.to_string())
}

/// Where the raw text starting at `from` ends, and where markup resumes.
///
/// An unclosed element runs to the end of the input.
fn raw_text_end(source: &str, from: usize, name: &str) -> (usize, usize) {
    let bytes = source.as_bytes();
    let mut search = from;
    while let Some(found) = source[search..].find("</") {
        let tag_start = search + found;
        let name_start = tag_start + 2;
        let name_end = name_start + name.len();
        let closes = bytes
            .get(name_start..name_end)
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name.as_bytes()))
            && bytes
                .get(name_end)
                .is_none_or(|b| b.is_ascii_whitespace() || *b == b'>' || *b == b'/');
        if closes {
            let resume = source[name_end..]
                .find('>')
                .map_or(source.len(), |gt| name_end + gt + 1);
            return (tag_start, resume);
        }
        search = name_start;
    }
    (source.len(), source.len())
}

/// Whether the markup at `rest` (just after a `<`) opens a tag, comment,
/// declaration or processing instruction.
fn opens_markup(rest: &[u8]) -> bool {
    match rest {
        [first, ..] if first.is_ascii_alphabetic() => true,
        [b'/', second, ..] => second.is_ascii_alphabetic(),
        [b'!' | b'?', ..] => true,
        _ => false,
    }
}

/// Escapes every `<` that can't open markup, as HTML treats it as text.
///
/// Raw-text element bodies are copied through untouched.
fn escape_stray_lt(html: &str) -> Cow<'_, str> {
    let bytes = html.as_bytes();
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut pos = 0;

    while let Some(found) = html[pos..].find('<') {
        let lt = pos + found;
        let rest = &bytes[lt + 1..];
        if !opens_markup(rest) {
            let out = out.get_or_insert_with(|| String::with_capacity(html.len() + 8));
            out.push_str(&html[copied..lt]);
            out.push_str("&lt;");
            copied = lt + 1;
            pos = lt + 1;
            continue;
        }
        pos = lt + 1;
        if let Some(name) = RAW_TEXT_ELEMENTS.iter().find(|name| {
            rest.get(..name.len())
                .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name.as_bytes()))
                && rest
                    .get(name.len())
                    .is_none_or(|b| b.is_ascii_whitespace() || *b == b'>' || *b == b'/')
        }) {
            let Some(gt) = html[lt..].find('>') else {
                break;
            };
            let (_, resume) = raw_text_end(html, lt + gt + 1, name);
            pos = resume;
        }
    }

    match out {
        Some(mut out) => {
            out.push_str(&html[copied..]);
            Cow::Owned(out)
        }
        None => Cow::Borrowed(html),
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}
