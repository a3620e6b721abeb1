//! Top-to-bottom flow layout of parsed blocks onto pages.

use crate::css::{Rgb, Stylesheet};
use crate::html::{Block, BlockKind};
use crate::options::PageSetup;
use crate::text::{self, Font};

const LINE_HEIGHT: f32 = 1.25;
const LIST_INDENT: f32 = 18.0;

/// A raster image decoded to 8-bit RGB.
#[derive(Debug, Clone)]
pub(crate) struct DecodedImage {
    pub width_px: u32,
    pub height_px: u32,
    pub rgb: Vec<u8>,
}

/// Something drawn on a page, in PDF user space (origin bottom-left).
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Placed {
    Text {
        x: f32,
        y: f32,
        size: f32,
        font: Font,
        color: Rgb,
        text: String,
    },
    Rule {
        x1: f32,
        x2: f32,
        y: f32,
    },
    Image {
        index: usize,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Debug, Default)]
pub(crate) struct Page {
    pub items: Vec<Placed>,
}

/// What a block resolves to once its resources are known.
pub(crate) enum Content<'a> {
    Block(&'a BlockKind),
    /// Replacement text for an image that could not be decoded.
    Alt(String),
    /// Index into the decoded image list.
    Image {
        index: usize,
        width: Option<f32>,
        height: Option<f32>,
    },
}

#[derive(Debug, Clone, Copy)]
struct TextStyle {
    size: f32,
    color: Rgb,
    font: Font,
}

fn heading_scale(element: &str) -> Option<f32> {
    Some(match element {
        "h1" => 2.0,
        "h2" => 1.5,
        "h3" => 1.17,
        "h4" => 1.0,
        "h5" => 0.83,
        "h6" => 0.67,
        _ => return None,
    })
}

struct Flow<'a> {
    setup: &'a PageSetup,
    sheet: &'a Stylesheet,
    base_size: f32,
    base_color: Rgb,
    pages: Vec<Page>,
    /// Distance already used below the top margin of the current page.
    cursor: f32,
}

impl<'a> Flow<'a> {
    fn new(setup: &'a PageSetup, sheet: &'a Stylesheet) -> Self {
        let mut base_size = setup.font_size;
        let mut base_color = Rgb::BLACK;
        for element in ["html", "body"] {
            if let Some(rule) = sheet.rule(element) {
                if let Some(size) = rule.font_size {
                    base_size = size.resolve(base_size);
                }
                if let Some(color) = rule.color {
                    base_color = color;
                }
            }
        }
        Self {
            setup,
            sheet,
            base_size,
            base_color,
            pages: vec![Page::default()],
            cursor: 0.0,
        }
    }

    fn style(&self, element: &str, kind: &BlockKind) -> TextStyle {
        let scale = heading_scale(element);
        let font = match kind {
            BlockKind::Preformatted(_) => Font::Mono,
            _ if scale.is_some() || matches!(element, "th" | "dt") => Font::Bold,
            _ => Font::Regular,
        };
        let rule = self.sheet.rule(element);
        let size = rule
            .and_then(|r| r.font_size)
            .map(|s| s.resolve(self.base_size))
            .unwrap_or(self.base_size * scale.unwrap_or(1.0));
        let color = rule.and_then(|r| r.color).unwrap_or(self.base_color);
        TextStyle { size, color, font }
    }

    fn top(&self) -> f32 {
        self.setup.height - self.setup.margin
    }

    /// Starts a new page unless `needed` still fits on the current one.
    ///
    /// An empty page always accepts content, so oversized items can't loop.
    fn reserve(&mut self, needed: f32) {
        if self.cursor > 0.0 && self.cursor + needed > self.setup.content_height() {
            self.pages.push(Page::default());
            self.cursor = 0.0;
        }
    }

    fn place(&mut self, item: Placed) {
        if let Some(page) = self.pages.last_mut() {
            page.items.push(item);
        }
    }

    fn line(&mut self, x: f32, text: String, style: TextStyle) {
        let line_height = style.size * LINE_HEIGHT;
        self.reserve(line_height);
        let y = self.top() - self.cursor - style.size;
        self.place(Placed::Text {
            x,
            y,
            size: style.size,
            font: style.font,
            color: style.color,
            text,
        });
        self.cursor += line_height;
    }

    fn gap(&mut self, amount: f32) {
        self.cursor += amount;
    }

    fn text_block(&mut self, element: &str, kind: &BlockKind) {
        let style = self.style(element, kind);
        let left = self.setup.margin;
        let width = self.setup.content_width();

        match kind {
            BlockKind::Text(text) => {
                if heading_scale(element).is_some() && self.cursor > 0.0 {
                    self.gap(style.size * 0.3);
                }
                for line in text::wrap(text, style.size, style.font, width) {
                    self.line(left, line, style);
                }
            }
            BlockKind::ListItem(text) => {
                let lines = text::wrap(text, style.size, style.font, width - LIST_INDENT);
                for (i, line) in lines.into_iter().enumerate() {
                    if i == 0 {
                        // Bullet and first line share a baseline.
                        self.reserve(style.size * LINE_HEIGHT);
                        let y = self.top() - self.cursor - style.size;
                        self.place(Placed::Text {
                            x: left + LIST_INDENT / 3.0,
                            y,
                            size: style.size,
                            font: style.font,
                            color: style.color,
                            text: "•".to_string(),
                        });
                    }
                    self.line(left + LIST_INDENT, line, style);
                }
            }
            BlockKind::Preformatted(text) => {
                let style = TextStyle {
                    size: style.size * 0.9,
                    ..style
                };
                let char_width = text::text_width("m", style.size, Font::Mono);
                let max_chars = ((width / char_width).floor() as usize).max(1);
                for raw_line in text.lines() {
                    let chars: Vec<char> = raw_line.chars().collect();
                    if chars.is_empty() {
                        self.gap(style.size * LINE_HEIGHT);
                        continue;
                    }
                    for chunk in chars.chunks(max_chars) {
                        self.line(left, chunk.iter().collect(), style);
                    }
                }
            }
            BlockKind::Rule => {
                self.reserve(style.size);
                let y = self.top() - self.cursor - style.size / 2.0;
                self.place(Placed::Rule {
                    x1: left,
                    x2: left + width,
                    y,
                });
                self.cursor += style.size;
            }
            BlockKind::Image(_) => {}
        }
        self.gap(style.size * 0.5);
    }

    fn image(
        &mut self,
        index: usize,
        image: &DecodedImage,
        width: Option<f32>,
        height: Option<f32>,
    ) {
        let natural_w = image.width_px as f32 * 0.75;
        let natural_h = image.height_px as f32 * 0.75;
        let aspect = if natural_w > 0.0 { natural_h / natural_w } else { 1.0 };

        let (mut w, mut h) = match (width, height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, w * aspect),
            (None, Some(h)) => (h / aspect.max(f32::EPSILON), h),
            (None, None) => (natural_w, natural_h),
        };
        let max_w = self.setup.content_width();
        let max_h = self.setup.content_height();
        if w > max_w {
            h *= max_w / w;
            w = max_w;
        }
        if h > max_h {
            w *= max_h / h;
            h = max_h;
        }

        self.reserve(h);
        let y = self.top() - self.cursor - h;
        self.place(Placed::Image {
            index,
            x: self.setup.margin,
            y,
            width: w,
            height: h,
        });
        self.cursor += h;
        self.gap(self.base_size * 0.5);
    }
}

/// Lays out `blocks` into pages. `contents` pairs each block with what it
/// resolved to; images refer into `images`.
pub(crate) fn layout(
    blocks: &[(&Block, Content<'_>)],
    images: &[DecodedImage],
    sheet: &Stylesheet,
    setup: &PageSetup,
) -> Vec<Page> {
    let mut flow = Flow::new(setup, sheet);
    for (block, content) in blocks {
        match content {
            Content::Block(kind) => flow.text_block(&block.element, kind),
            Content::Alt(alt) => flow.text_block(&block.element, &BlockKind::Text(alt.clone())),
            Content::Image {
                index,
                width,
                height,
            } => {
                if let Some(image) = images.get(*index) {
                    flow.image(*index, image, *width, *height);
                }
            }
        }
    }
    flow.pages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_block(element: &str, text: &str) -> Block {
        Block {
            element: element.to_string(),
            kind: BlockKind::Text(text.to_string()),
        }
    }

    fn run(blocks: &[Block], setup: &PageSetup) -> Vec<Page> {
        let contents: Vec<_> = blocks.iter().map(|b| (b, Content::Block(&b.kind))).collect();
        layout(&contents, &[], &Stylesheet::default(), setup)
    }

    #[test]
    fn test_single_paragraph_on_one_page() {
        let pages = run(&[text_block("p", "Hello world")], &PageSetup::default());
        assert_eq!(pages.len(), 1);
        let Placed::Text { x, y, size, text, .. } = &pages[0].items[0] else {
            panic!("expected text");
        };
        assert_eq!(text, "Hello world");
        assert_eq!(*x, 56.0);
        assert_eq!(*size, 11.0);
        assert!(*y < 842.0 - 56.0);
    }

    #[test]
    fn test_overflow_starts_new_pages() {
        let blocks: Vec<Block> = (0..200)
            .map(|i| text_block("p", &format!("Line {}", i)))
            .collect();
        let pages = run(&blocks, &PageSetup::default());
        assert!(pages.len() > 1);
        for page in &pages {
            for item in &page.items {
                if let Placed::Text { y, .. } = item {
                    assert!(*y >= 56.0 - 11.0, "text below bottom margin: {}", y);
                }
            }
        }
    }

    #[test]
    fn test_headings_are_bold_and_larger() {
        let pages = run(&[text_block("h1", "Title")], &PageSetup::default());
        assert!(matches!(
            pages[0].items[0],
            Placed::Text { font: Font::Bold, size, .. } if size == 22.0
        ));
    }

    #[test]
    fn test_css_overrides_sizes() {
        let mut sheet = Stylesheet::default();
        sheet.add_source("body { font-size: 2em } p { color: #0000ff }");
        let block = text_block("p", "Blue");
        let contents = vec![(&block, Content::Block(&block.kind))];
        let pages = layout(&contents, &[], &sheet, &PageSetup::default());

        let Placed::Text { size, color, .. } = pages[0].items[0] else {
            panic!("expected text");
        };
        assert_eq!(size, 22.0);
        assert_eq!(color, Rgb { r: 0.0, g: 0.0, b: 1.0 });
    }

    #[test]
    fn test_images_scale_to_content_width() {
        let image = DecodedImage {
            width_px: 2000,
            height_px: 1000,
            rgb: vec![0; 2000 * 1000 * 3],
        };
        let block = Block {
            element: "body".into(),
            kind: BlockKind::Rule,
        };
        let contents = vec![(
            &block,
            Content::Image {
                index: 0,
                width: None,
                height: None,
            },
        )];
        let setup = PageSetup::default();
        let pages = layout(&contents, &[image], &Stylesheet::default(), &setup);

        let Placed::Image { width, height, .. } = pages[0].items[0] else {
            panic!("expected image");
        };
        assert_eq!(width, setup.content_width());
        assert!((height - setup.content_width() / 2.0).abs() < 0.01);
    }

    #[test]
    fn test_list_items_get_bullets() {
        let block = Block {
            element: "li".into(),
            kind: BlockKind::ListItem("Apples".into()),
        };
        let pages = run(&[block], &PageSetup::default());
        let texts: Vec<_> = pages[0]
            .items
            .iter()
            .filter_map(|i| match i {
                Placed::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["•", "Apples"]);
    }
}
