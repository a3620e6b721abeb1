//! Just enough CSS to honour per-element font sizes and colours.
//!
//! Only element-type selectors (`p`, `h1`, `body`, ...) are applied, and
//! only the `font-size` and `color` properties. Everything else, including
//! at-rules, is skipped.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag_no_case, take_while_m_n},
    character::complete::{alpha1, char, digit1, multispace0},
    combinator::{all_consuming, map, map_opt, map_res, opt, recognize},
    sequence::{delimited, preceded, terminated},
};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub(crate) const BLACK: Rgb = Rgb { r: 0.0, g: 0.0, b: 0.0 };

    fn from_bytes(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    fn parse(value: &str) -> Option<Self> {
        run(alt((hex_color, named_color)), value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum FontSize {
    Points(f32),
    /// Relative to the document base size.
    Em(f32),
}

impl FontSize {
    fn parse(value: &str) -> Option<Self> {
        run(font_size, value)
    }

    pub(crate) fn resolve(self, base: f32) -> f32 {
        match self {
            FontSize::Points(pt) => pt,
            FontSize::Em(em) => em * base,
        }
    }
}

/// Parses an HTML length attribute (`"120"` or `"120px"`) into points.
pub(crate) fn parse_pixels(value: &str) -> Option<f32> {
    run(terminated(number, opt(tag_no_case("px"))), value)
        .filter(|px| *px > 0.0)
        .map(|px| px * 0.75)
}

// --- Value parsers ---

/// Runs `parser` over the whole of `input`, surrounding whitespace allowed.
fn run<'a, O, P>(parser: P, input: &'a str) -> Option<O>
where
    P: Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>,
{
    all_consuming(delimited(multispace0, parser, multispace0))
        .parse(input)
        .ok()
        .map(|(_, output)| output)
}

fn number(input: &str) -> IResult<&str, f32> {
    map_res(
        recognize((
            opt(alt((char('+'), char('-')))),
            alt((
                recognize((digit1, opt((char('.'), digit1)))),
                recognize((char('.'), digit1)),
            )),
        )),
        |s: &str| s.parse::<f32>(),
    )
    .parse(input)
}

fn font_size(input: &str) -> IResult<&str, FontSize> {
    alt((
        map((number, tag_no_case("pt")), |(pt, _): (f32, &str)| FontSize::Points(pt)),
        map((number, tag_no_case("px")), |(px, _): (f32, &str)| {
            FontSize::Points(px * 0.75)
        }),
        map((number, alt((tag_no_case("rem"), tag_no_case("em")))), |(em, _): (f32, &str)| {
            FontSize::Em(em)
        }),
        map((number, char('%')), |(pct, _): (f32, char)| FontSize::Em(pct / 100.0)),
    ))
    .parse(input)
}

fn is_hex_digit(c: char) -> bool {
    c.is_ascii_hexdigit()
}

fn hex_pair(input: &str) -> IResult<&str, u8> {
    map_res(take_while_m_n(2, 2, is_hex_digit), |s: &str| u8::from_str_radix(s, 16)).parse(input)
}

/// A single hex digit, doubled as in `#f00`.
fn hex_single(input: &str) -> IResult<&str, u8> {
    map_res(take_while_m_n(1, 1, is_hex_digit), |s: &str| {
        u8::from_str_radix(s, 16).map(|d| d * 17)
    })
    .parse(input)
}

fn hex_color(input: &str) -> IResult<&str, Rgb> {
    preceded(
        char('#'),
        alt((
            map((hex_pair, hex_pair, hex_pair), |(r, g, b): (u8, u8, u8)| {
                Rgb::from_bytes(r, g, b)
            }),
            map((hex_single, hex_single, hex_single), |(r, g, b): (u8, u8, u8)| {
                Rgb::from_bytes(r, g, b)
            }),
        )),
    )
    .parse(input)
}

fn named_color(input: &str) -> IResult<&str, Rgb> {
    map_opt(alpha1, |name: &str| match name.to_ascii_lowercase().as_str() {
        "black" => Some(Rgb::BLACK),
        "white" => Some(Rgb::from_bytes(255, 255, 255)),
        "red" => Some(Rgb::from_bytes(255, 0, 0)),
        "green" => Some(Rgb::from_bytes(0, 128, 0)),
        "blue" => Some(Rgb::from_bytes(0, 0, 255)),
        "gray" | "grey" => Some(Rgb::from_bytes(128, 128, 128)),
        _ => None,
    })
    .parse(input)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Declarations {
    pub font_size: Option<FontSize>,
    pub color: Option<Rgb>,
}

impl Declarations {
    fn merge(&mut self, other: &Declarations) {
        if other.font_size.is_some() {
            self.font_size = other.font_size;
        }
        if other.color.is_some() {
            self.color = other.color;
        }
    }
}

/// Declarations per element name, later sheets and rules overriding earlier ones.
#[derive(Debug, Clone, Default)]
pub(crate) struct Stylesheet {
    rules: HashMap<String, Declarations>,
}

impl Stylesheet {
    pub(crate) fn add_source(&mut self, css: &str) {
        let css = strip_comments(css);
        let mut rest = css.as_str();

        while let Some(open) = rest.find('{') {
            let prelude = rest[..open].trim();
            if prelude.starts_with('@') {
                // Skip the whole at-rule block, nested braces included.
                let close = matching_brace(&rest[open..]).map(|i| open + i);
                rest = close.map_or("", |i| &rest[i + 1..]);
                continue;
            }
            let Some(close) = rest[open..].find('}').map(|i| open + i) else {
                break;
            };
            let declarations = parse_declarations(&rest[open + 1..close]);
            for selector in prelude.split(',').map(str::trim) {
                if is_type_selector(selector) {
                    self.rules
                        .entry(selector.to_ascii_lowercase())
                        .or_default()
                        .merge(&declarations);
                }
            }
            rest = &rest[close + 1..];
        }
    }

    pub(crate) fn rule(&self, element: &str) -> Option<&Declarations> {
        self.rules.get(element)
    }
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Index of the `}` closing the `{` at the start of `block`.
fn matching_brace(block: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in block.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn is_type_selector(selector: &str) -> bool {
    !selector.is_empty() && selector.chars().all(|c| c.is_ascii_alphanumeric())
}

fn parse_declarations(block: &str) -> Declarations {
    let mut declarations = Declarations::default();
    for declaration in block.split(';') {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        let value = value.trim().trim_end_matches("!important").trim();
        match property.trim().to_ascii_lowercase().as_str() {
            "font-size" => declarations.font_size = FontSize::parse(value),
            "color" => declarations.color = Rgb::parse(value),
            _ => {}
        }
    }
    declarations
}
