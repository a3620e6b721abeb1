//! Standard-14 font handling: resource names, WinAnsi encoding, widths.

/// The three standard Type1 fonts every generated document references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Font {
    Regular,
    Bold,
    Mono,
}

impl Font {
    pub(crate) const ALL: [Font; 3] = [Font::Regular, Font::Bold, Font::Mono];

    pub(crate) fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Mono => "F3",
        }
    }

    pub(crate) fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Mono => "Courier",
        }
    }
}

/// Approximate advance width of `c` in 1/1000 em.
///
/// Helvetica metrics bucketed by glyph shape; close enough for line
/// breaking without shipping the AFM tables.
fn glyph_width(c: char, font: Font) -> f32 {
    if font == Font::Mono {
        return 600.0;
    }
    let width = match c {
        ' ' | 'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '!' | '|' | '\'' => 278.0,
        'f' | 't' | 'I' | 'r' | '(' | ')' | '[' | ']' | '-' | '/' => 333.0,
        'm' => 833.0,
        'w' | 'M' => 833.0,
        'W' => 944.0,
        'c' | 'k' | 's' | 'v' | 'x' | 'y' | 'z' | 'J' => 500.0,
        'A' | 'B' | 'E' | 'K' | 'P' | 'S' | 'V' | 'X' | 'Y' => 667.0,
        'C' | 'D' | 'H' | 'N' | 'R' | 'U' => 722.0,
        'G' | 'O' | 'Q' => 778.0,
        'F' | 'T' | 'Z' => 611.0,
        'L' => 556.0,
        '@' => 1015.0,
        _ => 556.0,
    };
    if font == Font::Bold {
        width * 1.05
    } else {
        width
    }
}

/// Width of `text` in points at `size`.
pub(crate) fn text_width(text: &str, size: f32, font: Font) -> f32 {
    text.chars().map(|c| glyph_width(c, font)).sum::<f32>() * size / 1000.0
}

/// Encodes `text` for a font using `WinAnsiEncoding`.
///
/// Characters outside the code page become `?`.
pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            '\t' => b' ',
            _ => b'?',
        })
        .collect()
}

/// Greedy word wrap of `text` into lines no wider than `max_width`.
///
/// A single word wider than the line is put on its own line rather than
/// split.
pub(crate) fn wrap(text: &str, size: f32, font: Font, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate_width = text_width(&current, size, font) + text_width(" ", size, font)
            + text_width(word, size, font);
        if candidate_width <= max_width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
