use renderpdf_traits::{RenderError, RenderOptions};
use serde_json::Value;

/// Page geometry and document settings derived from the render options.
///
/// Recognised keys:
///
/// | key | value |
/// |---|---|
/// | `page_size` | `"A4"`, `"A5"`, `"Letter"` or `"Legal"` |
/// | `margin` | margin on all sides, in points |
/// | `font_size` | base font size, in points |
/// | `title` / `author` | document information entries |
/// | `compress` | compress content streams |
///
/// Any other key is rejected with `RenderError::UnknownOption`.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSetup {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub font_size: f32,
    pub title: Option<String>,
    pub author: Option<String>,
    pub compress: bool,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            width: 595.0,
            height: 842.0,
            margin: 56.0,
            font_size: 11.0,
            title: None,
            author: None,
            compress: false,
        }
    }
}

impl PageSetup {
    pub fn from_options(options: &RenderOptions) -> Result<Self, RenderError> {
        let mut setup = Self::default();

        for (key, value) in options.iter() {
            match key.as_str() {
                "page_size" => {
                    let name = as_str(key, value)?;
                    let (width, height) = page_dimensions(name).ok_or_else(|| {
                        RenderError::InvalidOption {
                            key: key.clone(),
                            message: format!("unknown page size '{}'", name),
                        }
                    })?;
                    setup.width = width;
                    setup.height = height;
                }
                "margin" => setup.margin = as_non_negative(key, value)?,
                "font_size" => {
                    setup.font_size = as_non_negative(key, value)?;
                    if setup.font_size == 0.0 {
                        return Err(RenderError::InvalidOption {
                            key: key.clone(),
                            message: "font size must be positive".to_string(),
                        });
                    }
                }
                "title" => setup.title = Some(as_str(key, value)?.to_string()),
                "author" => setup.author = Some(as_str(key, value)?.to_string()),
                "compress" => {
                    setup.compress = value
                        .as_bool()
                        .ok_or_else(|| invalid(key, "expected a boolean"))?
                }
                _ => return Err(RenderError::UnknownOption(key.clone())),
            }
        }

        if setup.content_width() <= 0.0 || setup.content_height() <= 0.0 {
            return Err(invalid("margin", "margins leave no room for content"));
        }

        Ok(setup)
    }

    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    pub fn content_height(&self) -> f32 {
        self.height - 2.0 * self.margin
    }
}

fn page_dimensions(name: &str) -> Option<(f32, f32)> {
    match name.to_ascii_lowercase().as_str() {
        "a4" => Some((595.0, 842.0)),
        "a5" => Some((420.0, 595.0)),
        "letter" => Some((612.0, 792.0)),
        "legal" => Some((612.0, 1008.0)),
        _ => None,
    }
}

fn invalid(key: &str, message: &str) -> RenderError {
    RenderError::InvalidOption {
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn as_str<'a>(key: &str, value: &'a Value) -> Result<&'a str, RenderError> {
    value.as_str().ok_or_else(|| invalid(key, "expected a string"))
}

fn as_non_negative(key: &str, value: &Value) -> Result<f32, RenderError> {
    let number = value.as_f64().ok_or_else(|| invalid(key, "expected a number"))?;
    if number < 0.0 {
        return Err(invalid(key, "must not be negative"));
    }
    Ok(number as f32)
}
