//! Template lookup and Handlebars rendering.
//!
//! Templates are addressed by name (`reports/invoice.html`). A
//! [`TemplateLoader`] knows a list of directories plus any templates
//! registered in memory, and [`TemplateLoader::select`] picks the first
//! candidate name that exists.

use crate::error::TemplateError;
use handlebars::Handlebars;
use log::debug;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Ordered, non-empty list of candidate template names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateNames(Vec<String>);

impl TemplateNames {
    /// Returns `None` for an empty list.
    pub fn new<I, S>(names: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() { None } else { Some(Self(names)) }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn first(&self) -> &str {
        // Never empty by construction.
        self.0.first().map_or("", String::as_str)
    }
}

impl From<&str> for TemplateNames {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for TemplateNames {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl fmt::Display for TemplateNames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// A template chosen by [`TemplateLoader::select`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    pub source: String,
}

impl Template {
    /// Renders with Handlebars; HTML-escapes interpolated values.
    pub fn render(&self, context: &Map<String, Value>) -> Result<String, TemplateError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        registry
            .render_template(&self.source, context)
            .map_err(|e| TemplateError::Render {
                name: self.name.clone(),
                message: e.to_string(),
            })
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateLoader {
    dirs: Vec<PathBuf>,
    in_memory: HashMap<String, String>,
}

impl TemplateLoader {
    pub fn new<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
            in_memory: HashMap::new(),
        }
    }

    /// Registers a template that is found before any directory is searched.
    pub fn with_template(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.add_template(name, source);
        self
    }

    pub fn add_template(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.in_memory.insert(name.into(), source.into());
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Looks up a single name. Names that would escape the template
    /// directories never match.
    pub fn find(&self, name: &str) -> Result<Option<Template>, TemplateError> {
        if let Some(source) = self.in_memory.get(name) {
            return Ok(Some(Template {
                name: name.to_string(),
                source: source.clone(),
            }));
        }
        if !is_relative_name(name) {
            return Ok(None);
        }
        for dir in &self.dirs {
            let path = dir.join(name);
            if path.is_file() {
                let source = std::fs::read_to_string(&path).map_err(|source| TemplateError::Read {
                    name: name.to_string(),
                    source,
                })?;
                debug!("Loaded template '{}' from {}", name, path.display());
                return Ok(Some(Template {
                    name: name.to_string(),
                    source,
                }));
            }
        }
        Ok(None)
    }

    /// Returns the first candidate that exists.
    pub fn select(&self, names: &TemplateNames) -> Result<Template, TemplateError> {
        for name in names.iter() {
            if let Some(template) = self.find(name)? {
                return Ok(template);
            }
            debug!("Template '{}' not found, trying next candidate", name);
        }
        Err(TemplateError::NotFound(names.clone()))
    }

    pub fn render(
        &self,
        names: &TemplateNames,
        context: &Map<String, Value>,
    ) -> Result<String, TemplateError> {
        self.select(names)?.render(context)
    }
}

fn is_relative_name(name: &str) -> bool {
    !name.is_empty()
        && Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
