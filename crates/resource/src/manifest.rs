//! Hashed-name manifest written when static files are collected.
//!
//! The manifest maps each logical asset name to the content-hashed file
//! actually present in the collected root:
//!
//! ```json
//! { "version": "1.1", "paths": { "css/site.css": "css/site.3f2a9c1b.css" } }
//! ```

use renderpdf_traits::StaticError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// File name of the manifest inside the collected root.
pub const MANIFEST_NAME: &str = "staticfiles.json";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub version: Option<String>,
    paths: HashMap<String, String>,
}

impl Manifest {
    pub fn from_json(json: &str) -> Result<Self, StaticError> {
        serde_json::from_str(json).map_err(|e| StaticError::Manifest(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, StaticError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            StaticError::Manifest(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Returns the hashed name stored for `name`.
    pub fn hashed_name(&self, name: &str) -> Option<&str> {
        self.paths.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
