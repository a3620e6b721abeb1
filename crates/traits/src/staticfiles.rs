//! Static asset lookup abstractions.
//!
//! Static assets are addressed by a logical name (`css/site.css`) that is
//! independent of where the file actually lives. Two lookups exist:
//!
//! - a [`StaticFinder`] maps a name to a file in one of the source
//!   directories (only meaningful while developing);
//! - a [`StaticStorage`] opens a name from wherever assets are served in
//!   production, e.g. a collected root with content-hashed filenames.

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::RwLock;
use thiserror::Error;

/// Error type for static asset storage.
#[derive(Error, Debug, Clone)]
pub enum StaticError {
    #[error("Static file not found: {0}")]
    NotFound(String),

    /// The name can never refer to a stored asset (absolute, escapes the root, ...).
    #[error("Invalid static file name: {0}")]
    InvalidName(String),

    #[error("Failed to read static file '{name}': {message}")]
    ReadFailed { name: String, message: String },

    #[error("Invalid manifest: {0}")]
    Manifest(String),
}

impl StaticError {
    /// Whether this error only means "not a static asset".
    ///
    /// The fetcher treats such names as ordinary site-relative URLs instead
    /// of failing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StaticError::NotFound(_) | StaticError::InvalidName(_))
    }
}

/// Maps a logical asset name to a file in one of the registered sources.
pub trait StaticFinder: Send + Sync + Debug {
    /// Returns the path of the first source file matching `name`.
    fn find(&self, name: &str) -> Option<PathBuf>;
}

/// Opens assets the way they are served in production.
pub trait StaticStorage: Send + Sync + Debug {
    fn open(&self, name: &str) -> Result<Vec<u8>, StaticError>;

    /// Human-readable name for logging.
    fn name(&self) -> &'static str;
}

/// A finder that never finds anything.
///
/// Useful when every asset is served from storage, which is the normal
/// situation for production deployments.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFinder;

impl StaticFinder for NoFinder {
    fn find(&self, _name: &str) -> Option<PathBuf> {
        None
    }
}

/// Storage backed by a pre-populated map.
#[derive(Debug, Default)]
pub struct InMemoryStaticStorage {
    assets: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryStaticStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an asset.
    ///
    /// # Errors
    ///
    /// Returns `StaticError::ReadFailed` if the internal lock is poisoned.
    pub fn add(
        &self,
        name: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Result<(), StaticError> {
        let name = name.into();
        let mut assets = self.assets.write().map_err(|_| StaticError::ReadFailed {
            name: name.clone(),
            message: "asset store lock poisoned".to_string(),
        })?;
        assets.insert(name, data.into());
        Ok(())
    }

    /// Builder-style variant of [`add`](Self::add) for fixtures.
    pub fn with(self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        if let Ok(mut assets) = self.assets.write() {
            assets.insert(name.into(), data.into());
        }
        self
    }

    /// Returns 0 if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.assets.read().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StaticStorage for InMemoryStaticStorage {
    fn open(&self, name: &str) -> Result<Vec<u8>, StaticError> {
        let assets = self.assets.read().map_err(|_| StaticError::ReadFailed {
            name: name.to_string(),
            message: "asset store lock poisoned".to_string(),
        })?;
        assets
            .get(name)
            .cloned()
            .ok_or_else(|| StaticError::NotFound(name.to_string()))
    }

    fn name(&self) -> &'static str {
        "InMemoryStaticStorage"
    }
}
