//! Filesystem-based static asset finder and storage.
//!
//! # Security
//!
//! Both types only ever resolve names inside their configured directories.
//! Absolute names and names that would escape a directory (e.g.
//! `../../../etc/passwd`) never match.

use log::debug;
use renderpdf_traits::{StaticError, StaticFinder, StaticStorage};
use std::path::{Component, Path, PathBuf};

use crate::manifest::{MANIFEST_NAME, Manifest};

/// Resolves `name` below `base`, or `None` if it would leave `base`.
fn resolve_below(base: &Path, canonical_base: Option<&Path>, name: &str) -> Option<PathBuf> {
    if Path::new(name).is_absolute() {
        return None;
    }

    let full_path = base.join(name);

    if let Ok(canonical) = full_path.canonicalize()
        && let Some(base) = canonical_base
    {
        // Symlinks may still point outside the base.
        return canonical.starts_with(base).then_some(canonical);
    }

    // Nothing on disk to canonicalize; reject obvious traversal instead.
    if Path::new(name)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return None;
    }

    Some(full_path)
}

#[derive(Debug, Clone)]
struct SourceDir {
    path: PathBuf,
    canonical: Option<PathBuf>,
}

impl SourceDir {
    fn new(path: PathBuf) -> Self {
        let canonical = path.canonicalize().ok();
        Self { path, canonical }
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        resolve_below(&self.path, self.canonical.as_deref(), name)
    }
}

/// Finds assets in an ordered list of source directories.
///
/// The first directory containing a regular file under the requested name
/// wins, mirroring how per-application asset directories shadow each other.
#[derive(Debug, Clone, Default)]
pub struct FilesystemFinder {
    dirs: Vec<SourceDir>,
}

impl FilesystemFinder {
    pub fn new<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self {
            dirs: dirs
                .into_iter()
                .map(|d| SourceDir::new(d.as_ref().to_path_buf()))
                .collect(),
        }
    }

    pub fn add_dir<P: AsRef<Path>>(&mut self, dir: P) {
        self.dirs.push(SourceDir::new(dir.as_ref().to_path_buf()));
    }

    pub fn dirs(&self) -> impl Iterator<Item = &Path> {
        self.dirs.iter().map(|d| d.path.as_path())
    }
}

impl StaticFinder for FilesystemFinder {
    fn find(&self, name: &str) -> Option<PathBuf> {
        let found = self
            .dirs
            .iter()
            .filter_map(|dir| dir.resolve(name))
            .find(|path| path.is_file());
        debug!("finder lookup for '{}': {:?}", name, found);
        found
    }
}

/// Serves assets from a collected root directory.
///
/// With a manifest loaded, logical names are translated to their hashed
/// counterparts first, and names missing from the manifest are not found.
#[derive(Debug, Clone)]
pub struct FilesystemStorage {
    root: SourceDir,
    manifest: Option<Manifest>,
}

impl FilesystemStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: SourceDir::new(root.as_ref().to_path_buf()),
            manifest: None,
        }
    }

    /// Loads `staticfiles.json` from the root.
    pub fn with_manifest(self) -> Result<Self, StaticError> {
        let manifest = Manifest::load(&self.root.path.join(MANIFEST_NAME))?;
        Ok(self.with_manifest_data(manifest))
    }

    pub fn with_manifest_data(mut self, manifest: Manifest) -> Self {
        debug!(
            "static storage at {} uses a manifest with {} entries",
            self.root.path.display(),
            manifest.len()
        );
        self.manifest = Some(manifest);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root.path
    }

    fn stored_name<'a>(&'a self, name: &'a str) -> Result<&'a str, StaticError> {
        match &self.manifest {
            Some(manifest) => manifest
                .hashed_name(name)
                .ok_or_else(|| StaticError::NotFound(name.to_string())),
            None => Ok(name),
        }
    }
}

impl StaticStorage for FilesystemStorage {
    fn open(&self, name: &str) -> Result<Vec<u8>, StaticError> {
        let stored = self.stored_name(name)?;
        let path = self
            .root
            .resolve(stored)
            .ok_or_else(|| StaticError::InvalidName(name.to_string()))?;

        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StaticError::NotFound(name.to_string()),
            // Opening a directory is as good as missing.
            std::io::ErrorKind::IsADirectory => StaticError::NotFound(name.to_string()),
            _ => StaticError::ReadFailed {
                name: name.to_string(),
                message: e.to_string(),
            },
        })
    }

    fn name(&self) -> &'static str {
        "FilesystemStorage"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_finder_first_directory_wins() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        fs::write(first.path().join("styles.css"), b"first").unwrap();
        fs::write(second.path().join("styles.css"), b"second").unwrap();
        fs::write(second.path().join("only.css"), b"only").unwrap();

        let finder = FilesystemFinder::new([first.path(), second.path()]);
        let found = finder.find("styles.css").unwrap();
        assert_eq!(fs::read(found).unwrap(), b"first");

        let found = finder.find("only.css").unwrap();
        assert_eq!(fs::read(found).unwrap(), b"only");
    }

    #[test]
    fn test_finder_ignores_directories_and_missing_files() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("css")).unwrap();

        let finder = FilesystemFinder::new([dir.path()]);
        assert!(finder.find("css").is_none());
        assert!(finder.find("missing.css").is_none());
    }

    #[test]
    fn test_finder_blocks_path_traversal() {
        let outer = tempdir().unwrap();
        let inner = outer.path().join("static");
        fs::create_dir(&inner).unwrap();
        fs::write(outer.path().join("secret.txt"), b"secret").unwrap();

        let finder = FilesystemFinder::new([&inner]);
        assert!(finder.find("../secret.txt").is_none());
        assert!(finder.find("/etc/passwd").is_none());
    }

    #[test]
    fn test_finder_nested_names() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("img")).unwrap();
        fs::write(dir.path().join("img/logo.png"), b"png").unwrap();

        let mut finder = FilesystemFinder::default();
        finder.add_dir(dir.path());
        assert!(finder.find("img/logo.png").is_some());
        assert_eq!(finder.dirs().count(), 1);
    }

    #[test]
    fn test_storage_open_plain() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("styles.css"), b"html { margin: 0; }\n").unwrap();

        let storage = FilesystemStorage::new(dir.path());
        assert_eq!(storage.open("styles.css").unwrap(), b"html { margin: 0; }\n");
    }

    #[test]
    fn test_storage_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path());

        let err = storage.open("missing.css").unwrap_err();
        assert!(matches!(err, StaticError::NotFound(_)));
    }

    #[test]
    fn test_storage_traversal_is_invalid_name() {
        let outer = tempdir().unwrap();
        let root = outer.path().join("collected");
        fs::create_dir(&root).unwrap();
        fs::write(outer.path().join("secret.txt"), b"secret").unwrap();

        let storage = FilesystemStorage::new(&root);
        let err = storage.open("../secret.txt").unwrap_err();
        assert!(matches!(err, StaticError::InvalidName(_)));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_storage_with_manifest_opens_hashed_name() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("styles.abc123.css"), b"hashed").unwrap();
        fs::write(dir.path().join("styles.css"), b"unhashed").unwrap();
        fs::write(
            dir.path().join(MANIFEST_NAME),
            br#"{"version": "1.1", "paths": {"styles.css": "styles.abc123.css"}}"#,
        )
        .unwrap();

        let storage = FilesystemStorage::new(dir.path()).with_manifest().unwrap();
        assert_eq!(storage.open("styles.css").unwrap(), b"hashed");

        // Only names listed in the manifest exist.
        let err = storage.open("styles.abc123.css").unwrap_err();
        assert!(matches!(err, StaticError::NotFound(_)));
    }

    #[test]
    fn test_storage_missing_manifest_fails_to_load() {
        let dir = tempdir().unwrap();
        let err = FilesystemStorage::new(dir.path()).with_manifest().unwrap_err();
        assert!(matches!(err, StaticError::Manifest(_)));
    }
}
