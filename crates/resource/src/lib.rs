//! Static asset sources backed by the local filesystem.
//!
//! ## Available Sources
//!
//! - [`FilesystemFinder`]: searches a list of source directories, first hit wins
//! - [`FilesystemStorage`]: serves a collected root, optionally through a
//!   hashed-name manifest
//!
//! ## Re-exports
//!
//! For convenience, the in-memory storage and the no-op finder from
//! renderpdf-traits are re-exported:
//! - [`InMemoryStaticStorage`]
//! - [`NoFinder`]

mod filesystem;
mod manifest;

pub use filesystem::{FilesystemFinder, FilesystemStorage};
pub use manifest::{MANIFEST_NAME, Manifest};

pub use renderpdf_traits::{InMemoryStaticStorage, NoFinder};
