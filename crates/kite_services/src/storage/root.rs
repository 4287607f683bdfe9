//! Storage root and path resolution.

use crate::storage::StorageError;
use std::path::{Component, Path, PathBuf};

/// Names starting with this marker are internal and hidden from listings.
pub const RESERVED_PREFIX: &str = "__";

/// Staging file for pushes, relative to the storage root.
pub const STAGING_FILE: &str = "__tmp.txt";

/// Directory every protocol path is resolved against.
#[derive(Debug, Clone)]
pub struct StorageRoot {
    path: PathBuf,
}

impl StorageRoot {
    /// Use `path` as the storage root, creating it if missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        std::fs::create_dir_all(&path).map_err(|e| {
            StorageError::io(format!("Cannot create storage root {}", path.display()), e)
        })?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn staging_path(&self) -> PathBuf {
        self.path.join(STAGING_FILE)
    }

    /// Resolve a protocol path (leading `/` optional) to a path under the root.
    ///
    /// An empty path resolves to the root itself. `..` and platform prefixes
    /// are rejected so a command can never escape the root.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, StorageError> {
        let mut resolved = self.path.clone();
        for component in Path::new(name).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(StorageError::InvalidArgument(format!(
                        "path escapes storage root: {}",
                        name
                    )));
                }
            }
        }
        Ok(resolved)
    }

    /// Like [`StorageRoot::resolve`], but the path must name something below
    /// the root.
    pub fn resolve_file(&self, name: &str) -> Result<PathBuf, StorageError> {
        let resolved = self.resolve(name)?;
        if resolved == self.path {
            return Err(StorageError::InvalidArgument(format!(
                "not a file name: {:?}",
                name
            )));
        }
        Ok(resolved)
    }

    /// Express `path` relative to the root with `/` separators.
    pub fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.path).unwrap_or(path);
        rel.components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Whether `name` is reserved for internal files.
pub fn is_reserved(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}
