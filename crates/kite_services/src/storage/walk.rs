//! Directory traversal for `list`.
//!
//! A lazy, finite sequence of entries below a prefix. Traversal errors are
//! yielded in-line as `Err` items and do not stop the walk.

use crate::storage::root::is_reserved;
use crate::storage::{StorageError, StorageRoot};
use walkdir::WalkDir;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    Unknown,
}

impl EntryKind {
    /// Single-letter tag used on the wire.
    pub fn tag(self) -> char {
        match self {
            EntryKind::Directory => 'D',
            EntryKind::File => 'F',
            EntryKind::Unknown => '?',
        }
    }
}

/// One visible entry: its kind, path relative to the storage root, and name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub kind: EntryKind,
    pub path: String,
    pub name: String,
}

/// Walk everything under `prefix`, skipping reserved names (and never
/// descending into reserved directories). Entries come out sorted by name
/// within each directory.
pub fn walk<'a>(
    root: &'a StorageRoot,
    prefix: &str,
) -> Result<impl Iterator<Item = Result<WalkEntry, StorageError>> + 'a, StorageError> {
    let start = root.resolve(prefix)?;
    let prefix = prefix.to_string();
    let iter = WalkDir::new(start)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_reserved(&entry.file_name().to_string_lossy()))
        .map(move |entry| match entry {
            Ok(entry) => {
                let file_type = entry.file_type();
                let kind = if file_type.is_dir() {
                    EntryKind::Directory
                } else if file_type.is_file() {
                    EntryKind::File
                } else {
                    EntryKind::Unknown
                };
                Ok(WalkEntry {
                    kind,
                    path: root.relative(entry.path()),
                    name: entry.file_name().to_string_lossy().into_owned(),
                })
            }
            Err(err) => {
                let context = err
                    .path()
                    .map(|p| root.relative(p))
                    .unwrap_or_else(|| prefix.clone());
                let source = err
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
                Err(StorageError::io(context, source))
            }
        });
    Ok(iter)
}
