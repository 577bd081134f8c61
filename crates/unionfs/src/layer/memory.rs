//! In-memory layer.
//!
//! Used for embedded resources, extracted archive contents and testing.
//! The tree is built up front and never changes once handed to a filesystem.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Arc;

use super::{ContentSource, LayerLocation};
use crate::error::{UnionError, UnionResult};
use crate::types::{child_key, ByteStream, DirEntry, FileType};

/// Entry in the memory tree.
#[derive(Debug, Clone)]
enum Entry {
    File { data: Arc<[u8]> },
    Directory,
}

impl Entry {
    fn kind(&self) -> FileType {
        match self {
            Entry::File { .. } => FileType::File,
            Entry::Directory => FileType::Directory,
        }
    }
}

/// Immutable in-memory directory tree.
///
/// ```
/// use unionfs::MemoryLayer;
///
/// let layer = MemoryLayer::new("fixtures")
///     .with_file("masktest.txt", "dir1")
///     .with_file("subdir1/masktestsd1.txt", "sd1")
///     .with_dir("empty");
/// ```
#[derive(Debug, Clone)]
pub struct MemoryLayer {
    name: String,
    entries: BTreeMap<String, Entry>,
}

impl MemoryLayer {
    /// Create an empty tree. The root directory always exists.
    pub fn new(name: impl Into<String>) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(String::new(), Entry::Directory);
        Self {
            name: name.into(),
            entries,
        }
    }

    /// Add a file, creating parent directories as needed.
    ///
    /// An existing entry at the same path is replaced.
    pub fn with_file(mut self, path: &str, data: impl AsRef<[u8]>) -> Self {
        let key = Self::normalize(path);
        self.ensure_parents(&key);
        self.entries.insert(
            key,
            Entry::File {
                data: Arc::from(data.as_ref()),
            },
        );
        self
    }

    /// Add a directory (and its parents).
    pub fn with_dir(mut self, path: &str) -> Self {
        let key = Self::normalize(path);
        self.ensure_parents(&key);
        self.entries.insert(key, Entry::Directory);
        self
    }

    /// Number of entries, including the root.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when only the root exists.
    pub fn is_empty(&self) -> bool {
        self.entries.len() == 1
    }

    /// Normalize a path: remove leading `/`, resolve `.` and `..`.
    fn normalize(path: &str) -> String {
        let mut parts: Vec<&str> = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                s => parts.push(s),
            }
        }
        parts.join("/")
    }

    /// Ensure all parent directories exist.
    fn ensure_parents(&mut self, key: &str) {
        for (idx, _) in key.match_indices('/') {
            self.entries
                .entry(key[..idx].to_string())
                .or_insert(Entry::Directory);
        }
    }

    fn parent_of(key: &str) -> Option<&str> {
        if key.is_empty() {
            return None;
        }
        Some(key.rfind('/').map(|idx| &key[..idx]).unwrap_or(""))
    }
}

#[async_trait]
impl ContentSource for MemoryLayer {
    fn location(&self) -> LayerLocation {
        LayerLocation::Memory(self.name.clone())
    }

    async fn entry_type(&self, key: &str) -> UnionResult<Option<FileType>> {
        Ok(self.entries.get(key).map(Entry::kind))
    }

    async fn open(&self, key: &str) -> UnionResult<ByteStream> {
        match self.entries.get(key) {
            Some(Entry::File { data }) => Ok(Box::pin(Cursor::new(Arc::clone(data)))),
            Some(Entry::Directory) => Err(UnionError::is_a_directory(key)),
            None => Err(UnionError::not_found(key)),
        }
    }

    async fn read_dir(&self, key: &str) -> UnionResult<Vec<DirEntry>> {
        match self.entries.get(key) {
            Some(Entry::Directory) => {}
            Some(_) => return Err(UnionError::not_a_directory(key)),
            None => return Err(UnionError::not_found(key)),
        }

        // BTreeMap order keeps children sorted by full key, which for
        // siblings is the same as sorting by name.
        let prefix = child_key(key, "");
        let result = self
            .entries
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter(|(path, _)| Self::parent_of(path) == Some(key))
            .map(|(path, entry)| DirEntry {
                name: path[prefix.len()..].to_string(),
                kind: entry.kind(),
            })
            .collect();
        Ok(result)
    }
}
