//! Host directory layer.
//!
//! Reads a real directory through `tokio::fs`. Keys are relative to the
//! layer root and may not climb out of it.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::{ContentSource, LayerLocation};
use crate::error::{UnionError, UnionResult};
use crate::types::{ByteStream, DirEntry, FileType};

/// A host directory exposed as a layer.
///
/// All lookups are relative to `root`. For example, if `root` is
/// `/home/amy/mods/base`, the key `textures/grass.png` reads
/// `/home/amy/mods/base/textures/grass.png`.
#[derive(Debug, Clone)]
pub struct DirectoryLayer {
    root: PathBuf,
}

impl DirectoryLayer {
    /// Create a layer rooted at the given directory.
    ///
    /// The root is canonicalized at construction time when possible so that
    /// the reported location is stable (e.g. macOS `/tmp` → `/private/tmp`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        let root = root.canonicalize().unwrap_or(root);
        Self { root }
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to a host path inside the root.
    fn resolve(&self, key: &str) -> UnionResult<PathBuf> {
        if key.is_empty() {
            return Ok(self.root.clone());
        }
        if key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(UnionError::invalid_argument(format!(
                "layer key is not canonical: {}",
                key
            )));
        }
        Ok(self.root.join(key))
    }
}

fn is_absent(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

#[async_trait]
impl ContentSource for DirectoryLayer {
    fn location(&self) -> LayerLocation {
        LayerLocation::Directory(self.root.clone())
    }

    async fn entry_type(&self, key: &str) -> UnionResult<Option<FileType>> {
        let full_path = self.resolve(key)?;
        match fs::metadata(&full_path).await {
            Ok(meta) if meta.is_dir() => Ok(Some(FileType::Directory)),
            Ok(_) => Ok(Some(FileType::File)),
            // A file used as a directory (`file.txt/child`) is simply absent
            Err(e) if is_absent(&e) => Ok(None),
            Err(e) => Err(UnionError::from(e)),
        }
    }

    async fn open(&self, key: &str) -> UnionResult<ByteStream> {
        let full_path = self.resolve(key)?;
        let meta = fs::metadata(&full_path).await?;
        if meta.is_dir() {
            return Err(UnionError::is_a_directory(key));
        }
        let file = fs::File::open(&full_path).await?;
        Ok(Box::pin(file))
    }

    async fn read_dir(&self, key: &str) -> UnionResult<Vec<DirEntry>> {
        let full_path = self.resolve(key)?;
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&full_path).await?;

        while let Some(entry) = dir.next_entry().await? {
            let mut file_type = entry.file_type().await?;
            if file_type.is_symlink() {
                match fs::metadata(entry.path()).await {
                    Ok(meta) => file_type = meta.file_type(),
                    Err(e) if is_absent(&e) => {
                        tracing::trace!(path = %entry.path().display(), "skipping dangling symlink");
                        continue;
                    }
                    Err(e) => return Err(UnionError::from(e)),
                }
            }
            let kind = if file_type.is_dir() {
                FileType::Directory
            } else {
                FileType::File
            };

            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
