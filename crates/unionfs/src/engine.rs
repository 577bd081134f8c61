//! The overlay engine.
//!
//! A [`UnionFs`] merges an ordered list of layers into one read-only tree.
//! Layer 0 has the highest priority: lookups return the first layer with a
//! visible entry, and directory listings keep the first visible entry for
//! each name.

use indexmap::IndexMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::io::AsyncReadExt;

use crate::error::{UnionError, UnionResult};
use crate::layer::{ContentSource, Layer, LayerLocation};
use crate::mask::MaskPredicate;
use crate::path::{FsHandle, UnionPath};
use crate::types::{child_key, ByteStream, DirEntry, FileType};

/// A union filesystem instance.
///
/// Always handed out as `Arc<UnionFs>`. The layer list and the mask never
/// change after construction, so concurrent readers need no locking.
pub struct UnionFs {
    key: Arc<str>,
    layers: Vec<Layer>,
    mask: MaskPredicate,
    closed: AtomicBool,
    me: Weak<UnionFs>,
}

impl UnionFs {
    /// Build a filesystem over `sources` in priority order.
    pub(crate) fn new(
        key: impl Into<Arc<str>>,
        sources: Vec<Arc<dyn ContentSource>>,
        mask: MaskPredicate,
    ) -> Arc<Self> {
        let key = key.into();
        let layers: Vec<Layer> = sources
            .into_iter()
            .enumerate()
            .map(|(rank, source)| Layer::new(rank, source))
            .collect();
        tracing::debug!(
            key = %key,
            layers = layers.len(),
            "created union filesystem"
        );
        Arc::new_cyclic(|me| Self {
            key,
            layers,
            mask,
            closed: AtomicBool::new(false),
            me: me.clone(),
        })
    }

    fn handle(&self) -> FsHandle {
        FsHandle::new(Arc::clone(&self.key), self.me.clone())
    }

    /// Identity key, used in URIs and registry lookups.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns false once [`close`](Self::close) has been called.
    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    fn check_open(&self) -> UnionResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(UnionError::Closed)
        }
    }

    /// Parse a path in this filesystem.
    pub fn get_path(&self, path: &str) -> UnionPath {
        UnionPath::parse(self.handle(), &[path])
    }

    /// Parse and join several strings into one path.
    ///
    /// Empty parts are skipped, so `["", "one", "two"]` is the relative path
    /// `one/two` and `["/", "one"]` is `/one`.
    pub fn get_path_parts<S: AsRef<str>>(&self, parts: &[S]) -> UnionPath {
        UnionPath::parse(self.handle(), parts)
    }

    /// The root directory `/`.
    pub fn root(&self) -> UnionPath {
        UnionPath::root_of(self.handle())
    }

    /// Layers in priority order.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Locations of all layers in priority order.
    pub fn base_paths(&self) -> Vec<LayerLocation> {
        self.layers.iter().map(Layer::location).collect()
    }

    /// The visibility predicate.
    pub fn mask(&self) -> &MaskPredicate {
        &self.mask
    }

    /// Lookup key for a path, after checking it belongs here.
    pub(crate) fn key_for(&self, path: &UnionPath) -> UnionResult<String> {
        self.check_open()?;
        if path.fs_key() != self.key() {
            return Err(UnionError::invalid_argument(format!(
                "path '{}' belongs to filesystem {}, not {}",
                path,
                path.fs_key(),
                self.key
            )));
        }
        Ok(path.lookup_key())
    }

    /// First layer with a visible entry at `key`.
    pub(crate) async fn find(&self, key: &str) -> UnionResult<Option<(&Layer, FileType)>> {
        self.check_open()?;
        for layer in &self.layers {
            if !self.mask.admits_ancestors(key, layer) {
                continue;
            }
            let Some(kind) = layer.source().entry_type(key).await? else {
                continue;
            };
            if self.mask.admits_entry(key, kind, layer) {
                tracing::trace!(key, rank = layer.rank(), "resolved");
                return Ok(Some((layer, kind)));
            }
        }
        tracing::trace!(key, "no visible entry");
        Ok(None)
    }

    /// Merged, masked children of the directory at `key`.
    ///
    /// Names are deduplicated: the highest-priority layer exposing a name
    /// wins. Order is layer priority, then each layer's name order.
    pub(crate) async fn list_key(&self, key: &str) -> UnionResult<Vec<DirEntry>> {
        self.check_open()?;
        let mut merged: IndexMap<String, FileType> = IndexMap::new();
        let mut found_dir = false;

        for layer in &self.layers {
            if !self.mask.admits_ancestors(key, layer) {
                continue;
            }
            match layer.source().entry_type(key).await? {
                Some(FileType::Directory)
                    if self.mask.admits_entry(key, FileType::Directory, layer) => {}
                _ => continue,
            }
            found_dir = true;

            for entry in layer.source().read_dir(key).await? {
                if merged.contains_key(&entry.name) {
                    continue;
                }
                let child = child_key(key, &entry.name);
                if self.mask.admits_entry(&child, entry.kind, layer) {
                    merged.insert(entry.name, entry.kind);
                }
            }
        }

        if !found_dir {
            return match self.find(key).await? {
                Some(_) => Err(UnionError::not_a_directory(key)),
                None => Err(UnionError::not_found(key)),
            };
        }

        Ok(merged
            .into_iter()
            .map(|(name, kind)| DirEntry { name, kind })
            .collect())
    }

    /// Open the file at `key` from its winning layer.
    pub(crate) async fn open_key(&self, key: &str) -> UnionResult<ByteStream> {
        match self.find(key).await? {
            Some((_, FileType::Directory)) => Err(UnionError::is_a_directory(key)),
            Some((layer, FileType::File)) => layer.source().open(key).await,
            None => Err(UnionError::not_found(key)),
        }
    }

    /// Whether a visible entry exists at `path` in any layer.
    pub async fn exists(&self, path: &UnionPath) -> UnionResult<bool> {
        let key = self.key_for(path)?;
        Ok(self.find(&key).await?.is_some())
    }

    /// Type of the visible entry at `path`.
    pub async fn file_type(&self, path: &UnionPath) -> UnionResult<FileType> {
        let key = self.key_for(path)?;
        self.find(&key)
            .await?
            .map(|(_, kind)| kind)
            .ok_or_else(|| UnionError::not_found(path.to_string()))
    }

    /// True if `path` is a visible regular file.
    pub async fn is_file(&self, path: &UnionPath) -> UnionResult<bool> {
        let key = self.key_for(path)?;
        Ok(matches!(self.find(&key).await?, Some((_, FileType::File))))
    }

    /// True if `path` is a visible directory.
    pub async fn is_dir(&self, path: &UnionPath) -> UnionResult<bool> {
        let key = self.key_for(path)?;
        Ok(matches!(self.find(&key).await?, Some((_, FileType::Directory))))
    }

    /// The layer that serves `path`, if any.
    pub async fn resolve_layer(&self, path: &UnionPath) -> UnionResult<Option<Layer>> {
        let key = self.key_for(path)?;
        Ok(self.find(&key).await?.map(|(layer, _)| layer.clone()))
    }

    /// Open a file for reading from the highest-priority visible layer.
    pub async fn open(&self, path: &UnionPath) -> UnionResult<ByteStream> {
        let key = self.key_for(path)?;
        self.open_key(&key).await.map_err(|e| match e {
            UnionError::NotFound(_) => UnionError::not_found(path.to_string()),
            other => other,
        })
    }

    /// Read a whole file.
    pub async fn read(&self, path: &UnionPath) -> UnionResult<Vec<u8>> {
        let mut stream = self.open(path).await?;
        let mut data = Vec::new();
        stream.read_to_end(&mut data).await?;
        Ok(data)
    }

    /// Read a whole file as UTF-8.
    pub async fn read_to_string(&self, path: &UnionPath) -> UnionResult<String> {
        let data = self.read(path).await?;
        String::from_utf8(data).map_err(|e| {
            UnionError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    /// Merged children of a directory, as paths resolved against `path`.
    pub async fn read_dir(&self, path: &UnionPath) -> UnionResult<Vec<UnionPath>> {
        let key = self.key_for(path)?;
        let entries = self.list_key(&key).await?;
        Ok(entries
            .iter()
            .map(|entry| path.resolve_str(&entry.name))
            .collect())
    }

    /// Close the filesystem and release every layer.
    ///
    /// Idempotent. Every layer is released once even if an earlier release
    /// fails; the first failure is returned.
    pub async fn close(&self) -> UnionResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::debug!(key = %self.key, "closing union filesystem");

        let mut first_err = None;
        for layer in &self.layers {
            if let Err(e) = layer.source().release().await {
                tracing::warn!(location = %layer.location(), error = %e, "layer release failed");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for UnionFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnionFs")
            .field("key", &self.key)
            .field("layers", &self.base_paths())
            .field("mask", &self.mask)
            .field("open", &self.is_open())
            .finish()
    }
}
