//! Base layers: the content sources merged by a union filesystem.
//!
//! Every source is addressed by a canonical relative key: no leading `/`,
//! no `.` or `..`, segments joined by `/`, and `""` for the source root.
//! The engine normalizes paths before any source sees them.

mod directory;
mod lazy;
mod memory;
mod union;

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::UnionResult;
use crate::path::UnionPath;
use crate::types::{ByteStream, DirEntry, FileType};

pub use directory::DirectoryLayer;
pub use lazy::{LazyLayer, SourceLoader};
pub use memory::MemoryLayer;
pub use union::UnionLayer;

/// Where a layer's content comes from.
///
/// Used for `base_paths()` reporting and for filesystem identity keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LayerLocation {
    /// A host directory.
    Directory(PathBuf),
    /// A path inside another union filesystem, as its URI.
    Union(String),
    /// A named in-memory tree.
    Memory(String),
    /// Anything else, described by the source itself.
    Custom(String),
}

impl fmt::Display for LayerLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerLocation::Directory(path) => write!(f, "dir:{}", path.display()),
            LayerLocation::Union(uri) => write!(f, "{}", uri),
            LayerLocation::Memory(name) => write!(f, "memory:{}", name),
            LayerLocation::Custom(desc) => write!(f, "custom:{}", desc),
        }
    }
}

/// Read access to one content source.
///
/// Implementations must be safe to share between concurrent readers.
#[async_trait]
pub trait ContentSource: Send + Sync + fmt::Debug {
    /// Stable description of this source.
    fn location(&self) -> LayerLocation;

    /// Type of the entry at `key`, or `None` if it does not exist.
    async fn entry_type(&self, key: &str) -> UnionResult<Option<FileType>>;

    /// Open the file at `key` for reading.
    async fn open(&self, key: &str) -> UnionResult<ByteStream>;

    /// Immediate children of the directory at `key`, sorted by name.
    async fn read_dir(&self, key: &str) -> UnionResult<Vec<DirEntry>>;

    /// Release any handle held by this source.
    ///
    /// Called exactly once, when the owning filesystem is closed.
    async fn release(&self) -> UnionResult<()> {
        Ok(())
    }
}

/// A content source at a fixed priority rank inside one filesystem.
///
/// Rank 0 is the highest priority.
#[derive(Debug, Clone)]
pub struct Layer {
    rank: usize,
    source: Arc<dyn ContentSource>,
}

impl Layer {
    /// Create a layer at the given rank.
    pub fn new(rank: usize, source: Arc<dyn ContentSource>) -> Self {
        Self { rank, source }
    }

    /// Priority rank (0 wins over everything else).
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Where this layer's content comes from.
    pub fn location(&self) -> LayerLocation {
        self.source.location()
    }

    /// The underlying content source.
    pub fn source(&self) -> &Arc<dyn ContentSource> {
        &self.source
    }
}

/// A layer location as accepted by the provider.
#[derive(Debug, Clone)]
pub enum LayerSpec {
    /// A host directory.
    Directory(PathBuf),
    /// A directory of another union filesystem.
    Union(UnionPath),
    /// A ready-made content source.
    Source(Arc<dyn ContentSource>),
}

impl LayerSpec {
    /// Open the content source this location names.
    pub fn into_source(self) -> UnionResult<Arc<dyn ContentSource>> {
        Ok(match self {
            LayerSpec::Directory(path) => Arc::new(DirectoryLayer::new(path)),
            LayerSpec::Union(path) => Arc::new(UnionLayer::new(path)?),
            LayerSpec::Source(source) => source,
        })
    }
}

impl From<PathBuf> for LayerSpec {
    fn from(path: PathBuf) -> Self {
        LayerSpec::Directory(path)
    }
}

impl From<&std::path::Path> for LayerSpec {
    fn from(path: &std::path::Path) -> Self {
        LayerSpec::Directory(path.to_path_buf())
    }
}

impl From<UnionPath> for LayerSpec {
    fn from(path: UnionPath) -> Self {
        LayerSpec::Union(path)
    }
}

impl From<Arc<dyn ContentSource>> for LayerSpec {
    fn from(source: Arc<dyn ContentSource>) -> Self {
        LayerSpec::Source(source)
    }
}

impl From<MemoryLayer> for LayerSpec {
    fn from(layer: MemoryLayer) -> Self {
        LayerSpec::Source(Arc::new(layer))
    }
}

impl From<LazyLayer> for LayerSpec {
    fn from(layer: LazyLayer) -> Self {
        LayerSpec::Source(Arc::new(layer))
    }
}
