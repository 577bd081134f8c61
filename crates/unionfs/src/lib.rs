//! Read-only union filesystem.
//!
//! Presents several content sources as one merged directory tree.
//! Key components:
//!
//! - [`UnionPath`] - Immutable path values with POSIX-style algebra
//! - [`UnionFs`] - Overlay engine: priority lookup, merged listings, lazy walk
//! - [`ContentSource`] - Trait implemented by every layer
//! - [`DirectoryLayer`], [`MemoryLayer`], [`LazyLayer`], [`UnionLayer`] - Layer kinds
//! - [`MaskPredicate`] - Per-entry visibility filter
//! - [`Providers`] / [`UnionProvider`] - Filesystem creation and `union://` URI lookup
//!
//! ## Design Decisions
//!
//! - **First layer wins**: layer 0 shadows every later layer. A masked
//!   entry behaves as if absent, so lookups fall through to the next layer.
//! - **Subtree-closed masking**: hiding a directory in a layer hides
//!   everything below it in that layer.
//! - **Weak back-references**: paths and the provider table never keep a
//!   filesystem alive.
//!
//! ```no_run
//! use unionfs::{FileSystemProvider, FsOptions, MemoryLayer, Providers};
//!
//! # async fn demo() -> unionfs::UnionResult<()> {
//! let providers = Providers::installed();
//! let fs = providers.union().new_filesystem(
//!     MemoryLayer::new("base").with_file("a.txt", "base").into(),
//!     FsOptions::new().with_additional(MemoryLayer::new("patch").with_file("a.txt", "patched")),
//! )?;
//! assert_eq!(fs.read_to_string(&fs.get_path("/a.txt")).await?, "patched");
//! # Ok(())
//! # }
//! ```

mod config;
mod engine;
mod error;
pub mod layer;
mod mask;
mod path;
mod registry;
mod types;
mod uri;
mod walk;

pub use config::{ConfigError, StackConfig};
pub use engine::UnionFs;
pub use error::{UnionError, UnionResult};
pub use layer::{
    ContentSource, DirectoryLayer, Layer, LayerLocation, LayerSpec, LazyLayer, MemoryLayer,
    UnionLayer,
};
pub use mask::{MaskFn, MaskPredicate};
pub use path::UnionPath;
pub use registry::{FileSystemProvider, FsOptions, Providers, UnionProvider, ADDITIONAL_LAYERS};
pub use types::{ByteStream, DirEntry, FileType};
pub use uri::{scheme_of, UnionUri, SCHEME};
pub use walk::Walk;
