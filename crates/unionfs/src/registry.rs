//! Filesystem providers and the URI registry.
//!
//! A [`UnionProvider`] creates union filesystems and remembers them by
//! identity key so `union://` URIs can be resolved back to paths.
//! [`Providers`] is the scheme table callers pass around explicitly.

use dashmap::DashMap;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use uuid::Uuid;

use crate::config::StackConfig;
use crate::engine::UnionFs;
use crate::error::{UnionError, UnionResult};
use crate::layer::{ContentSource, LayerSpec};
use crate::mask::MaskPredicate;
use crate::path::UnionPath;
use crate::types::ByteStream;
use crate::uri::{scheme_of, UnionUri, SCHEME};

/// Option key for layers placed ahead of the primary root.
pub const ADDITIONAL_LAYERS: &str = "additional";

/// Options accepted by [`FileSystemProvider::new_filesystem`].
#[derive(Debug, Clone, Default)]
pub struct FsOptions {
    additional: Vec<LayerSpec>,
}

impl FsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer ahead of the root. Earlier calls win over later ones.
    pub fn with_additional(mut self, layer: impl Into<LayerSpec>) -> Self {
        self.additional.push(layer.into());
        self
    }

    /// Build options from a keyed map. Unknown keys are ignored.
    pub fn from_map(mut map: HashMap<String, Vec<LayerSpec>>) -> Self {
        let additional = map.remove(ADDITIONAL_LAYERS).unwrap_or_default();
        for key in map.keys() {
            tracing::debug!(option = %key, "ignoring unknown filesystem option");
        }
        Self { additional }
    }

    pub fn additional(&self) -> &[LayerSpec] {
        &self.additional
    }
}

/// A source of filesystems addressed by one URI scheme.
pub trait FileSystemProvider: Send + Sync {
    /// URI scheme handled by this provider.
    fn scheme(&self) -> &str;

    /// Create a filesystem over `root` and any layers named in `options`.
    fn new_filesystem(&self, root: LayerSpec, options: FsOptions) -> UnionResult<Arc<UnionFs>>;

    /// Resolve a URI of this provider's scheme to a path.
    fn path_from_uri(&self, uri: &str) -> UnionResult<UnionPath>;
}

/// Provider for the `union` scheme.
///
/// Keeps a weak table of the filesystems it created; the table never keeps
/// a filesystem alive.
#[derive(Debug, Default)]
pub struct UnionProvider {
    filesystems: DashMap<String, Weak<UnionFs>>,
}

impl UnionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filesystem from an explicit layer list, highest priority
    /// first, filtered by `mask`.
    pub fn new_filtered_filesystem(
        &self,
        mask: MaskPredicate,
        layers: Vec<LayerSpec>,
    ) -> UnionResult<Arc<UnionFs>> {
        if layers.is_empty() {
            return Err(UnionError::invalid_argument(
                "a union filesystem needs at least one layer",
            ));
        }
        let sources = layers
            .into_iter()
            .map(LayerSpec::into_source)
            .collect::<UnionResult<Vec<_>>>()?;

        let key = self.identity_key(&sources);
        let fs = UnionFs::new(key.as_str(), sources, mask);

        self.filesystems.retain(|_, weak| weak.strong_count() > 0);
        self.filesystems.insert(key, Arc::downgrade(&fs));
        Ok(fs)
    }

    /// Create a filesystem from a loaded [`StackConfig`].
    pub fn from_config(&self, config: &StackConfig) -> UnionResult<Arc<UnionFs>> {
        self.new_filtered_filesystem(config.mask(), config.layers())
    }

    /// Look up a live filesystem by the key in `uri`.
    pub fn get_filesystem(&self, uri: &UnionUri) -> UnionResult<Arc<UnionFs>> {
        self.filesystems
            .get(uri.key())
            .and_then(|weak| weak.upgrade())
            .filter(|fs| fs.is_open())
            .ok_or_else(|| UnionError::FileSystemNotFound(uri.key().to_string()))
    }

    /// Number of live filesystems known to this provider.
    pub fn live_count(&self) -> usize {
        self.filesystems
            .iter()
            .filter(|entry| entry.value().upgrade().is_some_and(|fs| fs.is_open()))
            .count()
    }

    /// Hash of the ordered layer locations plus a random v4 UUID, so every
    /// filesystem in the process gets a distinct key, even over the same
    /// layers and across provider tables.
    fn identity_key(&self, sources: &[Arc<dyn ContentSource>]) -> String {
        let mut hasher = blake3::Hasher::new();
        for source in sources {
            hasher.update(source.location().to_string().as_bytes());
            hasher.update(&[0]);
        }
        hasher.update(Uuid::new_v4().as_bytes());
        hex::encode(&hasher.finalize().as_bytes()[..16])
    }
}

impl FileSystemProvider for UnionProvider {
    fn scheme(&self) -> &str {
        SCHEME
    }

    fn new_filesystem(&self, root: LayerSpec, options: FsOptions) -> UnionResult<Arc<UnionFs>> {
        let mut layers = options.additional;
        layers.push(root);
        self.new_filtered_filesystem(MaskPredicate::AllowAll, layers)
    }

    fn path_from_uri(&self, uri: &str) -> UnionResult<UnionPath> {
        let uri: UnionUri = uri.parse()?;
        let fs = self.get_filesystem(&uri)?;
        Ok(fs.get_path(uri.path()))
    }
}

/// Installed providers, keyed by scheme.
///
/// Append-only: providers can be added but never replaced or removed.
pub struct Providers {
    union: Arc<UnionProvider>,
    by_scheme: IndexMap<String, Arc<dyn FileSystemProvider>>,
}

impl Providers {
    /// Table with the union provider installed.
    pub fn installed() -> Self {
        let union = Arc::new(UnionProvider::new());
        let mut by_scheme: IndexMap<String, Arc<dyn FileSystemProvider>> = IndexMap::new();
        by_scheme.insert(SCHEME.to_string(), Arc::clone(&union) as Arc<dyn FileSystemProvider>);
        Self { union, by_scheme }
    }

    /// The built-in union provider.
    pub fn union(&self) -> &Arc<UnionProvider> {
        &self.union
    }

    /// Install another provider.
    pub fn register(&mut self, provider: Arc<dyn FileSystemProvider>) -> UnionResult<()> {
        let scheme = provider.scheme().to_string();
        if self.by_scheme.contains_key(&scheme) {
            return Err(UnionError::DuplicateScheme(scheme));
        }
        tracing::debug!(scheme = %scheme, "registered filesystem provider");
        self.by_scheme.insert(scheme, provider);
        Ok(())
    }

    pub fn by_scheme(&self, scheme: &str) -> Option<&Arc<dyn FileSystemProvider>> {
        self.by_scheme.get(scheme)
    }

    /// Installed schemes in registration order.
    pub fn schemes(&self) -> impl Iterator<Item = &str> {
        self.by_scheme.keys().map(String::as_str)
    }

    /// Resolve any registered URI to a path.
    pub fn path_from_uri(&self, uri: &str) -> UnionResult<UnionPath> {
        let scheme = scheme_of(uri)
            .ok_or_else(|| UnionError::invalid_uri(format!("missing scheme: {}", uri)))?;
        let provider = self
            .by_scheme(scheme)
            .ok_or_else(|| UnionError::invalid_uri(format!("no provider for scheme: {}", uri)))?;
        provider.path_from_uri(uri)
    }

    /// Open the file a URI points at.
    pub async fn open(&self, uri: &str) -> UnionResult<ByteStream> {
        let path = self.path_from_uri(uri)?;
        path.filesystem()?.open(&path).await
    }
}

impl Default for Providers {
    fn default() -> Self {
        Self::installed()
    }
}
