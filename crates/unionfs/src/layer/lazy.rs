//! Lazily acquired layer.
//!
//! Wraps a loader that produces the real content source on first use, for
//! sources that need a scoped handle such as an open archive. The handle is
//! kept for the lifetime of the filesystem and released exactly once.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{ContentSource, LayerLocation};
use crate::error::{UnionError, UnionResult};
use crate::types::{ByteStream, DirEntry, FileType};

/// Loader producing the wrapped content source.
pub type SourceLoader =
    Box<dyn Fn() -> BoxFuture<'static, UnionResult<Arc<dyn ContentSource>>> + Send + Sync>;

enum State {
    Idle,
    Open(Arc<dyn ContentSource>),
    Released,
}

/// A layer whose content source is opened on first access.
pub struct LazyLayer {
    location: LayerLocation,
    loader: SourceLoader,
    state: Mutex<State>,
}

impl LazyLayer {
    /// Create a lazy layer. `loader` runs at most once per successful open.
    pub fn new<F, Fut>(location: LayerLocation, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = UnionResult<Arc<dyn ContentSource>>> + Send + 'static,
    {
        Self {
            location,
            loader: Box::new(move || loader().boxed()),
            state: Mutex::new(State::Idle),
        }
    }

    /// Whether the wrapped source is currently open.
    pub async fn is_acquired(&self) -> bool {
        matches!(*self.state.lock().await, State::Open(_))
    }

    /// Get the wrapped source, opening it if needed.
    ///
    /// The lock is held while loading so concurrent first uses share one load.
    async fn acquire(&self) -> UnionResult<Arc<dyn ContentSource>> {
        let mut state = self.state.lock().await;
        match &*state {
            State::Open(source) => return Ok(Arc::clone(source)),
            State::Released => return Err(UnionError::Closed),
            State::Idle => {}
        }

        tracing::debug!(location = %self.location, "acquiring lazy layer");
        let source = (self.loader)().await?;
        *state = State::Open(Arc::clone(&source));
        Ok(source)
    }
}

impl fmt::Debug for LazyLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyLayer")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ContentSource for LazyLayer {
    fn location(&self) -> LayerLocation {
        self.location.clone()
    }

    async fn entry_type(&self, key: &str) -> UnionResult<Option<FileType>> {
        self.acquire().await?.entry_type(key).await
    }

    async fn open(&self, key: &str) -> UnionResult<ByteStream> {
        self.acquire().await?.open(key).await
    }

    async fn read_dir(&self, key: &str) -> UnionResult<Vec<DirEntry>> {
        self.acquire().await?.read_dir(key).await
    }

    async fn release(&self) -> UnionResult<()> {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, State::Released) {
            State::Open(source) => {
                tracing::debug!(location = %self.location, "releasing lazy layer");
                source.release().await
            }
            State::Idle | State::Released => Ok(()),
        }
    }
}
