//! Lazy depth-first traversal of the merged tree.

use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;

use crate::engine::UnionFs;
use crate::error::{UnionError, UnionResult};
use crate::path::UnionPath;
use crate::types::{child_key, FileType};

/// Stream of visible paths produced by [`UnionFs::walk`].
pub type Walk = BoxStream<'static, UnionResult<UnionPath>>;

struct Pending {
    path: UnionPath,
    key: String,
    kind: FileType,
    depth: usize,
}

struct WalkState {
    fs: Arc<UnionFs>,
    stack: Vec<Pending>,
    max_depth: usize,
}

impl WalkState {
    /// Pop the next path, pushing its children first so they come out in
    /// listing order.
    async fn step(mut self) -> Option<(UnionResult<UnionPath>, Self)> {
        let item = self.stack.pop()?;
        if item.kind.is_dir() && item.depth < self.max_depth {
            match self.fs.list_key(&item.key).await {
                Ok(children) => {
                    for child in children.into_iter().rev() {
                        self.stack.push(Pending {
                            path: item.path.resolve_str(&child.name),
                            key: child_key(&item.key, &child.name),
                            kind: child.kind,
                            depth: item.depth + 1,
                        });
                    }
                }
                Err(e) => return Some((Err(e), self)),
            }
        }
        Some((Ok(item.path), self))
    }
}

impl UnionFs {
    /// Walk the tree below `start`, depth-first, pre-order, including
    /// `start` itself.
    ///
    /// Directories are listed as the stream is polled, not up front.
    pub async fn walk(self: &Arc<Self>, start: &UnionPath) -> UnionResult<Walk> {
        self.walk_max_depth(start, usize::MAX).await
    }

    /// Like [`walk`](Self::walk), descending at most `max_depth` levels.
    /// A depth of 0 yields only `start`.
    pub async fn walk_max_depth(
        self: &Arc<Self>,
        start: &UnionPath,
        max_depth: usize,
    ) -> UnionResult<Walk> {
        let key = self.key_for(start)?;
        let kind = match self.find(&key).await? {
            Some((_, kind)) => kind,
            None => return Err(UnionError::not_found(start.to_string())),
        };
        let state = WalkState {
            fs: Arc::clone(self),
            stack: vec![Pending {
                path: start.clone(),
                key,
                kind,
                depth: 0,
            }],
            max_depth,
        };
        Ok(stream::unfold(state, WalkState::step).boxed())
    }
}
