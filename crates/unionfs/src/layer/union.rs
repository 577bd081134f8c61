//! A directory of another union filesystem used as a layer.

use async_trait::async_trait;
use std::sync::Arc;

use super::{ContentSource, LayerLocation};
use crate::engine::UnionFs;
use crate::error::UnionResult;
use crate::path::UnionPath;
use crate::types::{child_key, ByteStream, DirEntry, FileType};

/// Exposes the masked, merged view of an inner filesystem below `base`.
///
/// The inner filesystem must stay open; once it is closed every lookup
/// through this layer fails with `Closed`.
#[derive(Debug)]
pub struct UnionLayer {
    fs: Arc<UnionFs>,
    base: String,
    uri: String,
}

impl UnionLayer {
    /// Layer rooted at `path` inside its filesystem.
    pub fn new(path: UnionPath) -> UnionResult<Self> {
        let fs = path.filesystem()?;
        let base = fs.key_for(&path)?;
        let uri = path.to_absolute().normalize().to_uri().to_string();
        Ok(Self { fs, base, uri })
    }

    /// The inner filesystem.
    pub fn filesystem(&self) -> &Arc<UnionFs> {
        &self.fs
    }

    fn inner_key(&self, key: &str) -> String {
        if key.is_empty() {
            self.base.clone()
        } else {
            child_key(&self.base, key)
        }
    }
}

#[async_trait]
impl ContentSource for UnionLayer {
    fn location(&self) -> LayerLocation {
        LayerLocation::Union(self.uri.clone())
    }

    async fn entry_type(&self, key: &str) -> UnionResult<Option<FileType>> {
        let inner = self.inner_key(key);
        Ok(self.fs.find(&inner).await?.map(|(_, kind)| kind))
    }

    async fn open(&self, key: &str) -> UnionResult<ByteStream> {
        self.fs.open_key(&self.inner_key(key)).await
    }

    async fn read_dir(&self, key: &str) -> UnionResult<Vec<DirEntry>> {
        let mut entries = self.fs.list_key(&self.inner_key(key)).await?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnionError;
    use crate::layer::MemoryLayer;
    use crate::mask::MaskPredicate;

    fn inner() -> Arc<UnionFs> {
        let source: Arc<dyn ContentSource> = Arc::new(
            MemoryLayer::new("inner")
                .with_file("assets/logo.png", "png")
                .with_file("assets/zz.txt", "z")
                .with_file("assets/a.txt", "a")
                .with_file("secret.txt", "s"),
        );
        UnionFs::new("inner-fs", vec![source], MaskPredicate::AllowAll)
    }

    #[tokio::test]
    async fn test_reads_below_base() {
        let fs = inner();
        let layer = UnionLayer::new(fs.get_path("/assets")).unwrap();
        assert_eq!(layer.entry_type("logo.png").await.unwrap(), Some(FileType::File));
        assert_eq!(layer.entry_type("").await.unwrap(), Some(FileType::Directory));
        assert_eq!(layer.entry_type("secret.txt").await.unwrap(), None);
        assert_eq!(
            layer.read_dir("").await.unwrap(),
            vec![
                DirEntry::file("a.txt"),
                DirEntry::file("logo.png"),
                DirEntry::file("zz.txt")
            ]
        );
    }

    #[tokio::test]
    async fn test_location_is_uri() {
        let fs = inner();
        let layer = UnionLayer::new(fs.get_path("assets/./")).unwrap();
        assert_eq!(
            layer.location(),
            LayerLocation::Union("union://inner-fs/assets".into())
        );
    }

    #[tokio::test]
    async fn test_closed_inner_filesystem() {
        let fs = inner();
        let layer = UnionLayer::new(fs.get_path("/assets")).unwrap();
        fs.close().await.unwrap();
        assert!(matches!(layer.entry_type("a.txt").await, Err(UnionError::Closed)));
        assert!(matches!(
            UnionLayer::new(fs.get_path("/assets")),
            Err(UnionError::Closed)
        ));
    }
}
