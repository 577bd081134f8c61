//! Visibility predicate applied to every layer entry.
//!
//! The predicate sees the normalized relative text of an entry (no leading
//! `/`, a trailing `/` for directories) together with the layer that
//! produced it. Rejecting a directory hides its whole subtree in that layer.

use std::fmt;
use std::sync::Arc;

use crate::layer::Layer;
use crate::types::{mask_text, FileType};

/// Signature of a custom mask function: `(relative text, layer) -> visible`.
pub type MaskFn = dyn Fn(&str, &Layer) -> bool + Send + Sync;

/// Decides which layer entries are visible.
#[derive(Clone, Default)]
pub enum MaskPredicate {
    /// Every entry is visible.
    #[default]
    AllowAll,
    /// Entries whose relative text starts with any of these prefixes are hidden.
    ExcludePrefixes(Vec<String>),
    /// Arbitrary predicate.
    Custom(Arc<MaskFn>),
}

impl MaskPredicate {
    /// Wrap a closure as a predicate.
    pub fn custom(f: impl Fn(&str, &Layer) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    /// Hide everything under the given prefixes.
    pub fn exclude_prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ExcludePrefixes(prefixes.into_iter().map(Into::into).collect())
    }

    /// Evaluate the predicate for one entry text.
    pub fn test(&self, text: &str, layer: &Layer) -> bool {
        match self {
            MaskPredicate::AllowAll => true,
            MaskPredicate::ExcludePrefixes(prefixes) => {
                !prefixes.iter().any(|prefix| text.starts_with(prefix.as_str()))
            }
            MaskPredicate::Custom(f) => f(text, layer),
        }
    }

    /// Whether every ancestor directory of `key` is visible in `layer`.
    pub(crate) fn admits_ancestors(&self, key: &str, layer: &Layer) -> bool {
        key.match_indices('/')
            .all(|(idx, _)| self.test(&key[..=idx], layer))
    }

    /// Whether the entry itself is visible in `layer`, ignoring ancestors.
    ///
    /// The root (empty key) is always visible.
    pub(crate) fn admits_entry(&self, key: &str, kind: FileType, layer: &Layer) -> bool {
        key.is_empty() || self.test(&mask_text(key, kind), layer)
    }
}

impl fmt::Debug for MaskPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskPredicate::AllowAll => write!(f, "AllowAll"),
            MaskPredicate::ExcludePrefixes(prefixes) => {
                f.debug_tuple("ExcludePrefixes").field(prefixes).finish()
            }
            MaskPredicate::Custom(_) => write!(f, "Custom(<fn>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::MemoryLayer;
    use std::sync::Mutex;

    fn layer() -> Layer {
        Layer::new(0, Arc::new(MemoryLayer::new("mask-test")))
    }

    fn admits(mask: &MaskPredicate, key: &str, kind: FileType, layer: &Layer) -> bool {
        mask.admits_ancestors(key, layer) && mask.admits_entry(key, kind, layer)
    }

    #[test]
    fn test_allow_all() {
        let layer = layer();
        assert!(MaskPredicate::AllowAll.test("anything", &layer));
        assert!(admits(&MaskPredicate::default(), "a/b/c", FileType::File, &layer));
    }

    #[test]
    fn test_exclude_prefixes() {
        let layer = layer();
        let mask = MaskPredicate::exclude_prefixes(["secret/", "masktest2.txt"]);
        assert!(!mask.test("masktest2.txt", &layer));
        assert!(!mask.test("secret/", &layer));
        assert!(mask.test("masktest.txt", &layer));
        assert!(!admits(&mask, "secret/key.pem", FileType::File, &layer));
    }

    #[test]
    fn test_admits_checks_every_ancestor_with_trailing_slash() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let mask = MaskPredicate::custom(move |text, _| {
            log.lock().unwrap().push(text.to_string());
            true
        });

        assert!(admits(&mask, "a/b/c.txt", FileType::File, &layer()));
        assert_eq!(*seen.lock().unwrap(), vec!["a/", "a/b/", "a/b/c.txt"]);

        seen.lock().unwrap().clear();
        assert!(admits(&mask, "a/b", FileType::Directory, &layer()));
        assert_eq!(*seen.lock().unwrap(), vec!["a/", "a/b/"]);
    }

    #[test]
    fn test_hidden_directory_hides_subtree() {
        let mask = MaskPredicate::custom(|text, _| text != "dir/");
        let layer = layer();
        assert!(!admits(&mask, "dir", FileType::Directory, &layer));
        assert!(!admits(&mask, "dir/nested.txt", FileType::File, &layer));
        assert!(admits(&mask, "other.txt", FileType::File, &layer));
    }

    #[test]
    fn test_root_is_always_visible() {
        let mask = MaskPredicate::custom(|_, _| false);
        assert!(admits(&mask, "", FileType::Directory, &layer()));
    }

    #[test]
    fn test_custom_sees_layer_rank() {
        let mask = MaskPredicate::custom(|_, layer| layer.rank() == 0);
        let top = Layer::new(0, Arc::new(MemoryLayer::new("top")));
        let bottom = Layer::new(1, Arc::new(MemoryLayer::new("bottom")));
        assert!(mask.test("x", &top));
        assert!(!mask.test("x", &bottom));
    }
}
