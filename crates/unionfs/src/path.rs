//! Path values bound to a union filesystem.
//!
//! A [`UnionPath`] is an immutable, slash-separated path. Segments are kept
//! literally: `.` and `..` survive until [`UnionPath::normalize`] is called,
//! and equality compares the literal segment sequence.
//!
//! The empty relative path (`""`) has no stored segments but behaves as a
//! single empty name: its name count is 1 and `subpath(0, 1)` returns it.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use crate::engine::UnionFs;
use crate::error::{UnionError, UnionResult};
use crate::uri::UnionUri;

/// Reference from a path to the filesystem it belongs to.
///
/// Holds the identity key and a weak engine reference, so paths never keep
/// a filesystem alive.
#[derive(Clone)]
pub(crate) struct FsHandle {
    key: Arc<str>,
    engine: Weak<UnionFs>,
}

impl FsHandle {
    pub(crate) fn new(key: Arc<str>, engine: Weak<UnionFs>) -> Self {
        Self { key, engine }
    }

    /// Handle that is not attached to any live engine.
    #[cfg(test)]
    pub(crate) fn detached(key: &str) -> Self {
        Self {
            key: Arc::from(key),
            engine: Weak::new(),
        }
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }
}

/// A path within one union filesystem.
#[derive(Clone)]
pub struct UnionPath {
    fs: FsHandle,
    absolute: bool,
    segments: Vec<String>,
}

impl UnionPath {
    /// Parse one or more strings into a path.
    ///
    /// Empty inputs are skipped, the remaining inputs are joined with `/`,
    /// and empty segments from repeated or trailing separators are dropped.
    /// Only a joined string starting with `/` is absolute.
    pub(crate) fn parse<S: AsRef<str>>(fs: FsHandle, parts: &[S]) -> Self {
        let joined = parts
            .iter()
            .map(AsRef::as_ref)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        let absolute = joined.starts_with('/');
        let segments = joined
            .split('/')
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        Self {
            fs,
            absolute,
            segments,
        }
    }

    pub(crate) fn root_of(fs: FsHandle) -> Self {
        Self::from_segments(fs, true, Vec::new())
    }

    fn from_segments(fs: FsHandle, absolute: bool, segments: Vec<String>) -> Self {
        Self {
            fs,
            absolute,
            segments,
        }
    }

    fn with_segments(&self, absolute: bool, segments: Vec<String>) -> Self {
        Self::from_segments(self.fs.clone(), absolute, segments)
    }

    pub(crate) fn fs_key(&self) -> &str {
        self.fs.key()
    }

    /// The filesystem this path belongs to.
    ///
    /// Fails with [`UnionError::Closed`] once the filesystem is dropped or closed.
    pub fn filesystem(&self) -> UnionResult<Arc<UnionFs>> {
        let fs = self.fs.engine.upgrade().ok_or(UnionError::Closed)?;
        if !fs.is_open() {
            return Err(UnionError::Closed);
        }
        Ok(fs)
    }

    /// Returns true if this path starts at the root.
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// Returns true for the empty relative path `""`.
    pub fn is_empty(&self) -> bool {
        !self.absolute && self.segments.is_empty()
    }

    /// Literal segments of this path. Empty for the root and the empty path.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The root for absolute paths, `None` for relative ones.
    pub fn root(&self) -> Option<UnionPath> {
        self.absolute.then(|| Self::root_of(self.fs.clone()))
    }

    /// Number of names in the path. The empty path counts as one name.
    pub fn name_count(&self) -> usize {
        if self.absolute {
            self.segments.len()
        } else {
            self.segments.len().max(1)
        }
    }

    /// The name at `index` as a one-segment relative path.
    pub fn name(&self, index: usize) -> UnionResult<UnionPath> {
        let count = self.name_count();
        if index >= count {
            return Err(UnionError::invalid_argument(format!(
                "name index {} out of range for {} names in '{}'",
                index, count, self
            )));
        }
        let segments = self
            .segments
            .get(index)
            .map(|s| vec![s.clone()])
            .unwrap_or_default();
        Ok(self.with_segments(false, segments))
    }

    /// The last name, or `None` for the root and the empty path.
    pub fn file_name(&self) -> Option<UnionPath> {
        self.segments
            .last()
            .map(|last| self.with_segments(false, vec![last.clone()]))
    }

    /// This path without its last segment.
    ///
    /// One-segment absolute paths parent to the root. The root, the empty
    /// path and one-segment relative paths have no parent.
    pub fn parent(&self) -> Option<UnionPath> {
        match self.segments.len() {
            0 => None,
            1 if self.absolute => self.root(),
            1 => None,
            n => Some(self.with_segments(self.absolute, self.segments[..n - 1].to_vec())),
        }
    }

    /// Relative path made of names `begin..end`.
    pub fn subpath(&self, begin: usize, end: usize) -> UnionResult<UnionPath> {
        let count = self.name_count();
        if begin >= end || end > count {
            return Err(UnionError::invalid_argument(format!(
                "subpath({}, {}) out of range for {} names in '{}'",
                begin, end, count, self
            )));
        }
        if self.segments.is_empty() {
            return Ok(self.with_segments(false, Vec::new()));
        }
        Ok(self.with_segments(false, self.segments[begin..end].to_vec()))
    }

    /// Remove `.` segments and fold `..` into the preceding name.
    ///
    /// A `..` with nothing to fold is kept for relative paths and dropped
    /// for absolute paths.
    pub fn normalize(&self) -> UnionPath {
        let mut stack: Vec<String> = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            match segment.as_str() {
                "." => {}
                ".." => match stack.last() {
                    Some(last) if last != ".." => {
                        stack.pop();
                    }
                    _ if self.absolute => {}
                    _ => stack.push(segment.clone()),
                },
                _ => stack.push(segment.clone()),
            }
        }
        self.with_segments(self.absolute, stack)
    }

    /// Resolve `other` against this path.
    ///
    /// An absolute `other` is returned as-is, an empty `other` returns this
    /// path, anything else is appended. `other` must come from the same
    /// filesystem.
    pub fn resolve(&self, other: &UnionPath) -> UnionResult<UnionPath> {
        self.check_same_fs(other, "resolve")?;
        Ok(self.join(other))
    }

    /// Parse `other` in this path's filesystem and resolve it.
    pub fn resolve_str(&self, other: &str) -> UnionPath {
        self.join(&Self::parse(self.fs.clone(), &[other]))
    }

    fn join(&self, other: &UnionPath) -> UnionPath {
        if other.absolute {
            return other.clone();
        }
        if other.segments.is_empty() {
            return self.clone();
        }
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        self.with_segments(self.absolute, segments)
    }

    fn check_same_fs(&self, other: &UnionPath, op: &str) -> UnionResult<()> {
        if self.fs_key() != other.fs_key() {
            return Err(UnionError::invalid_argument(format!(
                "cannot {} '{}' against '{}': paths belong to different filesystems",
                op, other, self
            )));
        }
        Ok(())
    }

    /// Build the relative path that leads from this path to `other`.
    pub fn relativize(&self, other: &UnionPath) -> UnionResult<UnionPath> {
        self.check_same_fs(other, "relativize")?;
        if self.absolute != other.absolute {
            return Err(UnionError::invalid_argument(format!(
                "cannot relativize '{}' against '{}': one is absolute and the other is not",
                other, self
            )));
        }
        let common = self
            .segments
            .iter()
            .zip(&other.segments)
            .take_while(|(a, b)| a == b)
            .count();
        let mut segments: Vec<String> = std::iter::repeat("..".to_string())
            .take(self.segments.len() - common)
            .collect();
        segments.extend(other.segments[common..].iter().cloned());
        Ok(self.with_segments(false, segments))
    }

    /// Literal prefix test. Absoluteness must match.
    pub fn starts_with(&self, other: &UnionPath) -> bool {
        if self.fs_key() != other.fs_key() || self.absolute != other.absolute {
            return false;
        }
        if other.is_empty() {
            return self.is_empty();
        }
        self.segments.starts_with(&other.segments)
    }

    /// Literal suffix test.
    ///
    /// A relative `other` may match the tail of an absolute path. An absolute
    /// `other` only matches an absolute path.
    pub fn ends_with(&self, other: &UnionPath) -> bool {
        if self.fs_key() != other.fs_key() || (other.absolute && !self.absolute) {
            return false;
        }
        if other.is_empty() {
            return self.is_empty();
        }
        self.segments.ends_with(&other.segments)
    }

    /// This path resolved against the root.
    pub fn to_absolute(&self) -> UnionPath {
        if self.absolute {
            self.clone()
        } else {
            self.with_segments(true, self.segments.clone())
        }
    }

    /// Canonical relative lookup key: absolute, normalized, no leading `/`.
    pub(crate) fn lookup_key(&self) -> String {
        self.to_absolute().normalize().segments.join("/")
    }

    /// URI that resolves back to this path through the provider registry.
    pub fn to_uri(&self) -> UnionUri {
        UnionUri::new(self.fs_key(), &self.to_absolute().to_string())
    }
}

impl fmt::Display for UnionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            write!(f, "/")?;
        }
        write!(f, "{}", self.segments.join("/"))
    }
}

impl fmt::Debug for UnionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UnionPath").field(&self.to_string()).finish()
    }
}

impl PartialEq for UnionPath {
    fn eq(&self, other: &Self) -> bool {
        self.fs_key() == other.fs_key()
            && self.absolute == other.absolute
            && self.segments == other.segments
    }
}

impl Eq for UnionPath {}

impl Hash for UnionPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fs_key().hash(state);
        self.absolute.hash(state);
        self.segments.hash(state);
    }
}

impl PartialOrd for UnionPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for UnionPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fs_key()
            .cmp(other.fs_key())
            .then_with(|| other.absolute.cmp(&self.absolute))
            .then_with(|| self.segments.cmp(&other.segments))
    }
}
