//! In-use artifact registry.
//!
//! Tracks reference counts for artifact files that are currently being
//! streamed to clients. The retention sweeper consults the registry before
//! deleting anything, so a file is never removed while a response body is
//! still reading from it. Counts live only in memory; on restart the registry
//! is empty and every file on disk is subject to normal retention.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Reference counts for artifacts with at least one active reader.
///
/// Entries exist only while the count is positive. Lookups for unknown paths
/// report not-in-use rather than erroring.
#[derive(Debug, Default)]
pub struct ArtifactRegistry {
    counts: Mutex<HashMap<PathBuf, usize>>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the reference count for `path`.
    pub fn mark_in_use(&self, path: &Path) {
        let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        *counts.entry(path.to_path_buf()).or_insert(0) += 1;
    }

    /// Decrement the reference count for `path`, dropping the entry at zero.
    ///
    /// A release without a matching mark is a bug in the caller; it is logged
    /// and otherwise ignored so one misbehaving path cannot poison the map.
    pub fn release(&self, path: &Path) {
        let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        match counts.get_mut(path) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                counts.remove(path);
            }
            None => warn!(path = %path.display(), "release without matching mark_in_use"),
        }
    }

    /// Whether at least one reader currently holds `path`.
    pub fn is_in_use(&self, path: &Path) -> bool {
        let counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        counts.contains_key(path)
    }

    /// Number of distinct paths currently held.
    pub fn in_use_count(&self) -> usize {
        let counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        counts.len()
    }

    /// Mark `path` in use and return a guard that releases it on drop.
    ///
    /// The guard is how delivery code holds a file: the release happens on
    /// every exit path, including a client disconnect that drops the
    /// response body mid-stream.
    pub fn guard(self: &Arc<Self>, path: &Path) -> InUseGuard {
        self.mark_in_use(path);
        InUseGuard {
            registry: Arc::clone(self),
            path: path.to_path_buf(),
        }
    }
}

/// RAII handle for one in-use reference, released on drop.
#[derive(Debug)]
pub struct InUseGuard {
    registry: Arc<ArtifactRegistry>,
    path: PathBuf,
}

impl InUseGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InUseGuard {
    fn drop(&mut self) {
        self.registry.release(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_path_not_in_use() {
        let registry = ArtifactRegistry::new();
        assert!(!registry.is_in_use(Path::new("/tmp/nope.mp4")));
    }

    #[test]
    fn test_mark_and_release() {
        let registry = ArtifactRegistry::new();
        let path = Path::new("/tmp/dl_a.mp4");

        registry.mark_in_use(path);
        assert!(registry.is_in_use(path));

        registry.release(path);
        assert!(!registry.is_in_use(path));
        assert_eq!(registry.in_use_count(), 0);
    }

    #[test]
    fn test_counts_are_per_reader() {
        let registry = ArtifactRegistry::new();
        let path = Path::new("/tmp/dl_a.mp4");

        registry.mark_in_use(path);
        registry.mark_in_use(path);
        registry.release(path);
        assert!(registry.is_in_use(path));

        registry.release(path);
        assert!(!registry.is_in_use(path));
    }

    #[test]
    fn test_release_without_mark_is_harmless() {
        let registry = ArtifactRegistry::new();
        registry.release(Path::new("/tmp/dl_a.mp4"));
        assert_eq!(registry.in_use_count(), 0);
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let registry = Arc::new(ArtifactRegistry::new());
        let path = Path::new("/tmp/dl_a.mp4");

        {
            let guard = registry.guard(path);
            assert_eq!(guard.path(), path);
            assert!(registry.is_in_use(path));
        }
        assert!(!registry.is_in_use(path));
    }

    #[test]
    fn test_nested_guards() {
        let registry = Arc::new(ArtifactRegistry::new());
        let path = Path::new("/tmp/dl_a.mp4");

        let outer = registry.guard(path);
        {
            let _inner = registry.guard(path);
            assert!(registry.is_in_use(path));
        }
        assert!(registry.is_in_use(path));
        drop(outer);
        assert!(!registry.is_in_use(path));
    }

    #[test]
    fn test_distinct_paths_tracked_separately() {
        let registry = ArtifactRegistry::new();
        registry.mark_in_use(Path::new("/tmp/dl_a.mp4"));
        registry.mark_in_use(Path::new("/tmp/dl_b.mp4"));
        assert_eq!(registry.in_use_count(), 2);

        registry.release(Path::new("/tmp/dl_a.mp4"));
        assert!(!registry.is_in_use(Path::new("/tmp/dl_a.mp4")));
        assert!(registry.is_in_use(Path::new("/tmp/dl_b.mp4")));
    }
}
