//! Load cache keyed by source path and modification time.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, info};

use crate::error::LoadResult;
use crate::types::LoadOutcome;

/// Modification time of the source file, if it can be read.
pub fn source_mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// How much to trust an existing cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Use the entry without looking at the file.
    Cached,
    /// Stat the file; reuse the entry only if its mtime is unchanged.
    Revalidate,
    /// Always run the loader again.
    Reload,
}

struct CacheEntry<T> {
    modified: SystemTime,
    outcome: Arc<LoadOutcome<T>>,
}

/// Parsed workbooks by path. An entry is replaced as soon as the file's mtime
/// differs from the one it was loaded under.
pub struct WorkbookCache<T> {
    entries: HashMap<PathBuf, CacheEntry<T>>,
}

impl<T> Default for WorkbookCache<T> {
    fn default() -> Self {
        WorkbookCache {
            entries: HashMap::new(),
        }
    }
}

impl<T> WorkbookCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// mtime the cached entry for `path` was loaded under.
    pub fn loaded_mtime(&self, path: &Path) -> Option<SystemTime> {
        self.entries.get(path).map(|e| e.modified)
    }

    /// Return the outcome for `path`, running `load` when the entry is absent
    /// or stale.
    ///
    /// The mtime is taken before loading, so a file rewritten mid-load is
    /// picked up again on the next revalidation. A file that cannot be
    /// stat'ed yields `NoData` and drops any entry.
    pub fn get_or_load<F>(&mut self, path: &Path, freshness: Freshness, load: F) -> Arc<LoadOutcome<T>>
    where
        F: FnOnce(&Path) -> LoadResult<T>,
    {
        if freshness == Freshness::Cached {
            if let Some(entry) = self.entries.get(path) {
                return Arc::clone(&entry.outcome);
            }
        }

        let Some(modified) = source_mtime(path) else {
            self.entries.remove(path);
            info!(path = %path.display(), "source file not found");
            return Arc::new(LoadOutcome::NoData {
                reason: format!("source file not found: {}", path.display()),
            });
        };

        if freshness != Freshness::Reload {
            if let Some(entry) = self.entries.get(path) {
                if entry.modified == modified {
                    debug!(path = %path.display(), "cache hit");
                    return Arc::clone(&entry.outcome);
                }
                info!(path = %path.display(), "source changed, reloading");
            }
        }

        let outcome = Arc::new(LoadOutcome::from(load(path)));
        self.entries.insert(
            path.to_path_buf(),
            CacheEntry {
                modified,
                outcome: Arc::clone(&outcome),
            },
        );
        outcome
    }
}

/// Remembers the last seen mtime of one file, polled once per interaction.
#[derive(Debug, Clone, Default)]
pub struct StalenessTracker {
    /// `None` before the first poll; `Some(None)` while the file is absent.
    last: Option<Option<SystemTime>>,
}

impl StalenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_seen(&self) -> Option<SystemTime> {
        self.last.flatten()
    }

    /// True when the mtime differs from the previous poll. The first poll only
    /// records it. Disappearing and reappearing both count as changes.
    pub fn poll(&mut self, path: &Path) -> bool {
        let current = source_mtime(path);
        let changed = matches!(self.last, Some(previous) if previous != current);
        self.last = Some(current);
        changed
    }
}
