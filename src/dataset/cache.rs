use super::loader::{load_tracks, try_load_tracks};
use super::table::Dataset;
use chrono::{DateTime, Local};
use log::{debug, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Identity of a source file at the time it was loaded
#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceStamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl SourceStamp {
    fn read(path: &Path) -> Option<Self> {
        let metadata = fs::metadata(path).ok()?;
        Some(Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        })
    }
}

struct CacheEntry {
    stamp: SourceStamp,
    dataset: Arc<Dataset>,
    loaded_at: DateTime<Local>,
}

/// Compute-once cache for prepared datasets, keyed by path, modification time and size.
///
/// Owned by the application and passed to whoever needs the table; a changed
/// file is reloaded on the next request.
#[derive(Default)]
pub struct DatasetCache {
    entries: HashMap<PathBuf, CacheEntry>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the prepared dataset for `path`, loading it if needed
    pub fn get_or_load<P: AsRef<Path>>(&mut self, path: P) -> Arc<Dataset> {
        let path = path.as_ref();
        let key = Self::key(path);

        let Some(stamp) = SourceStamp::read(path) else {
            // Unreadable sources are not cached so the file is picked up once it appears
            debug!("No metadata for '{}', loading without caching", path.display());
            self.entries.remove(&key);
            return Arc::new(load_tracks(path));
        };

        if let Some(entry) = self.entries.get(&key) {
            if entry.stamp == stamp {
                debug!("Dataset cache hit for '{}'", path.display());
                return Arc::clone(&entry.dataset);
            }
            debug!("'{}' changed since last load, reloading", path.display());
        } else {
            debug!("Dataset cache miss for '{}'", path.display());
        }

        // Only a successful load is cached; failures are retried on the next request
        let dataset = match try_load_tracks(path) {
            Ok((dataset, _)) => Arc::new(dataset),
            Err(e) => {
                warn!("{e}; continuing with an empty dataset");
                self.entries.remove(&key);
                return Arc::new(Dataset::default());
            }
        };
        self.entries.insert(
            key,
            CacheEntry {
                stamp,
                dataset: Arc::clone(&dataset),
                loaded_at: Local::now(),
            },
        );
        dataset
    }

    /// When the cached entry for `path` was built, if there is one
    pub fn loaded_at<P: AsRef<Path>>(&self, path: P) -> Option<DateTime<Local>> {
        self.entries
            .get(&Self::key(path.as_ref()))
            .map(|entry| entry.loaded_at)
    }

    fn key(path: &Path) -> PathBuf {
        fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
    }
}
