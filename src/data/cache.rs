use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::SystemTime;

use log::debug;

use super::loader::load_file;
use super::model::StudentTable;
use crate::error::{DataError, DataResult};

type LoadSlot = Arc<OnceLock<DataResult<Arc<StudentTable>>>>;

struct CacheEntry {
    modified: SystemTime,
    slot: LoadSlot,
}

// ---------------------------------------------------------------------------
// TableCache – memoized loads keyed by (path, modification time)
// ---------------------------------------------------------------------------

/// Shares one parsed table per file version across every reader.
///
/// The map lock is only held to find or insert a slot; the parse itself runs
/// inside the slot's `OnceLock`, so concurrent callers for the same key wait
/// on a single load instead of parsing twice. Only the newest version of each
/// path is kept.
#[derive(Default)]
pub struct TableCache {
    entries: Mutex<HashMap<PathBuf, CacheEntry>>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the table for the file's current version, loading it if needed.
    ///
    /// Failed loads are cached as well; they are retried once the file
    /// changes or the path is invalidated.
    pub fn get_or_load(&self, path: &Path) -> DataResult<Arc<StudentTable>> {
        let (key, modified) = file_identity(path)?;
        let slot = self.slot_for(key, modified);
        slot.get_or_init(|| {
            debug!("Cache miss for {}, loading", path.display());
            load_file(path).map(Arc::new)
        })
        .clone()
    }

    /// Forget every cached version of `path`.
    pub fn invalidate(&self, path: &Path) {
        let key = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if self.lock().remove(&key).is_some() {
            debug!("Invalidated cached table for {}", key.display());
        }
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of cached file versions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn slot_for(&self, key: PathBuf, modified: SystemTime) -> LoadSlot {
        let mut entries = self.lock();
        match entries.get(&key) {
            Some(entry) if entry.modified == modified => {
                debug!("Cache hit for {}", key.display());
                entry.slot.clone()
            }
            _ => {
                let slot = LoadSlot::default();
                entries.insert(
                    key,
                    CacheEntry {
                        modified,
                        slot: slot.clone(),
                    },
                );
                slot
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, CacheEntry>> {
        // Entries are only ever inserted or removed whole, so a poisoned map
        // is still consistent.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn file_identity(path: &Path) -> DataResult<(PathBuf, SystemTime)> {
    let unavailable =
        |e: std::io::Error| DataError::DataUnavailable(format!("{}: {e}", path.display()));
    let key = std::fs::canonicalize(path).map_err(unavailable)?;
    let modified = std::fs::metadata(&key)
        .and_then(|m| m.modified())
        .map_err(unavailable)?;
    Ok((key, modified))
}
