//! Snapshot persistence.
//!
//! The ledger itself is in-memory; a [`SnapshotStore`] saves and restores a
//! consistent [`ServiceSnapshot`] between runs.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use fiat_pool::LedgerSnapshot;
use fs2::FileExt;
use parking_lot::RwLock;
use tempfile::NamedTempFile;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rates::FiatRate;
use crate::transactions::FiatTransaction;

/// Current on-disk format.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything a service needs to resume: pools and positions, rates, and
/// the fiat transaction journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSnapshot {
    pub version: u32,
    pub ledger: LedgerSnapshot,
    #[serde(default)]
    pub rates: BTreeMap<String, FiatRate>,
    #[serde(default, alias = "deposits")]
    pub transactions: Vec<FiatTransaction>,
}

impl Default for ServiceSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            ledger: LedgerSnapshot::default(),
            rates: BTreeMap::new(),
            transactions: Vec::new(),
        }
    }
}

pub trait SnapshotStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<ServiceSnapshot>>;
    fn save(&self, snapshot: &ServiceSnapshot) -> Result<()>;
    fn backend_type(&self) -> &'static str;
}

// ─── In-memory ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: RwLock<Option<ServiceSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<ServiceSnapshot>> {
        Ok(self.slot.read().clone())
    }

    fn save(&self, snapshot: &ServiceSnapshot) -> Result<()> {
        *self.slot.write() = Some(snapshot.clone());
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

// ─── JSON file ────────────────────────────────────────────────────────────────

/// Pretty-printed JSON file. Saves go to a uniquely named temp file in the
/// same directory that is then renamed over the target, so a reader never
/// sees a half-written snapshot and concurrent savers never share a temp.
///
/// A load-modify-save cycle from several processes must hold
/// [`JsonFileStore::lock`] for its whole duration, otherwise the last saver
/// silently drops the others' updates.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

/// Exclusive advisory lock on a [`JsonFileStore`], released on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: fs::File,
    path: PathBuf,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release state lock");
        }
    }
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling `<file>.lock`. The snapshot itself is replaced on every save,
    /// so a lock taken on it would be left on the old inode.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        name.push(".lock");
        self.path.with_file_name(name)
    }

    /// Block until this process holds the store exclusively.
    pub fn lock(&self) -> Result<StoreLock> {
        self.ensure_parent()?;
        let path = self.lock_path();
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        FileExt::lock_exclusive(&file)?;
        tracing::debug!(path = %path.display(), "state lock acquired");
        Ok(StoreLock { file, path })
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn ensure_parent(&self) -> Result<()> {
        fs::create_dir_all(self.parent_dir())?;
        Ok(())
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<ServiceSnapshot>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot = serde_json::from_slice(&bytes)?;
        tracing::debug!(path = %self.path.display(), "snapshot loaded");
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &ServiceSnapshot) -> Result<()> {
        self.ensure_parent()?;
        let mut tmp = NamedTempFile::new_in(self.parent_dir())?;
        serde_json::to_writer_pretty(&mut tmp, snapshot)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        tracing::debug!(path = %self.path.display(), "snapshot saved");
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "json-file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_starts_empty() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());
        store.save(&ServiceSnapshot::default()).unwrap();
        assert_eq!(store.load().unwrap(), Some(ServiceSnapshot::default()));
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/state.json"));
        assert!(store.load().unwrap().is_none());

        let mut snapshot = ServiceSnapshot::default();
        snapshot.rates.insert(
            "USD".into(),
            FiatRate { rate: 180_000_000_000, decimals: 8, is_active: true },
        );
        store.save(&snapshot).unwrap();

        assert_eq!(store.load().unwrap(), Some(snapshot));
        // only the snapshot itself is left behind
        let names: Vec<_> = fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, ["state.json"]);
    }

    fn usd_rate(rate: u128) -> FiatRate {
        FiatRate { rate, decimals: 8, is_active: true }
    }

    #[test]
    fn locked_savers_never_lose_an_update() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        JsonFileStore::new(&path).save(&ServiceSnapshot::default()).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let store = JsonFileStore::new(&path);
                std::thread::spawn(move || {
                    for round in 0..10 {
                        let _lock = store.lock().unwrap();
                        let mut snapshot = store.load().unwrap().unwrap();
                        snapshot.rates.insert(format!("W{worker}R{round}"), usd_rate(1));
                        store.save(&snapshot).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snapshot = JsonFileStore::new(&path).load().unwrap().unwrap();
        assert_eq!(snapshot.rates.len(), 40);
    }

    #[test]
    fn concurrent_unlocked_saves_leave_a_valid_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let handles: Vec<_> = (1..=4u128)
            .map(|worker| {
                let store = JsonFileStore::new(&path);
                std::thread::spawn(move || {
                    let mut snapshot = ServiceSnapshot::default();
                    snapshot.rates.insert("USD".into(), usd_rate(worker));
                    for _ in 0..20 {
                        store.save(&snapshot).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        // whichever saver won, the file parses and holds one whole snapshot
        let snapshot = JsonFileStore::new(&path).load().unwrap().unwrap();
        assert!((1..=4).contains(&snapshot.rates["USD"].rate));
    }

    #[test]
    fn garbage_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, b"{not json").unwrap();
        assert!(JsonFileStore::new(path).load().is_err());
    }
}
