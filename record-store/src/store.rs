use crate::{sidecar_path, PendingLedger, RunLock};
use chrono::Utc;
use std::collections::HashSet;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use sync_core::{CoreError, NormalizedRecord, StoreError};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

/// Ordered snapshot of every record synced so far, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalStore {
    records: Vec<NormalizedRecord>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the first occurrence of each `post_id`.
    pub fn from_records(records: Vec<NormalizedRecord>) -> Self {
        let mut seen = HashSet::new();
        let records = records
            .into_iter()
            .filter(|record| seen.insert(record.post_id().to_string()))
            .collect();
        Self { records }
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn known_ids(&self) -> HashSet<&str> {
        self.records.iter().map(NormalizedRecord::post_id).collect()
    }

    pub fn contains(&self, post_id: &str) -> bool {
        self.records.iter().any(|record| record.post_id() == post_id)
    }

    pub fn get(&self, post_id: &str) -> Option<&NormalizedRecord> {
        self.records.iter().find(|record| record.post_id() == post_id)
    }

    /// Pushes each record to the front in the given order, so the last one
    /// given ends up first. Ids already present are skipped. Returns how
    /// many records were added.
    pub fn prepend(&mut self, new_records: Vec<NormalizedRecord>) -> usize {
        let mut known: HashSet<String> = self
            .records
            .iter()
            .map(|record| record.post_id().to_string())
            .collect();

        let mut fresh = Vec::with_capacity(new_records.len());
        for record in new_records {
            if known.insert(record.post_id().to_string()) {
                fresh.push(record);
            } else {
                debug!("Skipping {} already in store", record.post_id());
            }
        }

        let added = fresh.len();
        fresh.reverse();
        fresh.append(&mut self.records);
        self.records = fresh;
        added
    }
}

/// The JSON file backing a [`LocalStore`], with its ledger and lock beside it.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ledger_path(&self) -> PathBuf {
        sidecar_path(&self.path, ".pending.json")
    }

    pub fn lock_path(&self) -> PathBuf {
        sidecar_path(&self.path, ".lock")
    }

    pub fn lock(&self) -> Result<RunLock, CoreError> {
        RunLock::acquire(self.lock_path())
    }

    pub fn pending_ledger(&self) -> Result<PendingLedger, CoreError> {
        PendingLedger::load(self.ledger_path())
    }

    /// Reads the store. A missing file is a first run; an unreadable one is
    /// copied aside and treated as empty.
    pub fn load(&self) -> Result<LocalStore, CoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(
                    "{}",
                    StoreError::Missing {
                        path: self.path.display().to_string()
                    }
                );
                return Ok(LocalStore::new());
            }
            Err(e) => return Err(CoreError::Io(e)),
        };

        match serde_json::from_str::<Vec<NormalizedRecord>>(&contents) {
            Ok(records) => {
                let store = LocalStore::from_records(records);
                info!(
                    "Loaded {} records from {}",
                    store.len(),
                    self.path.display()
                );
                Ok(store)
            }
            Err(e) => {
                let backup = self.set_aside()?;
                error!(
                    "{}; copied to {} and starting from an empty store",
                    StoreError::Corrupt {
                        path: self.path.display().to_string(),
                        reason: e.to_string(),
                    },
                    backup.display()
                );
                Ok(LocalStore::new())
            }
        }
    }

    fn set_aside(&self) -> Result<PathBuf, CoreError> {
        let suffix = format!(".corrupt-{}", Utc::now().format("%Y%m%d%H%M%S"));
        let backup = sidecar_path(&self.path, &suffix);
        fs::copy(&self.path, &backup)?;
        Ok(backup)
    }

    /// Replaces the store file atomically with the whole snapshot.
    pub fn save(&self, store: &LocalStore) -> Result<(), CoreError> {
        write_json_atomic(&self.path, store.records())?;
        info!("Saved {} records to {}", store.len(), self.path.display());
        Ok(())
    }
}

/// Writes to a temp file in the target directory, then renames it over `path`.
pub(crate) fn write_json_atomic<T: serde::Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), CoreError> {
    let write_failed = |reason: String| {
        CoreError::Store(StoreError::WriteFailed {
            path: path.display().to_string(),
            reason,
        })
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let temp = NamedTempFile::new_in(dir).map_err(|e| write_failed(e.to_string()))?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush().map_err(|e| write_failed(e.to_string()))?;
    }
    temp.as_file()
        .sync_all()
        .map_err(|e| write_failed(e.to_string()))?;
    temp.persist(path)
        .map_err(|e| write_failed(e.error.to_string()))?;
    Ok(())
}
