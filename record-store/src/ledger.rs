use crate::store::write_json_atomic;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use sync_core::{CoreError, RowId};
use tracing::{debug, error};

/// A record persisted to the store but not yet fully projected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEntry {
    pub post_id: String,
    /// Row created by an earlier attempt, filled again instead of creating another.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<RowId>,
    /// Attempts the remote database rejected.
    #[serde(default)]
    pub rejections: u32,
}

impl PendingEntry {
    fn new(post_id: String) -> Self {
        Self {
            post_id,
            row: None,
            rejections: 0,
        }
    }
}

/// Records persisted to the store but not yet fully projected, oldest first.
#[derive(Debug)]
pub struct PendingLedger {
    path: PathBuf,
    entries: Vec<PendingEntry>,
}

impl PendingLedger {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Vec<PendingEntry>>(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    error!(
                        "Pending ledger {} is unreadable ({}), ignoring it",
                        path.display(),
                        e
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(CoreError::Io(e)),
        };

        Ok(Self { path, entries })
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.post_id.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, post_id: &str) -> bool {
        self.entry(post_id).is_some()
    }

    pub fn entry(&self, post_id: &str) -> Option<&PendingEntry> {
        self.entries.iter().find(|entry| entry.post_id == post_id)
    }

    pub fn row_of(&self, post_id: &str) -> Option<&RowId> {
        self.entry(post_id).and_then(|entry| entry.row.as_ref())
    }

    /// Records ids and writes the ledger before returning.
    pub fn add<I, S>(&mut self, post_ids: I) -> Result<(), CoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in post_ids {
            let id = id.into();
            if !self.contains(&id) {
                self.entries.push(PendingEntry::new(id));
            }
        }
        self.save()
    }

    /// Remembers the row created for `post_id`.
    pub fn set_row(&mut self, post_id: &str, row: RowId) -> Result<(), CoreError> {
        self.entry_mut(post_id).row = Some(row);
        self.save()
    }

    /// Counts a rejected attempt and returns the total so far.
    pub fn record_rejection(&mut self, post_id: &str) -> Result<u32, CoreError> {
        let entry = self.entry_mut(post_id);
        entry.rejections += 1;
        let rejections = entry.rejections;
        self.save()?;
        Ok(rejections)
    }

    pub fn remove(&mut self, post_id: &str) -> Result<(), CoreError> {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.post_id != post_id);
        if self.entries.len() != before {
            debug!("{} is no longer pending", post_id);
            self.save()?;
        }
        Ok(())
    }

    /// An empty ledger is removed rather than written.
    pub fn save(&self) -> Result<(), CoreError> {
        if self.entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(CoreError::Io(e)),
            };
        }
        write_json_atomic(&self.path, &self.entries)
    }

    fn entry_mut(&mut self, post_id: &str) -> &mut PendingEntry {
        let index = match self
            .entries
            .iter()
            .position(|entry| entry.post_id == post_id)
        {
            Some(index) => index,
            None => {
                self.entries.push(PendingEntry::new(post_id.to_string()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index]
    }
}
