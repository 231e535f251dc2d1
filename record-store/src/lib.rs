pub mod ledger;
pub mod lock;
pub mod store;

#[cfg(test)]
mod tests;

pub use ledger::{PendingEntry, PendingLedger};
pub use lock::{LockInfo, RunLock};
pub use store::{LocalStore, RecordStore};

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// `<store><suffix>`, next to the store file.
pub(crate) fn sidecar_path(store_path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(store_path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
