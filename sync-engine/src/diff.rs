use crate::normalize::normalize;
use record_store::LocalStore;
use std::collections::HashSet;
use sync_core::{CoreError, GalleryResolver, NormalizedRecord, SavedItem, SyncStage};
use tracing::debug;

/// Normalizes the items the store has not seen yet, keeping remote order.
///
/// A duplicated id in `remote` is kept at its first occurrence. The store is
/// only read.
pub async fn diff(
    remote: &[SavedItem],
    local: &LocalStore,
    resolver: &dyn GalleryResolver,
) -> Result<Vec<NormalizedRecord>, CoreError> {
    let known = local.known_ids();
    let mut seen = HashSet::new();
    let mut fresh = Vec::new();

    for item in remote {
        let id = item.id();
        if known.contains(id) {
            continue;
        }
        if !seen.insert(id) {
            debug!("Skipping repeated id {} in remote listing", id);
            continue;
        }

        let record = normalize(item, resolver)
            .await
            .map_err(|e| e.at_stage(SyncStage::Normalize, Some(id)))?;
        fresh.push(record);
    }

    Ok(fresh)
}
