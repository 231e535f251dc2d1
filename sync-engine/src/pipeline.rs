//! One complete sync run: fetch, normalize and diff, persist, project.

use crate::diff::diff;
use crate::projector::Projector;
use record_store::{LocalStore, PendingLedger, RecordStore};
use std::sync::Arc;
use sync_core::{
    CoreError, ErrorReporter, GalleryResolver, NormalizedRecord, RemoteDatabase, SavedSource,
    SyncStage,
};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Rejected attempts after which a record is no longer retried.
pub const MAX_REJECTIONS: u32 = 3;

/// What a finished run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub run_id: Uuid,
    /// Items the platform returned.
    pub fetched: usize,
    /// Records added to the local store by this run.
    pub new_records: usize,
    /// Records projected, including ones left pending by earlier runs.
    pub projected: usize,
    /// Records the remote database refused this run, in queue order.
    pub rejected: Vec<String>,
}

pub struct SyncEngine {
    source: Arc<dyn SavedSource>,
    resolver: Arc<dyn GalleryResolver>,
    store: RecordStore,
    projector: Projector,
}

impl SyncEngine {
    pub fn new(
        source: Arc<dyn SavedSource>,
        resolver: Arc<dyn GalleryResolver>,
        database: Arc<dyn RemoteDatabase>,
        store: RecordStore,
    ) -> Self {
        Self {
            source,
            resolver,
            store,
            projector: Projector::new(database),
        }
    }

    /// Replaces the projector, e.g. with one using a seeded color source.
    pub fn with_projector(mut self, projector: Projector) -> Self {
        self.projector = projector;
        self
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub async fn run(&mut self) -> Result<SyncReport, CoreError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("sync_run", run_id = %run_id);
        self.run_stages(run_id).instrument(span).await
    }

    async fn run_stages(&mut self, run_id: Uuid) -> Result<SyncReport, CoreError> {
        let _lock = self
            .store
            .lock()
            .map_err(|e| e.at_stage(SyncStage::Persist, None))?;

        info!("Fetching saved items");
        let mut remote = self
            .source
            .list_saved()
            .await
            .map_err(|e| e.at_stage(SyncStage::Fetch, None))?;
        remote.reverse();
        let fetched = remote.len();
        info!("Fetched {} saved items", fetched);

        let mut local = self
            .store
            .load()
            .map_err(|e| e.at_stage(SyncStage::Diff, None))?;
        let mut ledger = self
            .store
            .pending_ledger()
            .map_err(|e| e.at_stage(SyncStage::Diff, None))?;

        let fresh = diff(&remote, &local, self.resolver.as_ref())
            .await
            .map_err(|e| e.at_stage(SyncStage::Diff, None))?;
        info!("{} of {} items are new", fresh.len(), fetched);

        let carried = carried_over(&local, &mut ledger)
            .map_err(|e| e.at_stage(SyncStage::Diff, None))?;
        if !carried.is_empty() {
            warn!(
                "{} records from an earlier run were never fully projected",
                carried.len()
            );
        }

        let new_records = fresh.len();
        if new_records > 0 {
            ledger
                .add(fresh.iter().map(|record| record.post_id().to_string()))
                .map_err(|e| e.at_stage(SyncStage::Persist, None))?;
            local.prepend(fresh.clone());
            self.store
                .save(&local)
                .map_err(|e| e.at_stage(SyncStage::Persist, None))?;
        }

        let queue: Vec<NormalizedRecord> = carried.into_iter().chain(fresh).collect();
        let total = queue.len();
        let mut projected = 0;
        let mut rejected = Vec::new();
        for (index, record) in queue.iter().enumerate() {
            let post_id = record.post_id();
            match self.project_pending(&mut ledger, record).await {
                Ok(()) => {
                    projected += 1;
                    info!("Projected {}/{} ({})", index + 1, total, post_id);
                }
                Err(e @ CoreError::Projection { .. }) => {
                    ErrorReporter::new().report_warning(&e);
                    give_up_after_rejections(&mut ledger, post_id)
                        .map_err(|e| e.at_stage(SyncStage::Project, Some(post_id)))?;
                    rejected.push(post_id.to_string());
                }
                Err(e) => return Err(e.at_stage(SyncStage::Project, Some(post_id))),
            }
        }

        info!(
            "Sync complete: {} fetched, {} new, {} projected, {} rejected",
            fetched,
            new_records,
            projected,
            rejected.len()
        );
        Ok(SyncReport {
            run_id,
            fetched,
            new_records,
            projected,
            rejected,
        })
    }

    /// Projects one pending record into the row an earlier attempt created,
    /// or a new one, and clears it from the ledger.
    async fn project_pending(
        &mut self,
        ledger: &mut PendingLedger,
        record: &NormalizedRecord,
    ) -> Result<(), CoreError> {
        let post_id = record.post_id();
        let row = match ledger.row_of(post_id).cloned() {
            Some(row) => {
                debug!("Filling row {} from an earlier attempt for {}", row, post_id);
                row
            }
            None => {
                let row = self.projector.create_row(record).await?;
                ledger.set_row(post_id, row.clone())?;
                row
            }
        };

        self.projector.fill(&row, record).await?;
        ledger.remove(post_id)
    }
}

/// Counts a rejection. The record stays pending until it has been rejected
/// [`MAX_REJECTIONS`] times.
fn give_up_after_rejections(ledger: &mut PendingLedger, post_id: &str) -> Result<(), CoreError> {
    let rejections = ledger.record_rejection(post_id)?;
    if rejections < MAX_REJECTIONS {
        warn!(
            "{} stays pending after {} of {} rejected attempts",
            post_id, rejections, MAX_REJECTIONS
        );
        return Ok(());
    }

    error!(
        "Giving up on {} after {} rejected attempts; its row is left incomplete",
        post_id, rejections
    );
    ledger.remove(post_id)
}

/// Stored records an earlier run left pending, in ledger order. Ledger ids
/// with no stored record are dropped.
fn carried_over(
    local: &LocalStore,
    ledger: &mut PendingLedger,
) -> Result<Vec<NormalizedRecord>, CoreError> {
    let mut carried = Vec::new();
    let mut orphaned = Vec::new();

    for id in ledger.ids() {
        match local.get(id) {
            Some(record) => carried.push(record.clone()),
            None => orphaned.push(id.to_string()),
        }
    }

    for id in orphaned {
        warn!("Pending id {} is not in the store, dropping it", id);
        ledger.remove(&id)?;
    }
    Ok(carried)
}
