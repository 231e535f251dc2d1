//! Boundaries between the sync engine and the services it talks to.

use crate::{CoreError, PatchOutcome, PropertyPatch, RowId, SavedItem};
use async_trait::async_trait;

/// Source of the user's saved items.
#[async_trait]
pub trait SavedSource: Send + Sync {
    /// Every saved item, in the order the platform delivers them
    /// (most recently saved first).
    async fn list_saved(&self) -> Result<Vec<SavedItem>, CoreError>;
}

/// Resolves the displayable image of a gallery submission.
#[async_trait]
pub trait GalleryResolver: Send + Sync {
    async fn resolve_gallery_image(&self, page_url: &str) -> Result<String, CoreError>;
}

/// The document database rows are projected into.
#[async_trait]
pub trait RemoteDatabase: Send + Sync {
    async fn create_row(&self) -> Result<RowId, CoreError>;

    async fn patch_properties(
        &self,
        row: &RowId,
        properties: &[PropertyPatch],
    ) -> Result<PatchOutcome, CoreError>;

    async fn append_text_block(&self, row: &RowId, text: &str) -> Result<(), CoreError>;
}
