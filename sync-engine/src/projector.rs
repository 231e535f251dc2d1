use std::slice;
use std::sync::Arc;
use sync_core::{
    CommentRecord, CoreError, NormalizedRecord, PatchOutcome, PropertyPatch, PropertyValue,
    RemoteDatabase, RowId, SubmissionRecord,
};
use tracing::{debug, warn};

/// Colors a new subreddit option may be given.
pub const SUBREDDIT_PALETTE: [&str; 9] = [
    "gray", "brown", "orange", "yellow", "green", "blue", "purple", "pink", "red",
];

pub const COLOR_MISMATCH: &str = "Select option color doesn't match existing";

const NAME_PREVIEW_CHARS: usize = 20;

/// Palette slot for a draw in `0..9`: one below the draw, wrapping to the
/// last color for zero.
pub fn palette_index(draw: usize) -> usize {
    let len = SUBREDDIT_PALETTE.len();
    (draw % len + len - 1) % len
}

/// Whether a rejection means the option exists with a different color.
pub fn is_color_mismatch(message: &str) -> bool {
    message.contains(COLOR_MISMATCH)
}

fn ratio_text(ratio: f64) -> String {
    if ratio.fract() == 0.0 {
        format!("{:.1}", ratio)
    } else {
        ratio.to_string()
    }
}

/// Whether anything is left of a select option name once commas and
/// whitespace are stripped.
fn has_option_name(raw: &str) -> bool {
    raw.chars().any(|c| c != ',' && !c.is_whitespace())
}

fn text(value: &str) -> PropertyValue {
    PropertyValue::RichText(value.to_string())
}

/// Everything but the select columns, sent as one patch.
pub fn plain_fields(record: &NormalizedRecord) -> Vec<PropertyPatch> {
    match record {
        NormalizedRecord::Submission(record) => submission_fields(record),
        NormalizedRecord::Comment(record) => comment_fields(record),
    }
}

fn submission_fields(record: &SubmissionRecord) -> Vec<PropertyPatch> {
    let mut fields = vec![
        PropertyPatch::new("post_id", text(&record.post_id)),
        PropertyPatch::new("Name", PropertyValue::Title(record.title.clone())),
        PropertyPatch::new("text", text(&record.text)),
        PropertyPatch::new("is_video", PropertyValue::Checkbox(record.is_video)),
        PropertyPatch::new("has_gallery", PropertyValue::Checkbox(record.has_gallery)),
        PropertyPatch::new("has_img", PropertyValue::Checkbox(record.has_img)),
    ];

    if let Some(img) = &record.img {
        fields.push(PropertyPatch::new(
            "img",
            PropertyValue::ExternalFile(img.clone()),
        ));
        fields.push(PropertyPatch::new("img_link", PropertyValue::Url(img.clone())));
    }
    if let Some(author) = &record.author {
        fields.push(PropertyPatch::new("author", text(author)));
    }

    fields.extend([
        PropertyPatch::new("created", text(&record.created)),
        PropertyPatch::new("score", PropertyValue::Number(record.score as f64)),
        PropertyPatch::new(
            "total_awards_received",
            PropertyValue::Number(record.total_awards_received as f64),
        ),
        PropertyPatch::new(
            "num_comments",
            PropertyValue::Number(record.num_comments as f64),
        ),
        PropertyPatch::new("upvote_ratio", text(&ratio_text(record.upvote_ratio))),
        PropertyPatch::new("link", PropertyValue::Url(record.shortlink.clone())),
    ]);
    fields
}

fn comment_fields(record: &CommentRecord) -> Vec<PropertyPatch> {
    let name: String = record.body.chars().take(NAME_PREVIEW_CHARS).collect();
    let mut fields = vec![
        PropertyPatch::new("post_id", text(&record.post_id)),
        PropertyPatch::new("Name", PropertyValue::Title(name)),
        PropertyPatch::new("is_video", PropertyValue::Checkbox(false)),
        PropertyPatch::new("has_gallery", PropertyValue::Checkbox(false)),
        PropertyPatch::new("has_img", PropertyValue::Checkbox(false)),
    ];

    if let Some(author) = &record.author {
        fields.push(PropertyPatch::new("author", text(author)));
    }

    fields.extend([
        PropertyPatch::new("created", text(&record.created)),
        PropertyPatch::new("score", PropertyValue::Number(record.score as f64)),
        PropertyPatch::new("link", PropertyValue::Url(record.link.clone())),
    ]);
    fields
}

/// Writes records as rows of a [`RemoteDatabase`].
pub struct Projector {
    database: Arc<dyn RemoteDatabase>,
    rng: fastrand::Rng,
}

impl Projector {
    pub fn new(database: Arc<dyn RemoteDatabase>) -> Self {
        Self::with_rng(database, fastrand::Rng::new())
    }

    pub fn with_rng(database: Arc<dyn RemoteDatabase>, rng: fastrand::Rng) -> Self {
        Self { database, rng }
    }

    /// Select columns, each patched on its own.
    pub fn select_fields(&mut self, record: &NormalizedRecord) -> Vec<PropertyPatch> {
        let color = SUBREDDIT_PALETTE[palette_index(self.rng.usize(0..SUBREDDIT_PALETTE.len()))];
        let mut fields = vec![
            PropertyPatch::new(
                "type",
                PropertyValue::select(record.kind().to_string(), "default"),
            ),
            PropertyPatch::new(
                "subreddit",
                PropertyValue::select(record.subreddit(), color),
            ),
        ];

        if let NormalizedRecord::Submission(SubmissionRecord {
            flair: Some(flair), ..
        }) = record
        {
            if has_option_name(flair) {
                fields.push(PropertyPatch::new(
                    "flair",
                    PropertyValue::select(flair.as_str(), "default"),
                ));
            }
        }
        fields
    }

    /// Creates the empty row a record is then written into.
    pub async fn create_row(&self, record: &NormalizedRecord) -> Result<RowId, CoreError> {
        let row = self.database.create_row().await?;
        debug!("Row {} created for {}", row, record.post_id());
        Ok(row)
    }

    /// Writes every field and the body of `record` into `row`. Safe to repeat
    /// on a row an earlier attempt left half written.
    pub async fn fill(&mut self, row: &RowId, record: &NormalizedRecord) -> Result<(), CoreError> {
        let post_id = record.post_id();
        let fields = plain_fields(record);
        if let PatchOutcome::Rejected { message } =
            self.database.patch_properties(row, &fields).await?
        {
            return Err(CoreError::Projection {
                post_id: post_id.to_string(),
                field: "properties".to_string(),
                message,
            });
        }

        for patch in self.select_fields(record) {
            self.patch_select(row, post_id, &patch).await?;
        }

        self.database
            .append_text_block(row, record.body_text())
            .await
    }

    async fn patch_select(
        &self,
        row: &RowId,
        post_id: &str,
        patch: &PropertyPatch,
    ) -> Result<(), CoreError> {
        let message = match self
            .database
            .patch_properties(row, slice::from_ref(patch))
            .await?
        {
            PatchOutcome::Applied => return Ok(()),
            PatchOutcome::Rejected { message } if is_color_mismatch(&message) => message,
            PatchOutcome::Rejected { message } => {
                return Err(projection_error(post_id, patch, message))
            }
        };

        warn!(
            "Option '{}' exists with another color, retrying without color: {}",
            patch.name, message
        );
        let uncolored = PropertyPatch::new(patch.name.clone(), patch.value.without_color());
        match self
            .database
            .patch_properties(row, slice::from_ref(&uncolored))
            .await?
        {
            PatchOutcome::Applied => Ok(()),
            PatchOutcome::Rejected { message } => Err(projection_error(post_id, patch, message)),
        }
    }
}

fn projection_error(post_id: &str, patch: &PropertyPatch, message: String) -> CoreError {
    CoreError::Projection {
        post_id: post_id.to_string(),
        field: patch.name.clone(),
        message,
    }
}
