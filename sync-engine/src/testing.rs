//! In-memory ports for unit tests.

use async_trait::async_trait;
use std::sync::Mutex;
use sync_core::{
    Comment, CoreError, GalleryResolver, PatchOutcome, PropertyPatch, PropertyValue,
    RemoteDatabase, RowId, SavedItem, ScrapeError, Submission,
};

pub fn submission(id: &str, url: &str) -> SavedItem {
    SavedItem::Submission(Submission {
        id: id.to_string(),
        permalink: format!("/r/pics/comments/{}/title/", id),
        title: format!("Title of {}", id),
        subreddit: "pics".to_string(),
        selftext: format!("Selftext of {}", id),
        is_video: false,
        author: Some("poster".to_string()),
        link_flair_text: None,
        created_utc: 1609459200.0,
        score: 100,
        total_awards_received: 2,
        num_comments: 4,
        upvote_ratio: 0.97,
        shortlink: format!("https://redd.it/{}", id),
        url: url.to_string(),
    })
}

pub fn comment(id: &str) -> SavedItem {
    SavedItem::Comment(Comment {
        id: id.to_string(),
        permalink: format!("/r/rust/comments/post/title/{}/", id),
        body: format!("A saved comment {} with a body longer than twenty chars", id),
        author: Some("commenter".to_string()),
        subreddit: "rust".to_string(),
        created_utc: 1609459200.0,
        score: 5,
    })
}

pub struct FakeResolver {
    image: Option<String>,
    requested: Mutex<Vec<String>>,
}

impl FakeResolver {
    pub fn returning(image: &str) -> Self {
        Self {
            image: Some(image.to_string()),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            image: None,
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requested.lock().unwrap().len()
    }
}

#[async_trait]
impl GalleryResolver for FakeResolver {
    async fn resolve_gallery_image(&self, page_url: &str) -> Result<String, CoreError> {
        self.requested.lock().unwrap().push(page_url.to_string());
        self.image.clone().ok_or_else(|| {
            CoreError::Scrape(ScrapeError::ElementNotFound {
                url: page_url.to_string(),
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(RowId),
    Patch(RowId, Vec<PropertyPatch>),
    Append(RowId, String),
}

/// Records every call. Patches of `rejected_property` are refused with
/// `rejection` for as many times as `rejections_left` allows; only colored
/// selects when `colored_only` is set.
pub struct FakeDatabase {
    calls: Mutex<Vec<Call>>,
    rejected_property: Option<String>,
    rejection: String,
    rejections_left: Mutex<usize>,
    colored_only: bool,
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            rejected_property: None,
            rejection: String::new(),
            rejections_left: Mutex::new(0),
            colored_only: true,
        }
    }

    pub fn rejecting(property: &str, message: &str, times: usize) -> Self {
        Self {
            rejected_property: Some(property.to_string()),
            rejection: message.to_string(),
            rejections_left: Mutex::new(times),
            ..Self::new()
        }
    }

    pub fn rejecting_always(property: &str, message: &str) -> Self {
        Self {
            colored_only: false,
            ..Self::rejecting(property, message, usize::MAX)
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn patches_of(&self, property: &str) -> Vec<PropertyValue> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Patch(_, patches) => Some(patches),
                _ => None,
            })
            .flatten()
            .filter(|patch| patch.name == property)
            .map(|patch| patch.value)
            .collect()
    }

    fn should_reject(&self, properties: &[PropertyPatch]) -> bool {
        let Some(rejected) = &self.rejected_property else {
            return false;
        };
        let targeted = properties.iter().any(|patch| {
            &patch.name == rejected
                && (!self.colored_only
                    || matches!(patch.value, PropertyValue::Select { color: Some(_), .. }))
        });
        let mut left = self.rejections_left.lock().unwrap();
        if targeted && *left > 0 {
            *left -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl RemoteDatabase for FakeDatabase {
    async fn create_row(&self) -> Result<RowId, CoreError> {
        let mut calls = self.calls.lock().unwrap();
        let created = calls
            .iter()
            .filter(|call| matches!(call, Call::Create(_)))
            .count();
        let row = RowId(format!("row-{}", created + 1));
        calls.push(Call::Create(row.clone()));
        Ok(row)
    }

    async fn patch_properties(
        &self,
        row: &RowId,
        properties: &[PropertyPatch],
    ) -> Result<PatchOutcome, CoreError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Patch(row.clone(), properties.to_vec()));
        if self.should_reject(properties) {
            Ok(PatchOutcome::Rejected {
                message: self.rejection.clone(),
            })
        } else {
            Ok(PatchOutcome::Applied)
        }
    }

    async fn append_text_block(&self, row: &RowId, text: &str) -> Result<(), CoreError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Append(row.clone(), text.to_string()));
        Ok(())
    }
}
