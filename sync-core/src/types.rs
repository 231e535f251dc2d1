use serde::{Deserialize, Serialize};
use std::fmt;

/// A saved item as delivered by the content platform.
#[derive(Debug, Clone, PartialEq)]
pub enum SavedItem {
    Submission(Submission),
    Comment(Comment),
}

impl SavedItem {
    pub fn id(&self) -> &str {
        match self {
            SavedItem::Submission(submission) => &submission.id,
            SavedItem::Comment(comment) => &comment.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: String,
    pub permalink: String,
    pub title: String,
    pub subreddit: String,
    pub selftext: String,
    pub is_video: bool,
    /// `None` when the account was deleted.
    pub author: Option<String>,
    pub link_flair_text: Option<String>,
    pub created_utc: f64,
    pub score: i64,
    pub total_awards_received: i64,
    pub num_comments: i64,
    pub upvote_ratio: f64,
    pub shortlink: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub permalink: String,
    pub body: String,
    /// `None` when the account was deleted.
    pub author: Option<String>,
    pub subreddit: String,
    pub created_utc: f64,
    pub score: i64,
}

/// The flat record kept in the local store and projected to Notion.
///
/// Serialized with a `"type"` tag so a stored record reads
/// `{"type": "Submission", "post_id": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NormalizedRecord {
    Submission(SubmissionRecord),
    Comment(CommentRecord),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub post_id: String,
    pub link: String,
    pub title: String,
    pub subreddit: String,
    pub text: String,
    pub is_video: bool,
    pub has_gallery: bool,
    pub has_img: bool,
    #[serde(default, deserialize_with = "legacy_optional::deserialize")]
    pub img: Option<String>,
    #[serde(default, deserialize_with = "legacy_optional::deserialize")]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "legacy_optional::deserialize")]
    pub flair: Option<String>,
    pub created: String,
    pub score: i64,
    pub total_awards_received: i64,
    pub num_comments: i64,
    pub upvote_ratio: f64,
    pub shortlink: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub post_id: String,
    pub link: String,
    pub body: String,
    #[serde(default, deserialize_with = "legacy_optional::deserialize")]
    pub author: Option<String>,
    pub subreddit: String,
    pub created: String,
    pub score: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Submission,
    Comment,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Submission => f.write_str("Submission"),
            RecordKind::Comment => f.write_str("Comment"),
        }
    }
}

impl NormalizedRecord {
    pub fn post_id(&self) -> &str {
        match self {
            NormalizedRecord::Submission(record) => &record.post_id,
            NormalizedRecord::Comment(record) => &record.post_id,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            NormalizedRecord::Submission(_) => RecordKind::Submission,
            NormalizedRecord::Comment(_) => RecordKind::Comment,
        }
    }

    pub fn author(&self) -> Option<&str> {
        match self {
            NormalizedRecord::Submission(record) => record.author.as_deref(),
            NormalizedRecord::Comment(record) => record.author.as_deref(),
        }
    }

    pub fn subreddit(&self) -> &str {
        match self {
            NormalizedRecord::Submission(record) => &record.subreddit,
            NormalizedRecord::Comment(record) => &record.subreddit,
        }
    }

    /// Selftext for submissions, comment body for comments.
    pub fn body_text(&self) -> &str {
        match self {
            NormalizedRecord::Submission(record) => &record.text,
            NormalizedRecord::Comment(record) => &record.body,
        }
    }
}

/// Older stores wrote `false` where a string was absent; read it as `None`.
mod legacy_optional {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Flag(bool),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Text(text)) => Ok(Some(text)),
            Some(Raw::Flag(false)) | None => Ok(None),
            Some(Raw::Flag(true)) => Err(D::Error::custom(
                "expected a string, null or false, found true",
            )),
        }
    }
}
