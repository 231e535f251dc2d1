use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Reddit API error: {0}")]
    RedditApi(#[from] RedditApiError),

    #[error("Notion API error: {0}")]
    Notion(#[from] NotionApiError),

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    #[error("Gallery scrape error: {0}")]
    Scrape(#[from] ScrapeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Projection of {post_id} failed on field '{field}': {message}")]
    Projection {
        post_id: String,
        field: String,
        message: String,
    },

    #[error("{stage} stage failed{}: {source}", post_suffix(.post_id))]
    StageFailed {
        stage: SyncStage,
        post_id: Option<String>,
        #[source]
        source: Box<CoreError>,
    },
}

fn post_suffix(post_id: &Option<String>) -> String {
    match post_id {
        Some(id) => format!(" for post {}", id),
        None => String::new(),
    }
}

impl CoreError {
    /// Tags an error with the pipeline stage (and item) that raised it.
    pub fn at_stage(self, stage: SyncStage, post_id: Option<&str>) -> Self {
        match self {
            already @ CoreError::StageFailed { .. } => already,
            other => CoreError::StageFailed {
                stage,
                post_id: post_id.map(str::to_string),
                source: Box::new(other),
            },
        }
    }

    /// Strips any stage wrapper and returns the underlying error.
    pub fn root(&self) -> &CoreError {
        match self {
            CoreError::StageFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

/// The five stages of a sync run, used to locate fatal errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Fetch,
    Normalize,
    Diff,
    Persist,
    Project,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStage::Fetch => "fetch",
            SyncStage::Normalize => "normalize",
            SyncStage::Diff => "diff",
            SyncStage::Persist => "persist",
            SyncStage::Project => "project",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone)]
pub enum RedditApiError {
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Forbidden access to resource: {resource}")]
    Forbidden { resource: String },

    #[error("Invalid OAuth token")]
    InvalidToken,

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },
}

#[derive(Error, Debug, Clone)]
pub enum NotionApiError {
    #[error("Notion rejected the integration secret")]
    Unauthorized,

    #[error("Notion object not found: {object}")]
    NotFound { object: String },

    #[error("Notion rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Notion request failed with status {status_code}: {body}")]
    RequestFailed { status_code: u16, body: String },

    #[error("Invalid Notion response: {details}")]
    InvalidResponse { details: String },

    #[error("Request timeout")]
    RequestTimeout,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record store not found: {path}")]
    Missing { path: String },

    #[error("Record store is corrupt: {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("Another sync run holds the lock: {path}")]
    Locked { path: String },

    #[error("Failed to write record store {path}: {reason}")]
    WriteFailed { path: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Gallery page unreachable: {url}: {reason}")]
    PageUnreachable { url: String, reason: String },

    #[error("Gallery page {url} returned status {status_code}")]
    BadStatus { url: String, status_code: u16 },

    #[error("No gallery image link found on {url}")]
    ElementNotFound { url: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
