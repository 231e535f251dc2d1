use reqwest::{Client, Method, Response};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use sync_core::{Comment, CoreError, RedditApiError, SavedItem, Submission};
use tracing::{debug, error, info, warn};

pub const REDDIT_API_BASE: &str = "https://oauth.reddit.com";
const SHORTLINK_BASE: &str = "https://redd.it";
const PAGE_LIMIT: &str = "100";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

/// A `t3` thing: a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditLinkData {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    pub author: Option<String>,
    pub subreddit: String,
    #[serde(default)]
    pub url: String,
    pub permalink: String,
    pub created_utc: f64,
    pub score: i64,
    pub num_comments: i64,
    #[serde(default)]
    pub upvote_ratio: f64,
    #[serde(default)]
    pub is_video: bool,
    pub link_flair_text: Option<String>,
    #[serde(default)]
    pub total_awards_received: i64,
}

/// A `t1` thing: a comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditCommentData {
    pub id: String,
    pub body: String,
    pub author: Option<String>,
    pub subreddit: String,
    pub permalink: String,
    pub created_utc: f64,
    pub score: i64,
}

pub type SavedListing = RedditListing<serde_json::Value>;

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    base_url: String,
    user_agent: String,
}

impl RedditApiClient {
    pub fn new(user_agent: String) -> Result<Self, CoreError> {
        Self::with_base_url(user_agent, REDDIT_API_BASE.to_string())
    }

    pub fn with_base_url(user_agent: String, base_url: String) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent,
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: Option<&[(&str, &str)]>,
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let start_time = Instant::now();

        let mut request_builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token);

        if let Some(params) = query_params {
            request_builder = request_builder.query(params);
        }

        info!("Making Reddit API request: {} {}", method, endpoint);
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                if e.is_timeout() {
                    return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        debug!(
            "{} {} answered {} in {:?}",
            method,
            endpoint,
            status,
            start_time.elapsed()
        );

        if status.is_success() {
            return Ok(response);
        }

        error!("Request failed with status: {} for {}", status, endpoint);
        let error = match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse::<u64>().ok())
                    .unwrap_or(60);
                warn!("Rate limited, retry after {} seconds", retry_after);
                RedditApiError::RateLimitExceeded { retry_after }
            }
            401 => RedditApiError::InvalidToken,
            403 => RedditApiError::Forbidden {
                resource: endpoint.to_string(),
            },
            404 => RedditApiError::InvalidResponse {
                details: format!("Resource not found: {}", endpoint),
            },
            code if status.is_server_error() => RedditApiError::ServerError { status_code: code },
            code => RedditApiError::InvalidResponse {
                details: format!("Unexpected status {} for {}", code, endpoint),
            },
        };

        Err(CoreError::RedditApi(error))
    }

    /// One page of `/user/{username}/saved`, newest first.
    pub async fn get_saved_page(
        &self,
        access_token: &str,
        username: &str,
        after: Option<&str>,
    ) -> Result<SavedListing, CoreError> {
        let endpoint = format!("/user/{}/saved", username);
        let mut params = vec![("limit", PAGE_LIMIT), ("raw_json", "1")];
        if let Some(after_val) = after {
            params.push(("after", after_val));
        }

        let response = self
            .make_request(Method::GET, &endpoint, access_token, Some(params.as_slice()))
            .await?;

        let listing: SavedListing = response.json().await.map_err(|e| {
            error!("Failed to parse saved listing: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse saved items for u/{}", username),
            })
        })?;

        debug!(
            "Retrieved {} saved items (after: {:?})",
            listing.data.children.len(),
            after
        );
        Ok(listing)
    }
}

/// Converts one listing child into a saved item. Kinds other than `t1` and
/// `t3` yield `Ok(None)`.
pub fn saved_item_from_child(
    child: RedditListingChild<serde_json::Value>,
) -> Result<Option<SavedItem>, CoreError> {
    let item = match child.kind.as_str() {
        "t3" => {
            let data: RedditLinkData = serde_json::from_value(child.data).map_err(|e| {
                CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: format!("Malformed submission in saved listing: {}", e),
                })
            })?;
            SavedItem::Submission(data.into())
        }
        "t1" => {
            let data: RedditCommentData = serde_json::from_value(child.data).map_err(|e| {
                CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: format!("Malformed comment in saved listing: {}", e),
                })
            })?;
            SavedItem::Comment(data.into())
        }
        other => {
            warn!("Skipping saved thing of unsupported kind {}", other);
            return Ok(None);
        }
    };
    Ok(Some(item))
}

/// Reddit reports deleted accounts as `[deleted]`.
fn live_author(author: Option<String>) -> Option<String> {
    author.filter(|name| name != "[deleted]")
}

impl From<RedditLinkData> for Submission {
    fn from(data: RedditLinkData) -> Self {
        Self {
            shortlink: format!("{}/{}", SHORTLINK_BASE, data.id),
            id: data.id,
            permalink: data.permalink,
            title: data.title,
            subreddit: data.subreddit,
            selftext: data.selftext,
            is_video: data.is_video,
            author: live_author(data.author),
            link_flair_text: data.link_flair_text,
            created_utc: data.created_utc,
            score: data.score,
            total_awards_received: data.total_awards_received,
            num_comments: data.num_comments,
            upvote_ratio: data.upvote_ratio,
            url: data.url,
        }
    }
}

impl From<RedditCommentData> for Comment {
    fn from(data: RedditCommentData) -> Self {
        Self {
            id: data.id,
            permalink: data.permalink,
            body: data.body,
            author: live_author(data.author),
            subreddit: data.subreddit,
            created_utc: data.created_utc,
            score: data.score,
        }
    }
}
