pub mod api;
pub mod auth;
pub mod gallery;
pub mod retry;


pub use api::RedditApiClient;
pub use auth::{PasswordAuthenticator, RedditToken};
pub use gallery::GalleryScraper;
pub use retry::{RetryConfig, RetryExecutor};

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use sync_core::{CoreError, RedditCredentials, SavedItem, SavedSource};
use tracing::{info, warn};

/// Reads a user's saved items through the OAuth API.
pub struct RedditClient {
    authenticator: PasswordAuthenticator,
    api: RedditApiClient,
    retry: RetryExecutor,
    username: String,
}

impl RedditClient {
    pub fn new(credentials: RedditCredentials) -> Result<Self, CoreError> {
        let api = RedditApiClient::new(credentials.user_agent.clone())?;
        let http_client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let authenticator = PasswordAuthenticator::new(&credentials, http_client)?;

        Ok(Self::from_parts(
            authenticator,
            api,
            RetryExecutor::new(RetryConfig::default()),
            credentials.username,
        ))
    }

    pub fn from_parts(
        authenticator: PasswordAuthenticator,
        api: RedditApiClient,
        retry: RetryExecutor,
        username: String,
    ) -> Self {
        Self {
            authenticator,
            api,
            retry,
            username,
        }
    }

    /// Walks every page of the saved listing, newest first.
    pub async fn fetch_saved(&self, access_token: &str) -> Result<Vec<SavedItem>, CoreError> {
        let mut items = Vec::new();
        let mut after: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let listing = self
                .retry
                .execute("fetch saved page", || {
                    self.api
                        .get_saved_page(access_token, &self.username, after.as_deref())
                })
                .await?;
            pages += 1;

            for child in listing.data.children {
                if let Some(item) = api::saved_item_from_child(child)? {
                    items.push(item);
                }
            }

            match listing.data.after {
                Some(next) if after.as_deref() == Some(next.as_str()) => {
                    warn!("Saved listing repeated cursor {}, stopping", next);
                    break;
                }
                Some(next) => after = Some(next),
                None => break,
            }
        }

        info!(
            "Fetched {} saved items for u/{} in {} page(s)",
            items.len(),
            self.username,
            pages
        );
        Ok(items)
    }
}

#[async_trait]
impl SavedSource for RedditClient {
    async fn list_saved(&self) -> Result<Vec<SavedItem>, CoreError> {
        let token = self.authenticator.authenticate().await?;
        self.fetch_saved(&token.access_token).await
    }
}
