pub mod properties;

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use sync_core::{
    CoreError, NotionApiError, NotionCredentials, PatchOutcome, PropertyPatch, RemoteDatabase,
    RowId,
};
use tracing::{debug, error, info, warn};

pub const NOTION_API_BASE: &str = "https://api.notion.com/v1";
pub const NOTION_VERSION: &str = "2021-05-13";

#[derive(Debug, Deserialize)]
struct CreatedPage {
    id: String,
}

/// Rows of one Notion database, driven through the public REST API.
#[derive(Debug)]
pub struct NotionClient {
    http_client: Client,
    base_url: String,
    secret: String,
    database_id: String,
}

impl NotionClient {
    pub fn new(credentials: &NotionCredentials) -> Result<Self, CoreError> {
        Self::with_base_url(credentials, NOTION_API_BASE.to_string())
    }

    pub fn with_base_url(
        credentials: &NotionCredentials,
        base_url: String,
    ) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret: credentials.secret.clone(),
            database_id: credentials.database_id.clone(),
        })
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    async fn send(&self, method: Method, path: &str, body: &Value) -> Result<Response, CoreError> {
        let url = format!("{}{}", self.base_url, path);
        let start_time = Instant::now();

        debug!("Making Notion API request: {} {}", method, path);
        let response = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(&self.secret)
            .header("Notion-Version", NOTION_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!("Network error for {} {}: {}", method, path, e);
                if e.is_timeout() {
                    CoreError::Notion(NotionApiError::RequestTimeout)
                } else {
                    CoreError::Network(e)
                }
            })?;

        debug!(
            "{} {} answered {} in {:?}",
            method,
            path,
            response.status(),
            start_time.elapsed()
        );
        Ok(response)
    }

    /// Turns a non-success response into the matching error.
    async fn failure(path: &str, response: Response) -> CoreError {
        let status = response.status();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        error!("Notion request {} failed with {}: {}", path, status, body);

        let error = match status {
            StatusCode::UNAUTHORIZED => NotionApiError::Unauthorized,
            StatusCode::NOT_FOUND => NotionApiError::NotFound {
                object: path.to_string(),
            },
            StatusCode::TOO_MANY_REQUESTS => NotionApiError::RateLimitExceeded {
                retry_after: retry_after.unwrap_or(1),
            },
            _ => NotionApiError::RequestFailed {
                status_code: status.as_u16(),
                body,
            },
        };
        CoreError::Notion(error)
    }
}

#[async_trait]
impl RemoteDatabase for NotionClient {
    async fn create_row(&self) -> Result<RowId, CoreError> {
        let body = json!({
            "parent": {"database_id": self.database_id},
            "properties": {}
        });

        let response = self.send(Method::POST, "/pages", &body).await?;
        if !response.status().is_success() {
            return Err(Self::failure("/pages", response).await);
        }

        let page: CreatedPage = response.json().await.map_err(|e| {
            CoreError::Notion(NotionApiError::InvalidResponse {
                details: format!("created page without id: {}", e),
            })
        })?;

        info!("Created Notion row {}", page.id);
        Ok(RowId(page.id))
    }

    async fn patch_properties(
        &self,
        row: &RowId,
        properties: &[PropertyPatch],
    ) -> Result<PatchOutcome, CoreError> {
        let path = format!("/pages/{}", row);
        let body = json!({
            "object": "page",
            "properties": properties::properties_json(properties)
        });

        let response = self.send(Method::PATCH, &path, &body).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(PatchOutcome::Applied);
        }

        if status == StatusCode::BAD_REQUEST {
            let message = response.text().await.unwrap_or_default();
            warn!("Notion rejected patch of row {}: {}", row, message);
            return Ok(PatchOutcome::Rejected { message });
        }

        Err(Self::failure(&path, response).await)
    }

    async fn append_text_block(&self, row: &RowId, text: &str) -> Result<(), CoreError> {
        let path = format!("/blocks/{}/children", row);
        let body = json!({"children": [properties::paragraph_block(text)]});

        let response = self.send(Method::PATCH, &path, &body).await?;
        if !response.status().is_success() {
            return Err(Self::failure(&path, response).await);
        }

        debug!("Appended text block to row {}", row);
        Ok(())
    }
}
