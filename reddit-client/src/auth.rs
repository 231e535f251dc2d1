//! Reddit "script" app authentication through the OAuth2 password grant.

use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, RequestTokenError,
    ResourceOwnerPassword, ResourceOwnerUsername, Scope, TokenResponse, TokenUrl,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sync_core::{CoreError, RedditApiError, RedditCredentials};
use tracing::{debug, error, info, warn};

pub const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
pub const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditToken {
    pub access_token: String,
    /// Scopes Reddit granted; empty when the response did not list them.
    pub scope: Vec<String>,
}

impl RedditToken {
    /// Required scopes the token was not granted.
    pub fn missing_scopes(&self) -> Vec<&'static str> {
        if self.scope.is_empty() {
            return Vec::new();
        }
        PasswordAuthenticator::required_scopes()
            .into_iter()
            .filter(|required| !self.scope.iter().any(|granted| granted == required))
            .collect()
    }
}

pub struct PasswordAuthenticator {
    oauth_client: BasicClient,
    http_client: Client,
    username: ResourceOwnerUsername,
    password: ResourceOwnerPassword,
    user_agent: String,
}

impl PasswordAuthenticator {
    pub fn new(credentials: &RedditCredentials, http_client: Client) -> Result<Self, CoreError> {
        Self::with_token_url(credentials, http_client, REDDIT_TOKEN_URL)
    }

    pub fn with_token_url(
        credentials: &RedditCredentials,
        http_client: Client,
        token_url: &str,
    ) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(REDDIT_AUTH_URL.to_string()).map_err(invalid_url)?;
        let token_url = TokenUrl::new(token_url.to_string()).map_err(invalid_url)?;

        let oauth_client = BasicClient::new(
            ClientId::new(credentials.client_id.clone()),
            Some(ClientSecret::new(credentials.client_secret.clone())),
            auth_url,
            Some(token_url),
        );

        Ok(Self {
            oauth_client,
            http_client,
            username: ResourceOwnerUsername::new(credentials.username.clone()),
            password: ResourceOwnerPassword::new(credentials.password.clone()),
            user_agent: credentials.user_agent.clone(),
        })
    }

    /// Scopes needed to read the saved listing.
    pub fn required_scopes() -> Vec<&'static str> {
        vec!["identity", "history", "read"]
    }

    pub async fn authenticate(&self) -> Result<RedditToken, CoreError> {
        info!("Requesting Reddit access token for u/{}", self.username.as_str());

        let mut request = self
            .oauth_client
            .exchange_password(&self.username, &self.password);
        for scope in Self::required_scopes() {
            request = request.add_scope(Scope::new(scope.to_string()));
        }

        let http_client = self.http_client.clone();
        let user_agent = self.user_agent.clone();
        let token = request
            .request_async(move |oauth_request| {
                send_token_request(http_client, user_agent, oauth_request)
            })
            .await
            .map_err(|e| {
                let reason = match e {
                    RequestTokenError::ServerResponse(response) => response.to_string(),
                    RequestTokenError::Request(err) => return CoreError::Network(err),
                    // Reddit answers bad credentials with 200 and {"error": ...}
                    RequestTokenError::Parse(err, _) => format!("unexpected token response: {}", err),
                    RequestTokenError::Other(message) => message,
                };
                error!("Reddit authentication failed: {}", reason);
                CoreError::RedditApi(RedditApiError::AuthenticationFailed { reason })
            })?;

        let scope = token
            .scopes()
            .map(|scopes| scopes.iter().map(|s| s.as_str().to_string()).collect())
            .unwrap_or_default();
        debug!("Reddit access token valid for {:?}", token.expires_in());

        let token = RedditToken {
            access_token: token.access_token().secret().clone(),
            scope,
        };
        let missing = token.missing_scopes();
        if !missing.is_empty() {
            warn!(
                "Reddit token lacks scopes {:?}; the saved listing may be refused",
                missing
            );
        }
        Ok(token)
    }
}

/// Token requests go through our own client so Reddit sees the configured
/// user agent.
async fn send_token_request(
    http_client: Client,
    user_agent: String,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let mut request_builder = http_client
        .request(request.method, request.url.as_str())
        .body(request.body);
    for (name, value) in &request.headers {
        request_builder = request_builder.header(name.as_str(), value.as_bytes());
    }
    request_builder = request_builder.header(reqwest::header::USER_AGENT, user_agent);

    let response = request_builder.send().await?;
    let status_code = response.status();
    let headers = response.headers().to_owned();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}

fn invalid_url(e: oauth2::url::ParseError) -> CoreError {
    CoreError::RedditApi(RedditApiError::AuthenticationFailed {
        reason: format!("invalid OAuth endpoint: {}", e),
    })
}
