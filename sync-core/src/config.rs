//! Run configuration: an optional TOML file overlaid with environment
//! variables (a `.env` file in the working directory is loaded first).

use crate::ConfigError;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_PATH_VAR: &str = "SAVED_SYNC_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "saved-sync.toml";
pub const DEFAULT_STORE_PATH: &str = "saved_posts_data.json";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub reddit: RedditSettings,
    #[serde(default)]
    pub notion: NotionSettings,
    #[serde(default)]
    pub store: StoreSettings,
}

#[derive(Clone, Default, Deserialize)]
pub struct RedditSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Clone, Default, Deserialize)]
pub struct NotionSettings {
    pub secret: Option<String>,
    pub database_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

/// Credentials for the Reddit script-app password grant.
#[derive(Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

#[derive(Clone)]
pub struct NotionCredentials {
    pub secret: String,
    pub database_id: String,
}

impl AppConfig {
    /// Loads `SAVED_SYNC_CONFIG` (or `saved-sync.toml` when present), then
    /// applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }

        let mut config = match env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            Err(_) => Self::default(),
        };

        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        debug!("Read configuration from {}", path.display());
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Overrides file values with the variables `lookup` knows about.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let overrides: [(&str, &mut Option<String>); 7] = [
            ("CLIENT_ID", &mut self.reddit.client_id),
            ("CLIENT_SECRET", &mut self.reddit.client_secret),
            ("USERNAME", &mut self.reddit.username),
            ("PASSWORD", &mut self.reddit.password),
            ("AGENT", &mut self.reddit.user_agent),
            ("BEARER_SECRET", &mut self.notion.secret),
            ("NOTION_DATABASE_ID", &mut self.notion.database_id),
        ];
        for (key, slot) in overrides {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = Some(value);
            }
        }

        if let Some(path) = lookup("STORE_PATH").filter(|v| !v.trim().is_empty()) {
            self.store.path = PathBuf::from(path);
        }
    }

    /// Fails with the first credential that is missing or malformed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reddit_credentials()?;
        self.notion_credentials()?;
        Ok(())
    }

    pub fn reddit_credentials(&self) -> Result<RedditCredentials, ConfigError> {
        Ok(RedditCredentials {
            client_id: required(&self.reddit.client_id, "CLIENT_ID")?,
            client_secret: required(&self.reddit.client_secret, "CLIENT_SECRET")?,
            username: required(&self.reddit.username, "USERNAME")?,
            password: required(&self.reddit.password, "PASSWORD")?,
            user_agent: required(&self.reddit.user_agent, "AGENT")?,
        })
    }

    pub fn notion_credentials(&self) -> Result<NotionCredentials, ConfigError> {
        let database_id = required(&self.notion.database_id, "NOTION_DATABASE_ID")?;
        if database_id.contains('/') || database_id.contains('?') {
            return Err(ConfigError::InvalidValue {
                field: "NOTION_DATABASE_ID".to_string(),
                value: database_id,
            });
        }

        Ok(NotionCredentials {
            secret: required(&self.notion.secret, "BEARER_SECRET")?,
            database_id,
        })
    }
}

fn required(value: &Option<String>, field: &str) -> Result<String, ConfigError> {
    value
        .as_ref()
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingField {
            field: field.to_string(),
        })
}

impl fmt::Debug for RedditSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &redacted(&self.client_secret))
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl fmt::Debug for NotionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionSettings")
            .field("secret", &redacted(&self.secret))
            .field("database_id", &self.database_id)
            .finish()
    }
}

fn redacted(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| "<redacted>")
}
