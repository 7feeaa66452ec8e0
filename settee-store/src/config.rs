//! Connection configuration for the CouchDB store.

use crate::error::{StoreError, StoreResult};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Environment variable holding a full database URL.
pub const ENV_URL: &str = "SETTEE_COUCH_URL";
/// Environment variable overriding the user name.
pub const ENV_USER: &str = "SETTEE_COUCH_USER";
/// Environment variable overriding the password.
pub const ENV_PASSWORD: &str = "SETTEE_COUCH_PASSWORD";

/// CouchDB connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouchConfig {
    /// Server base URL, without the database (e.g. `http://127.0.0.1:5984`).
    pub url: String,
    /// Database name.
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for CouchConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:5984".to_string(),
            database: "test".to_string(),
            username: None,
            password: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl CouchConfig {
    /// Parses a database URL such as `http://user:pw@127.0.0.1:5984/test`.
    ///
    /// The last path segment names the database; any preceding segments stay
    /// part of the server URL (for servers mounted under a prefix).
    pub fn from_url(database_url: &str) -> StoreResult<Self> {
        let mut url = Url::parse(database_url)
            .map_err(|e| StoreError::Config(format!("invalid database URL {database_url:?}: {e}")))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(StoreError::Config(format!(
                "unsupported URL scheme: {}",
                url.scheme()
            )));
        }

        let username = match url.username() {
            "" => None,
            name => Some(decode(name)?),
        };
        let password = url.password().map(decode).transpose()?;

        let segments: Vec<String> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).map(str::to_string).collect())
            .unwrap_or_default();
        let Some((database, prefix)) = segments.split_last() else {
            return Err(StoreError::Config(format!(
                "database URL {database_url:?} has no database name"
            )));
        };
        let database = decode(database)?;

        url.set_path(&prefix.join("/"));
        url.set_query(None);
        url.set_fragment(None);
        // Credentials travel in `username`/`password`, not in the base URL.
        let _ = url.set_username("");
        let _ = url.set_password(None);

        Ok(Self {
            url: url.as_str().trim_end_matches('/').to_string(),
            database,
            username,
            password,
            timeout_secs: default_timeout_secs(),
        })
    }

    /// Builds a config from `SETTEE_COUCH_URL`, `SETTEE_COUCH_USER` and
    /// `SETTEE_COUCH_PASSWORD`, falling back to defaults for anything unset.
    pub fn from_env() -> StoreResult<Self> {
        let mut config = match std::env::var(ENV_URL) {
            Ok(url) if !url.is_empty() => Self::from_url(&url)?,
            _ => Self::default(),
        };
        if let Ok(user) = std::env::var(ENV_USER) {
            config.username = Some(user);
        }
        if let Ok(password) = std::env::var(ENV_PASSWORD) {
            config.password = Some(password);
        }
        Ok(config)
    }

    /// The server URL without a trailing slash.
    pub fn server_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// The database URL, with the database name percent-encoded.
    pub fn database_url(&self) -> String {
        format!(
            "{}/{}",
            self.server_url(),
            urlencoding::encode(&self.database)
        )
    }
}

fn decode(component: &str) -> StoreResult<String> {
    urlencoding::decode(component)
        .map(|s| s.into_owned())
        .map_err(|e| StoreError::Config(format!("invalid percent-encoding in URL: {e}")))
}
