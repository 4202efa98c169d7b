//! Runtime configuration for the Google SSO integration and the HTTP layer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_CREDENTIAL_PATH: &str = "~/.google_services_wrapper/";

/// Scopes requested by default. See
/// https://developers.google.com/gmail/api/auth/scopes and
/// https://developers.google.com/drive/api/v3/about-auth
pub const DEFAULT_SCOPES: &[&str] = &[
    // Create & delete gmail labels
    "https://www.googleapis.com/auth/gmail.labels",
    // Create files in the drive and access all files
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/gmail.send",
    // Assign & remove labels on mails
    "https://www.googleapis.com/auth/gmail.modify",
];

pub const CLIENT_SECRET_FILE: &str = "client_id.json";
pub const TOKEN_FILE: &str = "token.json";

pub const CREDENTIAL_PATH_ENV: &str = "GOOGLE_SERVICES_CREDENTIAL_PATH";
pub const SCOPES_ENV: &str = "GOOGLE_SERVICES_SCOPES";

/// What to authorize and where the token lives.
///
/// Used as the cache key for credentials, so two equal configs share one
/// token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Config {
    pub scopes: Vec<String>,
    /// Folder holding `client_id.json` (downloaded from
    /// https://console.developers.google.com/apis/credentials) and `token.json`.
    pub credential_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            credential_path: PathBuf::from(DEFAULT_CREDENTIAL_PATH),
        }
    }
}

impl Config {
    /// Defaults overridden by `GOOGLE_SERVICES_CREDENTIAL_PATH` and
    /// `GOOGLE_SERVICES_SCOPES` when set.
    pub fn from_env() -> Self {
        Self::default().with_overrides(
            std::env::var(CREDENTIAL_PATH_ENV).ok(),
            std::env::var(SCOPES_ENV).ok(),
        )
    }

    fn with_overrides(mut self, credential_path: Option<String>, scopes: Option<String>) -> Self {
        if let Some(path) = credential_path.filter(|p| !p.trim().is_empty()) {
            self.credential_path = PathBuf::from(path);
        }
        if let Some(scopes) = scopes {
            self.scopes = parse_scopes(&scopes);
        }
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_credential_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credential_path = path.into();
        self
    }

    /// The credential folder with `~` expanded.
    pub fn credential_dir(&self) -> PathBuf {
        expand_home(&self.credential_path)
    }

    pub fn client_secret_path(&self) -> PathBuf {
        self.credential_dir().join(CLIENT_SECRET_FILE)
    }

    pub fn token_path(&self) -> PathBuf {
        self.credential_dir().join(TOKEN_FILE)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scopes.is_empty() {
            return Err(Error::configuration("at least one scope is required"));
        }
        if self.scopes.iter().any(|s| s.trim().is_empty()) {
            return Err(Error::configuration("scopes must not be blank"));
        }
        if self.credential_path.as_os_str().is_empty() {
            return Err(Error::configuration("credential path is empty"));
        }
        let dir = self.credential_dir();
        if dir.exists() && !dir.is_dir() {
            return Err(Error::configuration(format!(
                "credential path {} is not a directory",
                dir.display()
            )));
        }
        Ok(())
    }
}

fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Replaces a leading `~` with the home directory. Paths without one, or
/// hosts without a home directory, are returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; 0 disables retrying.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based), doubling each time.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Endpoints and transport settings shared by the service handles.
#[derive(Debug, Clone)]
pub struct ApiOptions {
    pub drive_base_url: String,
    pub drive_upload_url: String,
    pub gmail_base_url: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            drive_base_url: "https://www.googleapis.com/drive/v3".to_string(),
            drive_upload_url: "https://www.googleapis.com/upload/drive/v3".to_string(),
            gmail_base_url: "https://gmail.googleapis.com/gmail/v1".to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl ApiOptions {
    /// Points every API at one server, using Google's path layout under it.
    pub fn with_root_url(mut self, root: &str) -> Self {
        let root = root.trim_end_matches('/');
        self.drive_base_url = format!("{}/drive/v3", root);
        self.drive_upload_url = format!("{}/upload/drive/v3", root);
        self.gmail_base_url = format!("{}/gmail/v1", root);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
