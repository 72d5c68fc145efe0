//! Configuration loading for the mailx service
//!
//! OAuth client credentials are loaded from (in order of priority):
//! 1. Compile-time embedded credentials (for production builds)
//! 2. JSON file (Google Cloud Console format)
//! 3. Runtime environment variables (fallback)
//!
//! Service tuning lives in `mailx.json` in the same config directory, with
//! environment overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use config::{CREDENTIALS_FILE, DATABASE_FILE, SETTINGS_FILE};

/// Redirect used when neither the credential file nor the environment names one
const DEFAULT_REDIRECT_URL: &str = "http://localhost:8080/callback";

/// OAuth client registration for Google APIs
#[derive(Debug, Clone)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

/// Google Cloud Console credential file format
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<InstalledCredentials>,
    web: Option<InstalledCredentials>,
}

#[derive(Deserialize)]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

impl GoogleCredentials {
    /// Load credentials using the following priority:
    /// 1. Compile-time embedded credentials (for production builds)
    /// 2. JSON file (~/.config/mailx/google-credentials.json)
    /// 3. Runtime environment variables
    pub fn load() -> Result<Self> {
        if let Some(creds) = Self::from_compile_time() {
            return Ok(creds);
        }

        if let Some(creds) = config::load_json::<GoogleCredentialFile>(CREDENTIALS_FILE)? {
            return Self::from_credential_file(creds);
        }

        Self::from_env()
    }

    /// Load credentials embedded at compile time via environment variables.
    /// Build with: GOOGLE_CLIENT_ID=xxx GOOGLE_CLIENT_SECRET=yyy cargo build --release
    pub fn from_compile_time() -> Option<Self> {
        let client_id = option_env!("GOOGLE_CLIENT_ID")?;
        let client_secret = option_env!("GOOGLE_CLIENT_SECRET")?;

        if client_id.is_empty() || client_secret.is_empty() {
            return None;
        }

        Some(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_url: option_env!("GOOGLE_REDIRECT_URL")
                .unwrap_or(DEFAULT_REDIRECT_URL)
                .to_string(),
        })
    }

    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self> {
        // Support both "installed" (desktop) and "web" credential types
        let installed = creds
            .installed
            .or(creds.web)
            .context("Credentials file missing 'installed' or 'web' section")?;

        let redirect_url = std::env::var("GOOGLE_REDIRECT_URL")
            .ok()
            .or_else(|| installed.redirect_uris.into_iter().next())
            .unwrap_or_else(|| DEFAULT_REDIRECT_URL.to_string());

        Ok(Self {
            client_id: installed.client_id,
            client_secret: installed.client_secret,
            redirect_url,
        })
    }

    /// Parse credentials from JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let creds: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(creds)
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GOOGLE_CLIENT_ID")
            .context("GOOGLE_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET")
            .context("GOOGLE_CLIENT_SECRET environment variable not set")?;
        let redirect_url = std::env::var("GOOGLE_REDIRECT_URL")
            .unwrap_or_else(|_| DEFAULT_REDIRECT_URL.to_string());

        Ok(Self {
            client_id,
            client_secret,
            redirect_url,
        })
    }

    /// Get the default credentials file path (~/.config/mailx/google-credentials.json)
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }
}

/// Tuning for the session layer and the hydration pipeline
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// SQLite database holding users and credentials
    pub database_path: Option<PathBuf>,
    /// Messages listed per `get_messages` call
    pub messages_limit: usize,
    /// Worker threads fetching message bodies concurrently
    pub fetch_concurrency: usize,
    /// Timeout for a single provider HTTP request
    pub request_timeout_secs: u64,
    /// Budget for one hydration pass; unstarted fetches are abandoned after it
    pub hydrate_deadline_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            messages_limit: 10,
            fetch_concurrency: 8,
            request_timeout_secs: 30,
            hydrate_deadline_secs: 60,
        }
    }
}

impl ServiceConfig {
    /// Load `mailx.json` if present, then apply environment overrides
    pub fn load() -> Result<Self> {
        let config = config::load_json::<Self>(SETTINGS_FILE)?.unwrap_or_default();
        config.with_env_overrides()
    }

    /// Parse settings from a JSON string; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse service config JSON")
    }

    fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(path) = std::env::var("MAILX_DATABASE_PATH") {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Ok(limit) = std::env::var("MAILX_MESSAGES_LIMIT") {
            self.messages_limit = limit
                .parse()
                .with_context(|| format!("Invalid MAILX_MESSAGES_LIMIT: {}", limit))?;
        }
        if let Ok(workers) = std::env::var("MAILX_FETCH_CONCURRENCY") {
            self.fetch_concurrency = workers
                .parse()
                .with_context(|| format!("Invalid MAILX_FETCH_CONCURRENCY: {}", workers))?;
        }
        Ok(self)
    }

    /// Database path, defaulting to ~/.config/mailx/mailx.db
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => config::config_path(DATABASE_FILE).context("Could not determine config directory"),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn hydrate_deadline(&self) -> Duration {
        Duration::from_secs(self.hydrate_deadline_secs)
    }
}
