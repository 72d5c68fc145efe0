//! The mailx config directory
//!
//! Everything mailx keeps on disk lives in one directory:
//!
//! - [`SETTINGS_FILE`] holds service tuning (limits, worker count, timeouts)
//! - [`CREDENTIALS_FILE`] is the OAuth client downloaded from Google Cloud Console
//! - [`DATABASE_FILE`] is the SQLite store of users and their tokens
//!
//! The directory is `~/.config/mailx/` unless `MAILX_CONFIG_DIR` names
//! another one. Call [`init`] at startup so the database can be created.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Service tuning read at startup
pub const SETTINGS_FILE: &str = "mailx.json";

/// Google OAuth client registration
pub const CREDENTIALS_FILE: &str = "google-credentials.json";

/// Users and their OAuth credentials
pub const DATABASE_FILE: &str = "mailx.db";

/// Overrides the config directory location
pub const CONFIG_DIR_ENV: &str = "MAILX_CONFIG_DIR";

const APP_DIR: &str = "mailx";

/// Create the config directory if needed and return it
pub fn init() -> Result<PathBuf> {
    let dir = config_dir().context("Could not determine the mailx config directory")?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    Ok(dir)
}

/// The mailx config directory; `None` when the platform has no config dir
pub fn config_dir() -> Option<PathBuf> {
    resolve_dir(std::env::var_os(CONFIG_DIR_ENV), dirs::config_dir())
}

fn resolve_dir(overridden: Option<OsString>, platform: Option<PathBuf>) -> Option<PathBuf> {
    match overridden.filter(|dir| !dir.is_empty()) {
        Some(dir) => Some(PathBuf::from(dir)),
        None => platform.map(|p| p.join(APP_DIR)),
    }
}

/// Path of `filename` inside the config directory
pub fn config_path(filename: &str) -> Option<PathBuf> {
    config_dir().map(|p| p.join(filename))
}

/// Read `filename` from the config directory if it is there
///
/// A missing file is `Ok(None)`. A file that exists but cannot be read or
/// parsed is an error, so a typo in `mailx.json` is never silently ignored.
pub fn load_json<T: DeserializeOwned>(filename: &str) -> Result<Option<T>> {
    match config_path(filename) {
        Some(path) => load_json_if_exists(&path),
        None => Ok(None),
    }
}

fn load_json_if_exists<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    load_json_file(path).map(Some)
}

/// Read and parse a JSON file at any path
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}
