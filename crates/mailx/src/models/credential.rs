//! Stored OAuth credential and the user identifier it belongs to

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque mailbox-provider account identifier
///
/// Primary key for every piece of per-user state (cache entries, stored
/// credentials, user profiles).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Long-lived credential used to (re)establish a mailbox session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub user_id: UserId,
    pub access_token: String,
    /// Empty when the provider did not grant offline access
    pub refresh_token: String,
    pub token_type: String,
    pub expiry: DateTime<Utc>,
}

impl Credential {
    /// Access tokens this close to expiry are refreshed before use
    pub const EXPIRY_BUFFER_SECS: i64 = 300;

    /// Whether the access token is expired or expires within the buffer
    pub fn needs_refresh(&self) -> bool {
        self.expiry <= Utc::now() + Duration::seconds(Self::EXPIRY_BUFFER_SECS)
    }

    pub fn can_refresh(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// Value for the HTTP Authorization header
    pub fn authorization(&self) -> String {
        let token_type = if self.token_type.is_empty() {
            "Bearer"
        } else {
            self.token_type.as_str()
        };
        format!("{} {}", token_type, self.access_token)
    }
}
