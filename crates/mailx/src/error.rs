//! Error types for the session layer and the services built on it

use thiserror::Error;

use crate::models::{MessageId, UserId};

/// Failure of a single provider capability call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// 401/403: the access token was rejected
    #[error("request was not authorized (HTTP {0})")]
    Unauthorized(u16),

    #[error("resource not found")]
    NotFound,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl From<ureq::Error> for ApiError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::StatusCode(code @ (401 | 403)) => ApiError::Unauthorized(code),
            ureq::Error::StatusCode(404) => ApiError::NotFound,
            ureq::Error::StatusCode(429) => ApiError::RateLimited,
            ureq::Error::StatusCode(code) => ApiError::Status(code),
            other => ApiError::Transport(other.to_string()),
        }
    }
}

/// Errors surfaced to callers of the resolver and the services
#[derive(Debug, Error)]
pub enum MailxError {
    /// No stored credential; the user must authenticate again
    #[error("no stored credential for user {user_id}")]
    CredentialNotFound { user_id: UserId },

    /// Persistence layer failure (retriable)
    #[error("credential store failure: {0}")]
    Store(#[source] anyhow::Error),

    /// The provider rejected the credential; the user must authenticate again
    #[error("could not establish a session for user {user_id}: {source}")]
    SessionConstruction {
        user_id: UserId,
        #[source]
        source: anyhow::Error,
    },

    #[error("listing messages for user {user_id} failed: {source}")]
    List {
        user_id: UserId,
        #[source]
        source: ApiError,
    },

    #[error("fetching message {message_id} failed: {source}")]
    Fetch {
        message_id: MessageId,
        #[source]
        source: ApiError,
    },

    #[error("decoding message {message_id} failed: {source}")]
    Decode {
        message_id: MessageId,
        #[source]
        source: base64::DecodeError,
    },

    #[error("listing labels for user {user_id} failed: {source}")]
    Labels {
        user_id: UserId,
        #[source]
        source: ApiError,
    },

    /// OAuth code exchange or profile lookup failed during sign-in
    #[error("authentication failed: {0}")]
    Auth(#[source] anyhow::Error),

    #[error("request was cancelled")]
    Cancelled,
}

impl MailxError {
    /// Whether evicting the cached session and retrying once may help
    pub fn should_rebuild_session(&self) -> bool {
        match self {
            MailxError::List { .. } => true,
            MailxError::Fetch { source, .. } | MailxError::Labels { source, .. } => {
                !matches!(source, ApiError::NotFound)
            }
            _ => false,
        }
    }

    /// Whether the caller should send the user back through sign-in
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            MailxError::CredentialNotFound { .. } | MailxError::SessionConstruction { .. }
        )
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, MailxError>;
