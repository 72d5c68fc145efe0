//! Storage trait definitions

use anyhow::Result;

use crate::models::{Credential, UserId, UserProfile};

/// Persistent credential storage keyed by user
///
/// `Ok(None)` means the user has no stored credential; `Err` is a backend
/// failure.
pub trait CredentialStore: Send + Sync {
    /// Get the stored credential for a user
    fn get_credential_by_user(&self, user_id: &UserId) -> Result<Option<Credential>>;

    /// Store the first credential for a user
    fn save_credential(&self, credential: &Credential) -> Result<()>;

    /// Replace the stored credential for a user
    fn update_credential(&self, credential: &Credential) -> Result<()>;
}

/// Persistent storage for signed-in users
pub trait UserStore: Send + Sync {
    fn get_user(&self, user_id: &UserId) -> Result<Option<UserProfile>>;

    fn create_user(&self, user: &UserProfile) -> Result<()>;
}
