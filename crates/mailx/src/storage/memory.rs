//! In-memory storage implementation
//!
//! Used by tests and by callers that do not need credentials to survive a
//! restart.

use anyhow::{Result, bail};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::{CredentialStore, UserStore};
use crate::models::{Credential, UserId, UserProfile};

/// In-memory implementation of the user and credential stores
///
/// Uses HashMaps protected by RwLocks for thread-safe access.
#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<UserId, UserProfile>>,
    credentials: RwLock<HashMap<UserId, Credential>>,
}

impl InMemoryStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for InMemoryStore {
    fn get_credential_by_user(&self, user_id: &UserId) -> Result<Option<Credential>> {
        let credentials = self.credentials.read().unwrap_or_else(PoisonError::into_inner);
        Ok(credentials.get(user_id).cloned())
    }

    fn save_credential(&self, credential: &Credential) -> Result<()> {
        let mut credentials = self.credentials.write().unwrap_or_else(PoisonError::into_inner);
        if credentials.contains_key(&credential.user_id) {
            bail!("credential for user {} already exists", credential.user_id);
        }
        credentials.insert(credential.user_id.clone(), credential.clone());
        Ok(())
    }

    fn update_credential(&self, credential: &Credential) -> Result<()> {
        let mut credentials = self.credentials.write().unwrap_or_else(PoisonError::into_inner);
        match credentials.get_mut(&credential.user_id) {
            Some(existing) => {
                *existing = credential.clone();
                Ok(())
            }
            None => bail!("no credential stored for user {}", credential.user_id),
        }
    }
}

impl UserStore for InMemoryStore {
    fn get_user(&self, user_id: &UserId) -> Result<Option<UserProfile>> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        Ok(users.get(user_id).cloned())
    }

    fn create_user(&self, user: &UserProfile) -> Result<()> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        if users.contains_key(&user.id) {
            bail!("user {} already exists", user.id);
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }
}
