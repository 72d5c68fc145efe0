//! Cache-or-rebuild policy for per-user sessions

use log::{debug, info, warn};
use std::sync::Arc;

use super::{Session, SessionCache};
use crate::error::{MailxError, Result};
use crate::models::{Credential, UserId};
use crate::storage::CredentialStore;

/// A session built from a credential
pub struct Established {
    pub session: Arc<dyn Session>,
    /// Set when the factory had to refresh the credential first
    pub refreshed: Option<Credential>,
}

impl Established {
    pub fn new(session: Arc<dyn Session>) -> Self {
        Self {
            session,
            refreshed: None,
        }
    }

    pub fn with_refreshed(session: Arc<dyn Session>, credential: Credential) -> Self {
        Self {
            session,
            refreshed: Some(credential),
        }
    }
}

/// Builds a live session from a stored credential
///
/// An error means the provider rejected the credential (expired, revoked,
/// no refresh token).
pub trait SessionFactory: Send + Sync {
    fn new_session(&self, credential: &Credential) -> anyhow::Result<Established>;
}

/// Returns a usable session for a user, building one on a cache miss
///
/// Policy is lazy and single-level: no TTL and no background refresh. A
/// stale session is discovered when a capability call fails, at which point
/// [`SessionResolver::with_session`] evicts it and retries exactly once.
pub struct SessionResolver {
    cache: SessionCache,
    store: Arc<dyn CredentialStore>,
    factory: Arc<dyn SessionFactory>,
}

impl SessionResolver {
    pub fn new(store: Arc<dyn CredentialStore>, factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            cache: SessionCache::new(),
            store,
            factory,
        }
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Get the cached session or rebuild it from the stored credential
    pub fn resolve(&self, user_id: &UserId) -> Result<Arc<dyn Session>> {
        if let Some(session) = self.cache.get(user_id) {
            debug!("Session cache hit for user {}", user_id);
            return Ok(session);
        }

        debug!("Session cache miss for user {}, rebuilding", user_id);
        let credential = self
            .store
            .get_credential_by_user(user_id)
            .map_err(MailxError::Store)?
            .ok_or_else(|| MailxError::CredentialNotFound {
                user_id: user_id.clone(),
            })?;

        self.establish(&credential)
    }

    /// Build a session from `credential` and cache it for its user
    ///
    /// A credential refreshed by the factory is written back to the store.
    pub fn establish(&self, credential: &Credential) -> Result<Arc<dyn Session>> {
        let user_id = &credential.user_id;
        let established = self.factory.new_session(credential).map_err(|source| {
            MailxError::SessionConstruction {
                user_id: user_id.clone(),
                source,
            }
        })?;

        if let Some(refreshed) = &established.refreshed {
            // The session is usable either way; a failed write-back only
            // means the next rebuild refreshes again.
            if let Err(e) = self.store.update_credential(refreshed) {
                warn!("Failed to store refreshed credential for user {}: {:#}", user_id, e);
            }
        }

        info!("Established session for user {}", user_id);
        Ok(self.cache.put(user_id.clone(), established.session))
    }

    /// Run `op` against the user's session, rebuilding it once on failure
    ///
    /// Only errors for which [`MailxError::should_rebuild_session`] holds
    /// trigger the retry. The second attempt's result is returned as is.
    pub fn with_session<T, F>(&self, user_id: &UserId, op: F) -> Result<T>
    where
        F: Fn(&dyn Session) -> Result<T>,
    {
        let session = self.resolve(user_id)?;
        match op(session.as_ref()) {
            Err(e) if e.should_rebuild_session() => {
                warn!("Rebuilding session for user {} after error: {}", user_id, e);
                self.cache.evict(user_id, &session);
                let session = self.resolve(user_id)?;
                op(session.as_ref())
            }
            result => result,
        }
    }
}
