//! In-process map from user to live session

use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::Session;
use crate::models::UserId;

/// Cache of live sessions, one entry per user
///
/// Entries are only ever inserted whole, so readers never observe a
/// half-built session. Nothing expires on its own; entries go away through
/// [`SessionCache::invalidate`] or [`SessionCache::evict`].
#[derive(Default)]
pub struct SessionCache {
    sessions: RwLock<HashMap<UserId, Arc<dyn Session>>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the session for a user without building one
    pub fn get(&self, user_id: &UserId) -> Option<Arc<dyn Session>> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.get(user_id).cloned()
    }

    /// Insert or replace the session for a user; last writer wins
    pub fn put(&self, user_id: UserId, session: Arc<dyn Session>) -> Arc<dyn Session> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if sessions.insert(user_id.clone(), Arc::clone(&session)).is_some() {
            debug!("Replaced cached session for user {}", user_id);
        }
        session
    }

    /// Drop the session for a user regardless of which one is cached
    pub fn invalidate(&self, user_id: &UserId) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(user_id).is_some()
    }

    /// Drop the cached session only if it is still `stale`
    ///
    /// A concurrent request may already have replaced the entry with a fresh
    /// session; that one is left alone.
    pub fn evict(&self, user_id: &UserId, stale: &Arc<dyn Session>) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        match sessions.get(user_id) {
            Some(current) if Arc::ptr_eq(current, stale) => {
                sessions.remove(user_id);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
