//! Message operations exposed to the transport layer

use std::sync::Arc;
use std::time::Duration;

use super::{CancelToken, Hydrator, fetch_message};
use crate::config::ServiceConfig;
use crate::error::Result;
use crate::models::{Message, MessageId, UserId};
use crate::session::SessionResolver;

/// Lists and fetches messages for signed-in users
pub struct MessageService {
    resolver: Arc<SessionResolver>,
    hydrator: Hydrator,
    messages_limit: usize,
    deadline: Duration,
}

impl MessageService {
    pub fn new(resolver: Arc<SessionResolver>, config: &ServiceConfig) -> anyhow::Result<Self> {
        Ok(Self {
            resolver,
            hydrator: Hydrator::new(config.fetch_concurrency)?,
            messages_limit: config.messages_limit,
            deadline: config.hydrate_deadline(),
        })
    }

    /// Most recent messages for a user, newest first
    pub fn get_messages(&self, user_id: &UserId) -> Result<Vec<Message>> {
        let cancel = CancelToken::with_deadline(self.deadline);
        self.get_messages_with(user_id, self.messages_limit, &cancel)
    }

    /// Like [`MessageService::get_messages`] with an explicit page size and
    /// caller-owned cancellation
    pub fn get_messages_with(
        &self,
        user_id: &UserId,
        limit: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<Message>> {
        self.resolver.with_session(user_id, |session| {
            self.hydrator.hydrate_messages(session, user_id, limit, cancel)
        })
    }

    /// One message with its decoded HTML body
    pub fn get_message_by_id(&self, user_id: &UserId, message_id: &MessageId) -> Result<Message> {
        self.resolver
            .with_session(user_id, |session| fetch_message(session, user_id, message_id))
    }
}
