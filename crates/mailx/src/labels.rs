//! Read-only label listing

use log::{error, info};
use std::sync::Arc;

use crate::error::{MailxError, Result};
use crate::gmail::api::GmailLabel;
use crate::models::UserId;
use crate::session::SessionResolver;

/// Label queries for signed-in users
pub struct LabelService {
    resolver: Arc<SessionResolver>,
}

impl LabelService {
    pub fn new(resolver: Arc<SessionResolver>) -> Self {
        Self { resolver }
    }

    /// All labels in the user's mailbox, in provider order
    pub fn get_labels(&self, user_id: &UserId) -> Result<Vec<GmailLabel>> {
        let labels = self.resolver.with_session(user_id, |session| {
            session
                .labels()
                .list(user_id)
                .execute()
                .map_err(|source| {
                    error!("Failed to list labels for user {}: {}", user_id, source);
                    MailxError::Labels {
                        user_id: user_id.clone(),
                        source,
                    }
                })
        })?;

        let labels = labels.labels.unwrap_or_default();
        info!("Listed {} labels for user {}", labels.len(), user_id);
        Ok(labels)
    }

    /// One label with its message counts
    pub fn get_label(&self, user_id: &UserId, label_id: &str) -> Result<GmailLabel> {
        self.resolver.with_session(user_id, |session| {
            session
                .labels()
                .get(user_id, label_id)
                .execute()
                .map_err(|source| MailxError::Labels {
                    user_id: user_id.clone(),
                    source,
                })
        })
    }
}
