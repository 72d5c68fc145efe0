//! In-process session used by unit tests

use base64::prelude::*;
use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{
    BoxCall, Established, LabelCapability, MessageCapability, Session, SessionFactory,
    SessionResolver, ready,
};
use crate::error::ApiError;
use crate::gmail::api::{
    GmailLabel, GmailMessage, ListLabelsResponse, ListMessagesResponse, MessagePart,
    MessagePartBody, MessageRef,
};
use crate::models::{Credential, MessageId, UserId};
use crate::storage::{CredentialStore, InMemoryStore};

/// Mailbox served from memory with optional failures and latency
#[derive(Default)]
pub(crate) struct FakeSession {
    messages: Vec<GmailMessage>,
    labels: Vec<GmailLabel>,
    failing: HashSet<String>,
    list_error: Option<ApiError>,
    max_latency_ms: u64,
    pub gets: AtomicUsize,
    pub lists: AtomicUsize,
}

impl FakeSession {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_messages(messages: Vec<GmailMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_labels(mut self, labels: Vec<GmailLabel>) -> Self {
        self.labels = labels;
        self
    }

    pub fn failing(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn list_error(mut self, error: ApiError) -> Self {
        self.list_error = Some(error);
        self
    }

    pub fn jitter(mut self, max_latency_ms: u64) -> Self {
        self.max_latency_ms = max_latency_ms;
        self
    }

    fn fetch(&self, message_id: &str) -> Result<GmailMessage, ApiError> {
        if self.max_latency_ms > 0 {
            let delay = rand::thread_rng().gen_range(0..=self.max_latency_ms);
            std::thread::sleep(Duration::from_millis(delay));
        }
        if self.failing.contains(message_id) {
            return Err(ApiError::Status(500));
        }
        self.messages
            .iter()
            .find(|m| m.id == message_id)
            .cloned()
            .ok_or(ApiError::NotFound)
    }
}

impl MessageCapability for FakeSession {
    fn list(&self, _user_id: &UserId, max_results: usize) -> BoxCall<'_, ListMessagesResponse> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.list_error {
            return ready(Err(error.clone()));
        }
        let refs = self
            .messages
            .iter()
            .take(max_results)
            .map(|m| MessageRef {
                id: m.id.clone(),
                thread_id: m.thread_id.clone(),
            })
            .collect();
        ready(Ok(ListMessagesResponse {
            messages: Some(refs),
            next_page_token: None,
            result_size_estimate: Some(self.messages.len() as u32),
        }))
    }

    fn get(&self, _user_id: &UserId, message_id: &MessageId) -> BoxCall<'_, GmailMessage> {
        let id = message_id.as_str().to_string();
        Box::new(move || {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.fetch(&id)
        })
    }
}

impl LabelCapability for FakeSession {
    fn list(&self, _user_id: &UserId) -> BoxCall<'_, ListLabelsResponse> {
        if let Some(error) = &self.list_error {
            return ready(Err(error.clone()));
        }
        ready(Ok(ListLabelsResponse {
            labels: Some(self.labels.clone()),
        }))
    }

    fn get(&self, _user_id: &UserId, label_id: &str) -> BoxCall<'_, GmailLabel> {
        let found = self.labels.iter().find(|l| l.id == label_id).cloned();
        ready(found.ok_or(ApiError::NotFound))
    }
}

impl Session for FakeSession {
    fn messages(&self) -> &dyn MessageCapability {
        self
    }

    fn labels(&self) -> &dyn LabelCapability {
        self
    }
}

/// Provider message with an optional `text/html` alternative part
pub(crate) fn gmail_message(id: &str, internal_date: i64, html: Option<&str>) -> GmailMessage {
    let mut parts = vec![MessagePart {
        mime_type: Some("text/plain".to_string()),
        body: Some(MessagePartBody {
            data: Some(BASE64_URL_SAFE.encode(format!("plain {}", id))),
            ..Default::default()
        }),
        ..Default::default()
    }];
    if let Some(html) = html {
        parts.push(MessagePart {
            mime_type: Some("text/html".to_string()),
            body: Some(MessagePartBody {
                data: Some(BASE64_URL_SAFE.encode(html)),
                ..Default::default()
            }),
            ..Default::default()
        });
    }

    GmailMessage {
        id: id.to_string(),
        thread_id: format!("thread-{}", id),
        label_ids: Some(vec!["INBOX".to_string()]),
        snippet: format!("snippet {}", id),
        history_id: Some("100".to_string()),
        internal_date: Some(internal_date.to_string()),
        size_estimate: Some(512),
        payload: Some(MessagePart {
            mime_type: Some("multipart/alternative".to_string()),
            parts: Some(parts),
            ..Default::default()
        }),
    }
}

/// Factory handing out prepared sessions in order, repeating the last one
pub(crate) struct ScriptedFactory {
    sessions: Mutex<VecDeque<Arc<FakeSession>>>,
    pub builds: AtomicUsize,
}

impl ScriptedFactory {
    pub fn new(sessions: Vec<FakeSession>) -> Self {
        Self {
            sessions: Mutex::new(sessions.into_iter().map(Arc::new).collect()),
            builds: AtomicUsize::new(0),
        }
    }
}

impl SessionFactory for ScriptedFactory {
    fn new_session(&self, _credential: &Credential) -> anyhow::Result<Established> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        let mut sessions = self.sessions.lock().unwrap();
        let session = if sessions.len() > 1 {
            sessions.pop_front()
        } else {
            sessions.front().cloned()
        };
        let session = session.ok_or_else(|| anyhow::anyhow!("no scripted session left"))?;
        Ok(Established::new(session))
    }
}

/// Resolver over an in-memory store holding a valid credential for `user`
pub(crate) fn scripted_resolver(
    user: &str,
    sessions: Vec<FakeSession>,
) -> (Arc<SessionResolver>, Arc<ScriptedFactory>) {
    let store = Arc::new(InMemoryStore::new());
    store
        .save_credential(&Credential {
            user_id: UserId::new(user),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            token_type: "Bearer".to_string(),
            expiry: Utc::now() + ChronoDuration::hours(1),
        })
        .unwrap();
    let factory = Arc::new(ScriptedFactory::new(sessions));
    let resolver = Arc::new(SessionResolver::new(store, factory.clone()));
    (resolver, factory)
}
