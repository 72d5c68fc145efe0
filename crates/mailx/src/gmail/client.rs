//! Gmail API HTTP session
//!
//! Provides the message and label capabilities over the Gmail REST API.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Result, bail};
use log::{debug, info};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use super::api::{GmailLabel, GmailMessage, ListLabelsResponse, ListMessagesResponse};
use super::auth::OAuthClient;
use crate::error::ApiError;
use crate::models::{Credential, MessageId, UserId};
use crate::session::{
    BoxCall, Call, Established, LabelCapability, MessageCapability, Session, SessionFactory,
};

/// Gmail API base URL
const BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

/// Largest page the list endpoint accepts
const MAX_PAGE_SIZE: usize = 500;

/// Build an HTTP agent whose requests give up after `timeout`
pub(crate) fn http_agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    ureq::Agent::new_with_config(config)
}

/// Authorized GET against the Gmail API, decoded as `T` when executed
pub struct ApiCall<T> {
    agent: ureq::Agent,
    url: String,
    authorization: String,
    _response: PhantomData<fn() -> T>,
}

impl<T> ApiCall<T> {
    fn new(agent: &ureq::Agent, url: String, authorization: &str) -> Self {
        Self {
            agent: agent.clone(),
            url,
            authorization: authorization.to_string(),
            _response: PhantomData,
        }
    }
}

impl<T: DeserializeOwned + Send> Call<T> for ApiCall<T> {
    fn execute(self: Box<Self>) -> Result<T, ApiError> {
        debug!("GET {}", self.url);
        let mut response = self
            .agent
            .get(&self.url)
            .header("Authorization", &self.authorization)
            .call()?;

        response
            .body_mut()
            .read_json::<T>()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn messages_url(user_id: &UserId, max_results: usize) -> String {
    format!(
        "{}/users/{}/messages?maxResults={}",
        BASE_URL,
        urlencoding::encode(user_id.as_str()),
        max_results.min(MAX_PAGE_SIZE)
    )
}

fn message_url(user_id: &UserId, message_id: &MessageId) -> String {
    format!(
        "{}/users/{}/messages/{}?format=full",
        BASE_URL,
        urlencoding::encode(user_id.as_str()),
        urlencoding::encode(message_id.as_str())
    )
}

fn labels_url(user_id: &UserId) -> String {
    format!("{}/users/{}/labels", BASE_URL, urlencoding::encode(user_id.as_str()))
}

fn label_url(user_id: &UserId, label_id: &str) -> String {
    format!(
        "{}/users/{}/labels/{}",
        BASE_URL,
        urlencoding::encode(user_id.as_str()),
        urlencoding::encode(label_id)
    )
}

/// Session bound to one access token
pub struct GmailSession {
    agent: ureq::Agent,
    authorization: String,
}

impl GmailSession {
    pub fn new(agent: ureq::Agent, credential: &Credential) -> Self {
        Self {
            agent,
            authorization: credential.authorization(),
        }
    }

    fn call<'a, T: DeserializeOwned + Send + 'a>(&self, url: String) -> BoxCall<'a, T> {
        Box::new(ApiCall::<T>::new(&self.agent, url, &self.authorization))
    }
}

impl MessageCapability for GmailSession {
    fn list(&self, user_id: &UserId, max_results: usize) -> BoxCall<'_, ListMessagesResponse> {
        self.call(messages_url(user_id, max_results))
    }

    fn get(&self, user_id: &UserId, message_id: &MessageId) -> BoxCall<'_, GmailMessage> {
        self.call(message_url(user_id, message_id))
    }
}

impl LabelCapability for GmailSession {
    fn list(&self, user_id: &UserId) -> BoxCall<'_, ListLabelsResponse> {
        self.call(labels_url(user_id))
    }

    fn get(&self, user_id: &UserId, label_id: &str) -> BoxCall<'_, GmailLabel> {
        self.call(label_url(user_id, label_id))
    }
}

impl Session for GmailSession {
    fn messages(&self) -> &dyn MessageCapability {
        self
    }

    fn labels(&self) -> &dyn LabelCapability {
        self
    }
}

/// Builds [`GmailSession`]s, refreshing near-expiry access tokens first
pub struct GmailSessionFactory {
    oauth: Arc<dyn OAuthClient>,
    agent: ureq::Agent,
}

impl GmailSessionFactory {
    pub fn new(oauth: Arc<dyn OAuthClient>, timeout: Duration) -> Self {
        Self {
            oauth,
            agent: http_agent(timeout),
        }
    }
}

impl SessionFactory for GmailSessionFactory {
    fn new_session(&self, credential: &Credential) -> Result<Established> {
        if !credential.needs_refresh() {
            let session = GmailSession::new(self.agent.clone(), credential);
            return Ok(Established::new(Arc::new(session)));
        }

        if !credential.can_refresh() {
            bail!(
                "access token for user {} expired and no refresh token is stored",
                credential.user_id
            );
        }

        info!("Refreshing access token for user {}", credential.user_id);
        let refreshed = self
            .oauth
            .refresh(&credential.refresh_token)?
            .into_credential(credential.user_id.clone(), Some(&credential.refresh_token));

        let session = GmailSession::new(self.agent.clone(), &refreshed);
        Ok(Established::with_refreshed(Arc::new(session), refreshed))
    }
}
