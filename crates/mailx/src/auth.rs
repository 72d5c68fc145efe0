//! OAuth sign-in flow
//!
//! Sends the user to the provider's consent page, then turns the returned
//! authorization code into a stored user, a stored credential and a cached
//! session.

use base64::prelude::*;
use log::info;
use rand::Rng;
use std::sync::Arc;

use crate::error::{MailxError, Result};
use crate::gmail::OAuthClient;
use crate::models::UserProfile;
use crate::session::SessionResolver;
use crate::storage::{CredentialStore, UserStore};

/// Consent page URL and the state it was issued with
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    /// Must come back unchanged on the redirect
    pub state: String,
}

/// Signs users in and seeds their sessions
pub struct AuthService {
    oauth: Arc<dyn OAuthClient>,
    users: Arc<dyn UserStore>,
    credentials: Arc<dyn CredentialStore>,
    resolver: Arc<SessionResolver>,
}

impl AuthService {
    pub fn new(
        oauth: Arc<dyn OAuthClient>,
        users: Arc<dyn UserStore>,
        credentials: Arc<dyn CredentialStore>,
        resolver: Arc<SessionResolver>,
    ) -> Self {
        Self {
            oauth,
            users,
            credentials,
            resolver,
        }
    }

    /// Consent page URL carrying a fresh random state
    pub fn authorization_url(&self) -> AuthorizationRequest {
        let state = random_state();
        AuthorizationRequest {
            url: self.oauth.authorization_url(&state),
            state,
        }
    }

    /// Finish sign-in with the authorization code from the redirect
    ///
    /// Creates the user on first sign-in, stores or replaces the credential,
    /// and caches a session so the next request does not rebuild one.
    pub fn complete_sign_in(&self, code: &str) -> Result<UserProfile> {
        let grant = self.oauth.exchange_code(code).map_err(MailxError::Auth)?;
        let profile = self
            .oauth
            .user_info(&grant.access_token)
            .map_err(MailxError::Auth)?;
        let user_id = profile.id.clone();

        match self.users.get_user(&user_id).map_err(MailxError::Store)? {
            Some(_) => info!("User {} already exists, skipping creation", user_id),
            None => {
                info!("Creating user {}", user_id);
                self.users.create_user(&profile).map_err(MailxError::Store)?;
            }
        }

        let previous = self
            .credentials
            .get_credential_by_user(&user_id)
            .map_err(MailxError::Store)?;
        let previous_refresh = previous
            .as_ref()
            .map(|c| c.refresh_token.as_str())
            .filter(|token| !token.is_empty());
        let credential = grant.into_credential(user_id.clone(), previous_refresh);

        if previous.is_some() {
            info!("Updating credential for user {}", user_id);
            self.credentials
                .update_credential(&credential)
                .map_err(MailxError::Store)?;
        } else {
            info!("Saving credential for user {}", user_id);
            self.credentials
                .save_credential(&credential)
                .map_err(MailxError::Store)?;
        }

        self.resolver.establish(&credential)?;

        Ok(profile)
    }
}

/// 32 random bytes, base64url encoded
fn random_state() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    BASE64_URL_SAFE.encode(bytes)
}
