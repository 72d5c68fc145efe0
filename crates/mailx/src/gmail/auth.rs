//! Google OAuth2 authentication
//!
//! Implements the authorization code flow against Google's OAuth2
//! endpoints. The user is sent to [`OAuthClient::authorization_url`]; the
//! code handed back on the redirect is exchanged for tokens, and the access
//! token identifies the account through the userinfo endpoint.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result, bail};
use chrono::{Duration, Utc};
use serde::Deserialize;
use url::Url;

use super::client::http_agent;
use crate::config::GoogleCredentials;
use crate::models::{Credential, UserId, UserProfile};

/// Google token lifetime when the token response omits `expires_in`
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// Upper bound on a provider-reported token lifetime (one day)
const MAX_EXPIRES_IN_SECS: u64 = 86_400;

/// Token response from Google
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: String,
}

impl TokenGrant {
    /// Turn the grant into a stored credential for `user_id`
    ///
    /// Refresh responses usually omit the refresh token; `previous` keeps
    /// the one already on file.
    pub fn into_credential(self, user_id: UserId, previous: Option<&str>) -> Credential {
        let expires_in = self
            .expires_in
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS)
            .min(MAX_EXPIRES_IN_SECS);
        let refresh_token = self
            .refresh_token
            .or_else(|| previous.map(str::to_string))
            .unwrap_or_default();

        Credential {
            user_id,
            access_token: self.access_token,
            refresh_token,
            token_type: self.token_type,
            expiry: Utc::now() + Duration::seconds(expires_in as i64),
        }
    }
}

/// OAuth2 operations against the identity provider
pub trait OAuthClient: Send + Sync {
    /// Consent page URL carrying the anti-forgery `state`
    fn authorization_url(&self, state: &str) -> String;

    /// Exchange an authorization code for tokens
    fn exchange_code(&self, code: &str) -> Result<TokenGrant>;

    /// Obtain a new access token from a refresh token
    fn refresh(&self, refresh_token: &str) -> Result<TokenGrant>;

    /// Look up the account that owns `access_token`
    fn user_info(&self, access_token: &str) -> Result<UserProfile>;
}

/// Google implementation of [`OAuthClient`]
pub struct GoogleOAuth {
    credentials: GoogleCredentials,
    agent: ureq::Agent,
}

impl GoogleOAuth {
    /// Google OAuth2 endpoints
    const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";
    const USERINFO_URL: &'static str = "https://www.googleapis.com/oauth2/v2/userinfo";

    /// Full mailbox access plus the profile needed to key stored state
    const SCOPES: [&'static str; 3] = [
        "https://mail.google.com/",
        "https://www.googleapis.com/auth/gmail.readonly",
        "https://www.googleapis.com/auth/userinfo.profile",
    ];

    pub fn new(credentials: GoogleCredentials, timeout: std::time::Duration) -> Self {
        Self {
            credentials,
            agent: http_agent(timeout),
        }
    }

    fn request_token(&self, form: &[(&str, &str)], what: &str) -> Result<TokenGrant> {
        let mut response = self
            .agent
            .post(Self::TOKEN_URL)
            .send_form(form.iter().copied())
            .with_context(|| format!("Failed to {}", what))?;

        response
            .body_mut()
            .read_json()
            .context("Failed to parse token response")
    }
}

impl OAuthClient for GoogleOAuth {
    fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&access_type=offline&prompt=consent",
            Self::AUTH_URL,
            urlencoding::encode(&self.credentials.client_id),
            urlencoding::encode(&self.credentials.redirect_url),
            urlencoding::encode(&Self::SCOPES.join(" ")),
            urlencoding::encode(state),
        )
    }

    fn exchange_code(&self, code: &str) -> Result<TokenGrant> {
        self.request_token(
            &[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.credentials.redirect_url.as_str()),
            ],
            "exchange authorization code",
        )
    }

    fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        self.request_token(
            &[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ],
            "refresh access token",
        )
    }

    fn user_info(&self, access_token: &str) -> Result<UserProfile> {
        let mut response = self
            .agent
            .get(Self::USERINFO_URL)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .context("Failed to fetch user info")?;

        response
            .body_mut()
            .read_json()
            .context("Failed to parse user info response")
    }
}

/// Pull the authorization code out of the URL the provider redirected to
///
/// Accepts the full callback URL as pasted from the browser. An `error`
/// parameter or a `state` that does not match `expected_state` is rejected.
pub fn code_from_redirect(redirect: &str, expected_state: Option<&str>) -> Result<String> {
    let url = Url::parse(redirect).context("Invalid redirect URL")?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" => bail!("OAuth error: {}", value),
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(expected) = expected_state
        && state.as_deref() != Some(expected)
    {
        bail!("OAuth state mismatch");
    }

    code.context("No authorization code received")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oauth() -> GoogleOAuth {
        GoogleOAuth::new(
            GoogleCredentials {
                client_id: "client-123".to_string(),
                client_secret: "secret".to_string(),
                redirect_url: "http://localhost:8080/callback".to_string(),
            },
            std::time::Duration::from_secs(5),
        )
    }

    #[test]
    fn test_authorization_url() {
        let url = oauth().authorization_url("xyz");
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fcallback"));
        assert!(url.contains("state=xyz"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("userinfo.profile"));
    }

    #[test]
    fn test_grant_keeps_previous_refresh_token() {
        let grant = TokenGrant {
            access_token: "new".to_string(),
            refresh_token: None,
            expires_in: Some(3599),
            token_type: "Bearer".to_string(),
        };

        let cred = grant.into_credential(UserId::new("u1"), Some("old-refresh"));
        assert_eq!(cred.access_token, "new");
        assert_eq!(cred.refresh_token, "old-refresh");
        assert!(!cred.needs_refresh());
    }

    #[test]
    fn test_grant_with_oversized_lifetime_is_capped() {
        let grant = TokenGrant {
            access_token: "new".to_string(),
            refresh_token: Some("r".to_string()),
            expires_in: Some(u64::MAX),
            token_type: "Bearer".to_string(),
        };

        let before = Utc::now();
        let cred = grant.into_credential(UserId::new("u1"), None);
        assert!(cred.expiry > before);
        assert!(cred.expiry <= Utc::now() + Duration::seconds(MAX_EXPIRES_IN_SECS as i64));
        assert!(!cred.needs_refresh());
    }

    #[test]
    fn test_grant_prefers_new_refresh_token() {
        let grant: TokenGrant = serde_json::from_str(
            r#"{"access_token": "a", "refresh_token": "r2", "expires_in": 3600, "token_type": "Bearer"}"#,
        )
        .unwrap();

        let cred = grant.into_credential(UserId::new("u1"), Some("r1"));
        assert_eq!(cred.refresh_token, "r2");
    }

    #[test]
    fn test_code_from_redirect() {
        let code =
            code_from_redirect("http://localhost:8080/callback?state=s1&code=4%2F0Abc", Some("s1"))
                .unwrap();
        assert_eq!(code, "4/0Abc");
    }

    #[test]
    fn test_code_from_redirect_errors() {
        assert!(code_from_redirect("http://localhost/callback?error=access_denied", None).is_err());
        assert!(code_from_redirect("http://localhost/callback?code=c&state=other", Some("s1")).is_err());
        assert!(code_from_redirect("http://localhost/callback", None).is_err());
        assert!(code_from_redirect("not a url", None).is_err());
    }
}
