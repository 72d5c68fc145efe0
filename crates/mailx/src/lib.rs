//! Mailx crate - per-user mailbox sessions and message hydration
//!
//! This crate provides:
//! - Domain models (UserId, Credential, Message, UserProfile)
//! - A per-user session cache with lazy rebuild and retry-once on failure
//! - Gmail API session, OAuth client and HTML body decoding
//! - A concurrent message hydration pipeline on a bounded worker pool
//! - Credential and user storage (SQLite and in-memory)
//! - Sign-in, message and label services for a transport layer to call

pub mod auth;
pub mod config;
pub mod error;
pub mod gmail;
pub mod labels;
pub mod messages;
pub mod models;
pub mod session;
pub mod storage;

pub use auth::{AuthService, AuthorizationRequest};
pub use crate::config::{GoogleCredentials, ServiceConfig};
pub use error::{ApiError, MailxError, Result};
pub use gmail::{GmailSessionFactory, GoogleOAuth, OAuthClient, code_from_redirect};
pub use labels::LabelService;
pub use messages::{CancelToken, Hydrator, MessageService};
pub use models::{Credential, Message, MessageId, UserId, UserProfile};
pub use session::{Session, SessionCache, SessionFactory, SessionResolver};
pub use storage::{CredentialStore, InMemoryStore, SqliteStore, UserStore};
