//! Mailbox owner profile as reported by the provider's userinfo endpoint

use serde::{Deserialize, Serialize};

use super::UserId;

/// Profile of a signed-in mailbox owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UserProfile {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub picture: String,
    #[serde(default)]
    pub locale: String,
}

impl UserProfile {
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            given_name: String::new(),
            family_name: String::new(),
            picture: String::new(),
            locale: String::new(),
        }
    }
}
