//! Gmail API integration
//!
//! This module provides:
//! - Gmail API wire types
//! - HTTP-backed session and the factory that builds it from a credential
//! - OAuth2 client for code exchange, refresh and profile lookup
//! - HTML body extraction from the MIME part tree

mod auth;
mod client;
mod decode;

pub use auth::{GoogleOAuth, OAuthClient, TokenGrant, code_from_redirect};
pub use client::{ApiCall, GmailSession, GmailSessionFactory};
pub use decode::{extract_html, hydrate_message};

/// Gmail API response types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// Response from listing messages
    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListMessagesResponse {
        pub messages: Option<Vec<MessageRef>>,
        pub next_page_token: Option<String>,
        pub result_size_estimate: Option<u32>,
    }

    /// Reference to a message (just ID and thread ID)
    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageRef {
        pub id: String,
        #[serde(default)]
        pub thread_id: String,
    }

    /// Full message from Gmail API
    ///
    /// Gmail encodes `historyId` and `internalDate` as decimal strings.
    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailMessage {
        pub id: String,
        #[serde(default)]
        pub thread_id: String,
        pub label_ids: Option<Vec<String>>,
        #[serde(default)]
        pub snippet: String,
        pub history_id: Option<String>,
        pub internal_date: Option<String>,
        pub size_estimate: Option<i64>,
        pub payload: Option<MessagePart>,
    }

    /// Node of the MIME part tree; the message payload is the root node
    #[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePart {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub part_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub mime_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub filename: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub headers: Option<Vec<Header>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub body: Option<MessagePartBody>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub parts: Option<Vec<MessagePart>>,
    }

    /// Email header (name-value pair)
    #[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }

    /// Part body (base64url encoded)
    #[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePartBody {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub attachment_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub size: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub data: Option<String>,
    }

    /// Response from listing labels
    #[derive(Debug, Clone, Default, Deserialize)]
    pub struct ListLabelsResponse {
        pub labels: Option<Vec<GmailLabel>>,
    }

    /// Label from Gmail API
    #[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailLabel {
        pub id: String,
        pub name: String,
        #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
        pub label_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub messages_total: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub messages_unread: Option<u32>,
    }

}
