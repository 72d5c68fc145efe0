//! Gmail message decoding
//!
//! Converts a Gmail API message into a hydrated [`Message`], pulling the
//! HTML body out of the MIME part tree.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use super::api::{GmailMessage, MessagePart};
use crate::error::MailxError;
use crate::models::{Message, MessageId};

const HTML_MIME_TYPE: &str = "text/html";

/// Gmail bodies are base64url; padding varies between messages
const BODY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Build a [`Message`] from a full Gmail message, decoding its HTML body
pub fn hydrate_message(gmail_msg: GmailMessage) -> Result<Message, MailxError> {
    let id = MessageId::new(gmail_msg.id);

    let html = match &gmail_msg.payload {
        Some(payload) => extract_html(payload).map_err(|source| MailxError::Decode {
            message_id: id.clone(),
            source,
        })?,
        None => String::new(),
    };

    Ok(Message {
        id,
        history_id: parse_number(gmail_msg.history_id.as_deref()),
        internal_date: parse_number(gmail_msg.internal_date.as_deref()),
        label_ids: gmail_msg.label_ids.unwrap_or_default(),
        payload: gmail_msg.payload,
        size_estimate: gmail_msg.size_estimate.unwrap_or(0),
        snippet: gmail_msg.snippet,
        thread_id: gmail_msg.thread_id,
        html,
    })
}

/// Decode the first `text/html` body found in the part tree
///
/// Nested parts are searched before a part's own MIME type, so the payload
/// root is only considered after all of its descendants. The search stops at
/// the first match. Returns an empty string when the tree has no HTML part.
pub fn extract_html(payload: &MessagePart) -> Result<String, base64::DecodeError> {
    match find_html_data(payload) {
        Some(data) => {
            let bytes = BODY_ENGINE.decode(data)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        None => Ok(String::new()),
    }
}

fn find_html_data(part: &MessagePart) -> Option<&str> {
    if let Some(parts) = &part.parts {
        for nested in parts {
            if let Some(data) = find_html_data(nested) {
                return Some(data);
            }
        }
    }

    if part
        .mime_type
        .as_deref()
        .is_some_and(|m| m.eq_ignore_ascii_case(HTML_MIME_TYPE))
    {
        // A declared HTML part without data does not end the search
        return part
            .body
            .as_ref()
            .and_then(|b| b.data.as_deref())
            .filter(|data| !data.is_empty());
    }

    None
}

/// Parse Gmail's decimal-string numbers; missing or malformed values are 0
fn parse_number<T: std::str::FromStr + Default>(value: Option<&str>) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or_default()
}
