//! Session and capability abstraction
//!
//! A [`Session`] is a live handle to the mailbox provider bound to one
//! credential. It hands out typed capability groups (messages, labels); each
//! operation returns a deferred [`Call`] that performs the network round trip
//! only when executed. Services depend on these traits rather than on the
//! Gmail HTTP types, so tests can substitute in-process fakes.

use crate::error::ApiError;
use crate::gmail::api::{GmailLabel, GmailMessage, ListLabelsResponse, ListMessagesResponse};
use crate::models::{MessageId, UserId};

/// A prepared provider request whose only operation is to run it
pub trait Call<T>: Send {
    fn execute(self: Box<Self>) -> Result<T, ApiError>;
}

/// Boxed call returned by capability operations
pub type BoxCall<'a, T> = Box<dyn Call<T> + 'a>;

impl<T, F> Call<T> for F
where
    F: FnOnce() -> Result<T, ApiError> + Send,
{
    fn execute(self: Box<Self>) -> Result<T, ApiError> {
        (*self)()
    }
}

/// Wrap an already known result as a call
///
/// Used by substitute sessions that answer from memory.
pub fn ready<'a, T: Send + 'a>(result: Result<T, ApiError>) -> BoxCall<'a, T> {
    Box::new(move || result)
}

/// Read operations on a user's messages
pub trait MessageCapability: Send + Sync {
    /// List message references, newest first, at most `max_results`
    fn list(&self, user_id: &UserId, max_results: usize) -> BoxCall<'_, ListMessagesResponse>;

    /// Fetch one message with its full payload tree
    fn get(&self, user_id: &UserId, message_id: &MessageId) -> BoxCall<'_, GmailMessage>;
}

/// Read operations on a user's labels
pub trait LabelCapability: Send + Sync {
    fn list(&self, user_id: &UserId) -> BoxCall<'_, ListLabelsResponse>;

    fn get(&self, user_id: &UserId, label_id: &str) -> BoxCall<'_, GmailLabel>;
}

/// Live provider session
///
/// Safe to share between in-flight requests for the same user; capability
/// calls do not mutate the session.
pub trait Session: Send + Sync {
    fn messages(&self) -> &dyn MessageCapability;

    fn labels(&self) -> &dyn LabelCapability;
}
