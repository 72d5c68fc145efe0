//! Domain models shared by the session layer and the services

mod credential;
mod message;
mod user;

pub use credential::{Credential, UserId};
pub use message::{Message, MessageId};
pub use user::UserProfile;
