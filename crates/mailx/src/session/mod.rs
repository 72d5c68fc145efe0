//! Per-user provider sessions
//!
//! - `capability`: the session/capability traits services call through
//! - `cache`: in-process map from user to live session
//! - `resolver`: cache-or-rebuild policy with a single retry on stale sessions

mod cache;
mod capability;
mod resolver;

#[cfg(test)]
pub(crate) mod fake;

pub use cache::SessionCache;
pub use capability::{BoxCall, Call, LabelCapability, MessageCapability, Session, ready};
pub use resolver::{Established, SessionFactory, SessionResolver};
