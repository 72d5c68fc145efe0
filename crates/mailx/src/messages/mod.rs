//! Message retrieval
//!
//! - [`Hydrator`]: lists a page of messages and fetches their bodies on a
//!   bounded worker pool
//! - [`MessageService`]: the operations exposed to the transport layer,
//!   run under the session resolver's retry-once policy

mod pipeline;
mod service;

pub use pipeline::{CancelToken, Hydrator, fetch_message};
pub use service::MessageService;
