//! Persistence for users and their OAuth credentials
//!
//! The traits keep the session layer independent of the backend. SQLite is
//! used by the service; the in-memory store backs tests.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{CredentialStore, UserStore};
