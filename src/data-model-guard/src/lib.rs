pub mod db;
pub mod errors;
pub mod models;
pub mod schema;
pub mod sessions;
pub mod users;

#[cfg(test)]
pub mod test_helpers;

pub use errors::StoreError;
pub use models::{Credential, NewCredential, Session, SessionId};
pub use sessions::{MemorySessionStore, SessionStore};
pub use users::{MemoryUserStore, PgUserStore, UserStore};
