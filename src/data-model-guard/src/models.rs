use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::users;

/// Number of random bytes behind every session identifier.
pub const SESSION_ID_BYTES: usize = 32;

//
// Credentials
//

/// A stored login. `password_hash` is a one-way bcrypt hash; plaintext never reaches this type.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Credential {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A credential that has not been persisted yet (signup).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCredential {
    pub username: String,
    pub password_hash: String,
}

impl Credential {
    /// Assigns an id and creation time to a new credential.
    pub fn from_new(new: NewCredential) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: new.username,
            password_hash: new.password_hash,
            created_at: Utc::now(),
        }
    }
}

//
// Sessions
//

/// Opaque, unguessable session identifier (URL-safe base64 of 32 random bytes).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        let bytes: [u8; SESSION_ID_BYTES] = rand::random();
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Accepts only values shaped like ones produced by [`SessionId::generate`].
    pub fn parse(raw: &str) -> Option<Self> {
        let decoded = URL_SAFE_NO_PAD.decode(raw).ok()?;
        (decoded.len() == SESSION_ID_BYTES).then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Session ids are bearer secrets: keep them out of logs.
impl std::fmt::Debug for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionId(..)")
    }
}

/// Server-side record of "this caller is authenticated as `username`".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Starts a fresh session with a newly generated id.
    pub fn new(username: impl Into<String>, ttl: Duration) -> Self {
        let created_at = Utc::now();
        Self {
            id: SessionId::generate(),
            username: username.into(),
            created_at,
            expires_at: created_at + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
