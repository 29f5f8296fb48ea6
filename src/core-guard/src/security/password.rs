//! One-way password hashing.

/// Smallest cost bcrypt accepts.
pub const MIN_COST: u32 = 4;
/// Largest cost bcrypt accepts.
pub const MAX_COST: u32 = 31;
/// bcrypt only reads this many bytes of input. Longer passwords are rejected instead of truncated.
pub const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Bcrypt failure: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Password must not be longer than 72 bytes")]
    TooLong,

    #[error("Cost must be between 4 and 31, got {0}")]
    InvalidCost(u32),
}

/// Hashes and checks passwords. Implementations must be slow, salted and one-way.
pub trait PasswordEncoder: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError>;

    /// Compares `plaintext` against a stored hash, using the parameters embedded in the hash.
    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, PasswordError>;

    /// True when `hash` was produced with different parameters than new hashes would use.
    fn needs_rehash(&self, _hash: &str) -> bool {
        false
    }
}

/// bcrypt with a configurable work factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BcryptPasswordEncoder {
    cost: u32,
}

impl BcryptPasswordEncoder {
    pub fn new(cost: u32) -> Result<Self, PasswordError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(PasswordError::InvalidCost(cost));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptPasswordEncoder {
    fn default() -> Self {
        Self { cost: 10 }
    }
}

impl PasswordEncoder for BcryptPasswordEncoder {
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Err(PasswordError::TooLong);
        }
        Ok(bcrypt::hash(plaintext, self.cost)?)
    }

    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, PasswordError> {
        // Nothing longer than the limit was ever hashed here; bcrypt would compare only a prefix.
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Ok(false);
        }
        Ok(bcrypt::verify(plaintext, hash)?)
    }

    fn needs_rehash(&self, hash: &str) -> bool {
        embedded_cost(hash).is_some_and(|cost| cost != self.cost)
    }
}

/// Reads the cost out of a modular-crypt bcrypt hash (`$2b$10$...`).
pub fn embedded_cost(hash: &str) -> Option<u32> {
    let mut parts = hash.split('$');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(""), Some(version), Some(cost)) if version.starts_with('2') => cost.parse().ok(),
        _ => None,
    }
}
