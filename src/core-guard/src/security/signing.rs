use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SEPARATOR: char = '.';

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("HMAC error: {0}")]
    HmacError(String),
}

/// Signs cookie payloads with HMAC-SHA256 so the server can tell its own values from forged ones.
/// Signed form: `<payload>.<base64url signature>`. Payloads must not contain '.'.
#[derive(Clone)]
pub struct Signer {
    mac: HmacSha256,
}

impl Signer {
    pub fn new(secret: &str) -> Result<Self, SigningError> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| SigningError::HmacError(e.to_string()))?;
        Ok(Self { mac })
    }

    pub fn sign(&self, payload: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{}{}{}", payload, SEPARATOR, signature)
    }

    /// Returns the payload if the signature checks out (constant-time comparison).
    pub fn verify<'a>(&self, signed: &'a str) -> Option<&'a str> {
        let (payload, signature) = signed.rsplit_once(SEPARATOR)?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).ok()?;

        Some(payload)
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signer(..)")
    }
}
