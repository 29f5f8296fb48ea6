//! Signed double-submit CSRF tokens.
//!
//! The server hands out `<nonce>.<signature>` in a cookie; state-changing requests must echo
//! the same value in a header or form field. A cross-site page can make the browser send the
//! cookie but cannot read it, so it cannot produce the matching field.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

use super::signing::Signer;

pub const CSRF_FORM_FIELD: &str = "_csrf";
pub const CSRF_HEADER: &str = "x-csrf-token";

const NONCE_BYTES: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CsrfError {
    #[error("Missing CSRF token")]
    MissingToken,

    #[error("Invalid CSRF token")]
    InvalidToken,

    #[error("CSRF token does not match")]
    Mismatch,
}

#[derive(Debug, Clone)]
pub struct CsrfTokens {
    signer: Signer,
}

impl CsrfTokens {
    pub fn new(signer: Signer) -> Self {
        Self { signer }
    }

    pub fn issue(&self) -> String {
        let nonce: [u8; NONCE_BYTES] = rand::random();
        self.signer.sign(&URL_SAFE_NO_PAD.encode(nonce))
    }

    pub fn is_valid(&self, token: &str) -> bool {
        self.signer.verify(token).is_some()
    }

    /// Checks the cookie copy against the submitted copy.
    pub fn verify(&self, cookie_token: Option<&str>, submitted: Option<&str>) -> Result<(), CsrfError> {
        let (cookie_token, submitted) = match (cookie_token, submitted) {
            (Some(c), Some(s)) if !c.is_empty() && !s.is_empty() => (c, s),
            _ => return Err(CsrfError::MissingToken),
        };
        if !self.is_valid(cookie_token) || !self.is_valid(submitted) {
            return Err(CsrfError::InvalidToken);
        }
        if cookie_token != submitted {
            return Err(CsrfError::Mismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> CsrfTokens {
        CsrfTokens::new(Signer::new("test_secret_key_for_hmac_signing").unwrap())
    }

    #[test]
    fn test_issued_tokens_verify() {
        let tokens = tokens();
        let token = tokens.issue();
        assert!(tokens.is_valid(&token));
        assert_eq!(tokens.verify(Some(&token), Some(&token)), Ok(()));
    }

    #[test]
    fn test_tokens_are_unique() {
        let tokens = tokens();
        assert_ne!(tokens.issue(), tokens.issue());
    }

    #[test]
    fn test_missing_tokens() {
        let tokens = tokens();
        let token = tokens.issue();
        assert_eq!(tokens.verify(None, Some(&token)), Err(CsrfError::MissingToken));
        assert_eq!(tokens.verify(Some(&token), None), Err(CsrfError::MissingToken));
        assert_eq!(tokens.verify(Some(&token), Some("")), Err(CsrfError::MissingToken));
    }

    #[test]
    fn test_forged_token_rejected() {
        let tokens = tokens();
        let forged = "bm9uY2U.c2lnbmF0dXJl";
        assert_eq!(tokens.verify(Some(forged), Some(forged)), Err(CsrfError::InvalidToken));

        let other_server = CsrfTokens::new(Signer::new("another_secret_key_for_hmac_signing").unwrap()).issue();
        assert_eq!(tokens.verify(Some(&other_server), Some(&other_server)), Err(CsrfError::InvalidToken));
    }

    #[test]
    fn test_mismatched_tokens_rejected() {
        let tokens = tokens();
        let a = tokens.issue();
        let b = tokens.issue();
        assert_eq!(tokens.verify(Some(&a), Some(&b)), Err(CsrfError::Mismatch));
    }
}
