//! Ownership token generation and hashing.
//!
//! The token secret is handed to the creator exactly once, at project
//! creation. Only its SHA-256 hex digest is persisted, so a leaked database
//! does not leak usable tokens.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// A freshly generated ownership token secret.
pub struct OwnershipToken(String);

impl OwnershipToken {
    /// Generate a token from 32 random bytes, base64url encoded.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// The secret string to return to the caller.
    pub fn secret(&self) -> &str {
        &self.0
    }

    /// Consume the token, yielding the secret.
    pub fn into_secret(self) -> String {
        self.0
    }

    /// The digest to persist in place of the secret.
    pub fn hash(&self) -> String {
        hash_token(&self.0)
    }
}

/// Hash a presented token secret for storage or lookup.
pub fn hash_token(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique() {
        let a = OwnershipToken::generate();
        let b = OwnershipToken::generate();
        assert_ne!(a.secret(), b.secret());
    }

    #[test]
    fn test_secret_is_url_safe() {
        let token = OwnershipToken::generate();
        assert!(!token.secret().is_empty());
        assert!(
            token
                .secret()
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        );
    }

    #[test]
    fn test_hash_matches_free_function() {
        let token = OwnershipToken::generate();
        assert_eq!(token.hash(), hash_token(token.secret()));
        assert_eq!(token.hash().len(), 64);
    }
}
