//! API token generation and hashing.

use rand::Rng;
use rand::distr::Alphanumeric;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Prefix carried by every issued token.
pub const TOKEN_PREFIX: &str = "bk_";

/// Generates a fresh random API token.
pub fn generate_token() -> String {
    let raw: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();
    format!("{TOKEN_PREFIX}{raw}")
}

/// Hashes an API token using SHA-256.
pub fn hash_token(token: &str) -> String {
    let hash = Sha256::digest(token.as_bytes());
    hex::encode(hash)
}

/// Verifies a token against a stored hash using constant-time comparison.
pub fn verify_token(input: &str, stored_hash: &str) -> bool {
    let input_hash = hash_token(input);
    input_hash.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_hashing_is_stable() {
        let token = "bk_test_abc123";
        let hash = hash_token(token);

        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token(token));
    }

    #[test]
    fn test_token_verification() {
        let token = generate_token();
        let hash = hash_token(&token);

        assert!(verify_token(&token, &hash));
        assert!(!verify_token("bk_wrong", &hash));
    }

    #[test]
    fn test_generated_tokens_are_prefixed_and_unique() {
        let a = generate_token();
        let b = generate_token();

        assert!(a.starts_with(TOKEN_PREFIX));
        assert_eq!(a.len(), TOKEN_PREFIX.len() + 32);
        assert_ne!(a, b);
    }
}
