//! Capability token derivation.
//!
//! A token is a 64-character lowercase hex string (a SHA-256 sized digest)
//! that identifies one stored link. Tokens never contain the path they
//! grant access to and cannot be reversed into it.
//!
//! ## Strategies
//!
//! | Strategy | Digest | Same path, same second |
//! |----------|--------|------------------------|
//! | `randomized` (default) | HMAC-SHA256(path) keyed by a fresh 16-byte salt | different token |
//! | `deterministic` | SHA-256(path ‖ created_at ‖ secret) | same token |
//!
//! Randomized tokens cannot be recomputed offline even if every input
//! leaks, but re-issuing a path creates a second live link. Deterministic
//! tokens make re-issuance an idempotent overwrite of the existing link,
//! at the cost of depending on the secret staying private.
//!
//! ## Example
//!
//! ```rust,ignore
//! use keylink_core::token::{TokenCodec, TokenStrategy};
//!
//! let codec = TokenCodec::new(TokenStrategy::Randomized, None);
//! let token = codec.derive(Path::new("/srv/report.pdf"), unix_now())?;
//! assert_eq!(token.as_str().len(), 64);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto;
use crate::error::{Error, Result};

/// Length of a token in hex characters
pub const TOKEN_LENGTH: usize = 64;

/// Length of the random salt used by the randomized strategy, in bytes
pub const SALT_LENGTH: usize = 16;

/// How tokens are derived from paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStrategy {
    /// Keyed hash over the path with a fresh random salt per call
    #[default]
    Randomized,
    /// Plain digest over path, creation time, and the shared secret
    Deterministic,
}

impl std::fmt::Display for TokenStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Randomized => write!(f, "randomized"),
            Self::Deterministic => write!(f, "deterministic"),
        }
    }
}

/// A validated capability token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Parse and validate a token from a string.
    ///
    /// Surrounding whitespace is ignored and upper-case hex is normalized.
    pub fn parse(input: &str) -> Result<Self> {
        let normalized = input.trim().to_ascii_lowercase();

        if normalized.len() != TOKEN_LENGTH {
            return Err(Error::LinkNotFound);
        }
        if !normalized.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::LinkNotFound);
        }

        Ok(Self(normalized))
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derives tokens for paths using the configured strategy.
#[derive(Clone)]
pub struct TokenCodec {
    strategy: TokenStrategy,
    secret: String,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("strategy", &self.strategy)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl TokenCodec {
    /// Create a codec. The secret is only consulted by the deterministic strategy.
    #[must_use]
    pub fn new(strategy: TokenStrategy, secret: Option<&str>) -> Self {
        Self {
            strategy,
            secret: secret.unwrap_or_default().to_string(),
        }
    }

    /// The strategy this codec uses.
    #[must_use]
    pub fn strategy(&self) -> TokenStrategy {
        self.strategy
    }

    /// Derive a token for `path` created at `created_at` (Unix seconds).
    ///
    /// # Errors
    ///
    /// The randomized strategy returns [`Error::Entropy`] if the OS entropy
    /// source fails; no token is produced in that case.
    pub fn derive(&self, path: &Path, created_at: i64) -> Result<Token> {
        let path = path.to_string_lossy();
        let digest = match self.strategy {
            TokenStrategy::Deterministic => {
                let input = format!("{path}{created_at}{}", self.secret);
                crypto::sha256(input.as_bytes())
            }
            TokenStrategy::Randomized => {
                let salt = crypto::try_random_bytes::<SALT_LENGTH>()?;
                let key = crypto::to_hex(&salt);
                crypto::hmac_sha256(key.as_bytes(), path.as_bytes())
            }
        };
        Ok(Token(crypto::to_hex(&digest)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn is_token_shaped(token: &Token) -> bool {
        token.as_str().len() == TOKEN_LENGTH
            && token
                .as_str()
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }

    #[test]
    fn test_randomized_tokens_are_distinct() {
        let codec = TokenCodec::new(TokenStrategy::Randomized, None);
        let path = PathBuf::from("/srv/files/report.pdf");

        let first = codec.derive(&path, 1_700_000_000).unwrap();
        let second = codec.derive(&path, 1_700_000_000).unwrap();

        assert!(is_token_shaped(&first));
        assert!(is_token_shaped(&second));
        assert_ne!(first, second, "Randomized tokens must not repeat");
    }

    #[test]
    fn test_deterministic_tokens_are_reproducible() {
        let codec = TokenCodec::new(TokenStrategy::Deterministic, Some("pepper"));
        let path = PathBuf::from("/srv/files/report.pdf");

        let first = codec.derive(&path, 1_700_000_000).unwrap();
        let second = codec.derive(&path, 1_700_000_000).unwrap();

        assert!(is_token_shaped(&first));
        assert_eq!(first, second);
    }

    #[test]
    fn test_deterministic_tokens_depend_on_every_input() {
        let codec = TokenCodec::new(TokenStrategy::Deterministic, Some("pepper"));
        let other_secret = TokenCodec::new(TokenStrategy::Deterministic, Some("salt"));
        let path = PathBuf::from("/srv/files/report.pdf");

        let base = codec.derive(&path, 1_700_000_000).unwrap();

        assert_ne!(base, codec.derive(&path, 1_700_000_001).unwrap());
        assert_ne!(
            base,
            codec
                .derive(Path::new("/srv/files/other.pdf"), 1_700_000_000)
                .unwrap()
        );
        assert_ne!(base, other_secret.derive(&path, 1_700_000_000).unwrap());
    }

    #[test]
    fn test_deterministic_digest_layout() {
        let codec = TokenCodec::new(TokenStrategy::Deterministic, Some("s3cret"));
        let token = codec.derive(Path::new("/a/b.txt"), 42).unwrap();

        let expected = crypto::to_hex(&crypto::sha256(b"/a/b.txt42s3cret"));
        assert_eq!(token.as_str(), expected);
    }

    #[test]
    fn test_token_does_not_contain_path() {
        let codec = TokenCodec::new(TokenStrategy::Randomized, None);
        let token = codec.derive(Path::new("/secret/plans.txt"), 0).unwrap();
        assert!(!token.as_str().contains("plans"));
    }

    #[test]
    fn test_token_parse() {
        let raw = "AB".repeat(32);
        let token = Token::parse(&format!("  {raw} ")).unwrap();
        assert_eq!(token.as_str(), "ab".repeat(32));

        assert!(Token::parse("abc").is_err());
        assert!(Token::parse(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_codec_debug_redacts_secret() {
        let codec = TokenCodec::new(TokenStrategy::Deterministic, Some("hunter2"));
        let debug = format!("{codec:?}");
        assert!(!debug.contains("hunter2"));
    }
}
