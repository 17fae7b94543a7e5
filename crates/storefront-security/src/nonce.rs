//! Per-request nonces.

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of random bytes in a nonce.
const NONCE_BYTES: usize = 16;

/// An opaque per-request token authorizing inline scripts and styles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nonce(String);

impl Nonce {
    /// Generate a fresh cryptographically random nonce.
    pub fn generate() -> Self {
        let bytes: [u8; NONCE_BYTES] = rand::thread_rng().gen();
        Self(STANDARD.encode(bytes))
    }

    /// Wrap an existing nonce value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the nonce as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Source expression for a CSP directive: `'nonce-<value>'`.
    pub fn source(&self) -> String {
        format!("'nonce-{}'", self.0)
    }
}

impl std::fmt::Display for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
