//! # Challenge-Response Authentication
//!
//! obs-websocket v5 authentication string:
//!
//! ```text
//! secret = base64(sha256(password ++ salt))
//! token  = base64(sha256(secret ++ challenge))
//! ```
//!
//! Concatenation is plain, undelimited UTF-8. Both rounds use standard
//! (padded) base64, which is what the server recomputes on its side.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Salt and challenge announced in a Hello message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    /// Server-chosen salt, fixed per password.
    pub salt: String,
    /// Per-connection challenge.
    pub challenge: String,
}

/// Compute the Identify authentication token.
pub fn compute_token(password: &str, salt: &str, challenge: &str) -> String {
    let secret = sha256_base64(&[password.as_bytes(), salt.as_bytes()]);
    sha256_base64(&[secret.as_bytes(), challenge.as_bytes()])
}

fn sha256_base64(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    STANDARD.encode(hasher.finalize())
}
