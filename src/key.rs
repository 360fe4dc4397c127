//! Block keys: the symmetric secrets tokens are minted with.

use std::fmt;

use rand::RngCore;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::SECRET_SIZE;

/// An immutable block key: `(key_id, expiry, secret)`.
///
/// Keys are never mutated in place; rotation and import replace whole values.
/// A key must not be trusted to verify tokens after `expiry_ms`.
///
/// Field order is the wire order: `(key_id, expiry_ms, secret)`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockKey {
    /// Serial number, unique within the lifetime of a master role.
    key_id: i32,
    /// Absolute wall-clock expiry in milliseconds since the epoch.
    expiry_ms: i64,
    /// MAC secret (HMAC-SHA1 native size).
    secret: Vec<u8>,
}

impl BlockKey {
    /// Create a block key from its parts.
    pub fn new(key_id: i32, expiry_ms: i64, secret: Vec<u8>) -> Self {
        Self {
            key_id,
            expiry_ms,
            secret,
        }
    }

    /// Key id.
    pub fn key_id(&self) -> i32 {
        self.key_id
    }

    /// Absolute expiry in milliseconds since the epoch.
    pub fn expiry_ms(&self) -> i64 {
        self.expiry_ms
    }

    /// MAC secret bytes.
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Whether the key is expired at `now_ms`.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expiry_ms < now_ms
    }

    /// Copy of this key with a different expiry.
    ///
    /// Used at rotation to retire the outgoing current key with its final
    /// expiry and to refresh the promoted key's horizon.
    pub fn with_expiry(&self, expiry_ms: i64) -> Self {
        Self {
            key_id: self.key_id,
            expiry_ms,
            secret: self.secret.clone(),
        }
    }
}

impl fmt::Debug for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Don't expose the secret in debug output
        f.debug_struct("BlockKey")
            .field("key_id", &self.key_id)
            .field("expiry_ms", &self.expiry_ms)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Generate a fresh random MAC secret.
///
/// Drawn from the OS-seeded CSPRNG at the MAC algorithm's native size.
pub(crate) fn generate_secret() -> Vec<u8> {
    let mut secret = vec![0u8; SECRET_SIZE];
    rand::rng().fill_bytes(&mut secret);
    secret
}
