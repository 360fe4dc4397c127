//! Block tokens and their wire encoding.
//!
//! A token is the pair of an encoded [`BlockTokenIdentifier`] (the plaintext
//! claim) and a password (the MAC over those exact bytes). Postcard is the
//! codec: signed integers become zig-zag LEB128 varints and strings become
//! length-prefixed UTF-8, which is the layout masters and slaves agree on.
//! The identifier is encoded once at mint time and the bytes are carried
//! verbatim; verification recomputes the MAC over the carried bytes, never
//! over a re-encoding.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::access_mode::AccessMode;
use crate::constants::MAX_TOKEN_SIZE;
use crate::constants::TOKEN_KIND;
use crate::error::BlockTokenError;

/// The signed payload of a block token.
///
/// Field order is the wire order:
///
/// 1. `expiry_ms` - varint64 (zig-zag)
/// 2. `key_id` - varint32 (zig-zag)
/// 3. `user_id` - length-prefixed UTF-8
/// 4. `block_pool_id` - length-prefixed UTF-8
/// 5. `block_id` - varint64 (zig-zag)
/// 6. `access_modes` - length-prefixed sequence of mode names
///
/// Leading with `expiry_ms` lets [`BlockTokenIdentifier::decode_expiry_ms`]
/// answer "is this expired?" without parsing the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTokenIdentifier {
    /// Absolute expiry in milliseconds since the epoch.
    pub expiry_ms: i64,
    /// Id of the block key that minted this token's password.
    pub key_id: i32,
    /// Short user name; empty for anonymous callers.
    pub user_id: String,
    /// Pool the bound block belongs to.
    pub block_pool_id: String,
    /// Id of the bound block.
    pub block_id: i64,
    /// Modes this token grants. Ordered so the encoding is deterministic.
    pub access_modes: BTreeSet<AccessMode>,
}

impl BlockTokenIdentifier {
    /// Encode to the agreed byte layout.
    pub fn encode(&self) -> Result<Vec<u8>, BlockTokenError> {
        postcard::to_allocvec(self).map_err(|e| BlockTokenError::Encoding { message: e.to_string() })
    }

    /// Decode from identifier bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, BlockTokenError> {
        if bytes.len() > MAX_TOKEN_SIZE {
            return Err(BlockTokenError::Malformed {
                message: format!("identifier of {} bytes exceeds {} byte limit", bytes.len(), MAX_TOKEN_SIZE),
            });
        }
        postcard::from_bytes(bytes).map_err(|e| BlockTokenError::Malformed { message: e.to_string() })
    }

    /// Decode only the leading expiry field.
    ///
    /// Parses just the first varint, so an expiry probe on a hot path never
    /// touches the strings or the mode set.
    pub fn decode_expiry_ms(bytes: &[u8]) -> Result<i64, BlockTokenError> {
        postcard::take_from_bytes::<i64>(bytes)
            .map(|(expiry_ms, _rest)| expiry_ms)
            .map_err(|e| BlockTokenError::Malformed { message: e.to_string() })
    }
}

/// A block token as shipped over the wire.
///
/// `kind` and `service` are opaque routing hints for the transport; they do
/// not participate in verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockToken {
    /// Encoded [`BlockTokenIdentifier`] bytes, exactly as minted.
    pub identifier: Vec<u8>,
    /// MAC over `identifier`.
    pub password: Vec<u8>,
    /// Token kind routing hint.
    pub kind: String,
    /// Service routing hint.
    pub service: String,
}

impl BlockToken {
    /// Assemble a token from freshly minted identifier bytes and password.
    pub fn new(identifier: Vec<u8>, password: Vec<u8>) -> Self {
        Self {
            identifier,
            password,
            kind: TOKEN_KIND.to_string(),
            service: String::new(),
        }
    }

    /// The empty placeholder token.
    ///
    /// Carried by unauthenticated paths that must still present a typed
    /// token. It has no identifier, no password, and never validates.
    pub fn empty() -> Self {
        Self {
            identifier: Vec::new(),
            password: Vec::new(),
            kind: String::new(),
            service: String::new(),
        }
    }

    /// Whether this is the empty placeholder.
    pub fn is_empty(&self) -> bool {
        self.identifier.is_empty() && self.password.is_empty()
    }

    /// Encode the token envelope.
    pub fn encode(&self) -> Result<Vec<u8>, BlockTokenError> {
        let bytes =
            postcard::to_allocvec(self).map_err(|e| BlockTokenError::Encoding { message: e.to_string() })?;
        if bytes.len() > MAX_TOKEN_SIZE {
            return Err(BlockTokenError::Encoding {
                message: format!("token of {} bytes exceeds {} byte limit", bytes.len(), MAX_TOKEN_SIZE),
            });
        }
        Ok(bytes)
    }

    /// Decode a token envelope.
    pub fn decode(bytes: &[u8]) -> Result<Self, BlockTokenError> {
        if bytes.len() > MAX_TOKEN_SIZE {
            return Err(BlockTokenError::Malformed {
                message: format!("token of {} bytes exceeds {} byte limit", bytes.len(), MAX_TOKEN_SIZE),
            });
        }
        postcard::from_bytes(bytes).map_err(|e| BlockTokenError::Malformed { message: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_identifier() -> BlockTokenIdentifier {
        BlockTokenIdentifier {
            expiry_ms: 1_700_000_000_000,
            key_id: -42,
            user_id: "alice".into(),
            block_pool_id: "BP-1".into(),
            block_id: 42,
            access_modes: BTreeSet::from([AccessMode::Read, AccessMode::Write]),
        }
    }

    #[test]
    fn test_identifier_roundtrip() {
        let id = sample_identifier();
        let bytes = id.encode().expect("should encode");
        let recovered = BlockTokenIdentifier::decode(&bytes).expect("should decode");
        assert_eq!(recovered, id);
    }

    #[test]
    fn test_reference_byte_layout() {
        // Golden vector pinning the agreed layout: zig-zag varints, then
        // length-prefixed strings, then a length-prefixed name sequence.
        let id = BlockTokenIdentifier {
            expiry_ms: 0,
            key_id: 1,
            user_id: String::new(),
            block_pool_id: "p".into(),
            block_id: -1,
            access_modes: BTreeSet::from([AccessMode::Read]),
        };
        let bytes = id.encode().expect("should encode");
        assert_eq!(
            bytes,
            [
                0x00, // expiry_ms = 0
                0x02, // key_id = 1, zig-zag
                0x00, // user_id: empty
                0x01, 0x70, // block_pool_id: "p"
                0x01, // block_id = -1, zig-zag
                0x01, 0x04, 0x52, 0x45, 0x41, 0x44, // modes: ["READ"]
            ]
        );
    }

    #[test]
    fn test_expiry_probe_reads_only_first_field() {
        let id = sample_identifier();
        let bytes = id.encode().expect("should encode");
        assert_eq!(BlockTokenIdentifier::decode_expiry_ms(&bytes).expect("should probe"), id.expiry_ms);

        // Probe works even when everything after the first varint is garbage
        let mut truncated = bytes.clone();
        truncated.truncate(10);
        assert_eq!(BlockTokenIdentifier::decode_expiry_ms(&truncated).expect("should probe"), id.expiry_ms);
    }

    #[test]
    fn test_decode_garbage_is_malformed() {
        let result = BlockTokenIdentifier::decode(&[0xFF; 16]);
        assert!(matches!(result, Err(BlockTokenError::Malformed { .. })));
    }

    #[test]
    fn test_decode_oversized_is_malformed() {
        let result = BlockTokenIdentifier::decode(&vec![0u8; MAX_TOKEN_SIZE + 1]);
        assert!(matches!(result, Err(BlockTokenError::Malformed { .. })));
    }

    #[test]
    fn test_token_envelope_roundtrip() {
        let id = sample_identifier();
        let token = BlockToken::new(id.encode().expect("should encode"), vec![0xAA; 20]);
        assert_eq!(token.kind, "HDFS_BLOCK_TOKEN");
        assert_eq!(token.service, "");

        let bytes = token.encode().expect("should encode");
        let recovered = BlockToken::decode(&bytes).expect("should decode");
        assert_eq!(recovered, token);
    }

    #[test]
    fn test_empty_token() {
        let token = BlockToken::empty();
        assert!(token.is_empty());
        assert!(BlockTokenIdentifier::decode(&token.identifier).is_err());
    }
}
