//! The key-set snapshot a master publishes to slaves.

use serde::Deserialize;
use serde::Serialize;

use crate::error::BlockTokenError;
use crate::key::BlockKey;

/// Value-copy snapshot of a master's live key set.
///
/// Produced by `export_keys` on a master and consumed by `import_keys` on a
/// slave. The snapshot owns its keys, so callers may ship it over the
/// transport without holding the registry lock. Secrets travel in cleartext;
/// the transport is trusted for confidentiality.
///
/// Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedBlockKeys {
    /// Whether block tokens are enabled on the exporting master.
    pub is_block_token_enabled: bool,
    /// The master's key update interval in milliseconds.
    pub key_update_interval_ms: i64,
    /// The master's token lifetime in milliseconds.
    pub token_lifetime_ms: i64,
    /// The key the master is currently minting with.
    pub current_key: BlockKey,
    /// Every live key, retired ones included.
    pub all_keys: Vec<BlockKey>,
}

impl ExportedBlockKeys {
    /// Encode the envelope for the transport.
    pub fn encode(&self) -> Result<Vec<u8>, BlockTokenError> {
        postcard::to_allocvec(self).map_err(|e| BlockTokenError::Encoding { message: e.to_string() })
    }

    /// Decode an envelope received from the transport.
    pub fn decode(bytes: &[u8]) -> Result<Self, BlockTokenError> {
        postcard::from_bytes(bytes).map_err(|e| BlockTokenError::Malformed { message: e.to_string() })
    }
}
