//! Block references.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Reference to a block: the pool (namespace) it lives in plus its id.
///
/// This is what a token is bound to; verification compares both fields
/// against the token identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRef {
    /// Pool (namespace) the block belongs to.
    pub pool_id: String,
    /// Block id, unique within the pool.
    pub block_id: i64,
}

impl BlockRef {
    /// Create a block reference.
    pub fn new(pool_id: impl Into<String>, block_id: i64) -> Self {
        Self {
            pool_id: pool_id.into(),
            block_id,
        }
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:blk_{}", self.pool_id, self.block_id)
    }
}
