//! Configuration knobs for block token management.

use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_KEY_UPDATE_INTERVAL_MS;
use crate::constants::DEFAULT_TOKEN_LIFETIME_MS;

/// Tunable parameters shared by masters and slaves.
///
/// The key update interval must be long enough that every live slave syncs
/// its key set with the master at least once per interval; the rotation
/// horizons in the manager are derived from that assumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTokenConfig {
    /// Nominal period between key rotations on a master, in milliseconds.
    #[serde(default = "default_key_update_interval_ms")]
    pub key_update_interval_ms: i64,
    /// Maximum time a minted token remains valid, in milliseconds.
    #[serde(default = "default_token_lifetime_ms")]
    pub token_lifetime_ms: i64,
}

fn default_key_update_interval_ms() -> i64 {
    DEFAULT_KEY_UPDATE_INTERVAL_MS
}

fn default_token_lifetime_ms() -> i64 {
    DEFAULT_TOKEN_LIFETIME_MS
}

impl Default for BlockTokenConfig {
    fn default() -> Self {
        Self {
            key_update_interval_ms: DEFAULT_KEY_UPDATE_INTERVAL_MS,
            token_lifetime_ms: DEFAULT_TOKEN_LIFETIME_MS,
        }
    }
}

impl BlockTokenConfig {
    /// Create a config with explicit intervals.
    pub fn new(key_update_interval_ms: i64, token_lifetime_ms: i64) -> Self {
        Self {
            key_update_interval_ms,
            token_lifetime_ms,
        }
    }

    /// Check that both intervals are positive.
    pub(crate) fn validate(&self) -> Result<(), crate::error::BlockTokenError> {
        if self.key_update_interval_ms <= 0 {
            return Err(crate::error::BlockTokenError::InvalidConfig {
                message: format!("key update interval must be positive, got {}", self.key_update_interval_ms),
            });
        }
        if self.token_lifetime_ms <= 0 {
            return Err(crate::error::BlockTokenError::InvalidConfig {
                message: format!("token lifetime must be positive, got {}", self.token_lifetime_ms),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_ten_hours() {
        let config = BlockTokenConfig::default();
        assert_eq!(config.key_update_interval_ms, 36_000_000);
        assert_eq!(config.token_lifetime_ms, 36_000_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: BlockTokenConfig = serde_json::from_str("{}").expect("should deserialize");
        assert_eq!(config, BlockTokenConfig::default());
    }

    #[test]
    fn test_nonpositive_intervals_rejected() {
        assert!(BlockTokenConfig::new(0, 1000).validate().is_err());
        assert!(BlockTokenConfig::new(1000, -1).validate().is_err());
    }
}
