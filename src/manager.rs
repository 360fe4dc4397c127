//! The block token manager: key lifecycle, minting, and verification.
//!
//! A manager is instantiated in one of two roles. A **master** generates
//! block keys, rotates them on a schedule, mints tokens with the current key,
//! and exports its key set. A **slave** imports exported key sets and
//! verifies tokens against them. Both roles verify; only a master mints.
//! Role is fixed at construction.
//!
//! # Key lifecycle
//!
//! The registry holds every live key in one map plus `current` and `next`
//! handles. Rotation retires the current key (leaving it verifiable long
//! enough for any token it minted plus one full sync interval), promotes the
//! pre-announced next key, and generates a fresh successor. Slaves that sync
//! at least once per update interval therefore always hold the minting key
//! before the first token minted with it arrives.
//!
//! # Tiger Style
//!
//! - One mutex guards the registry; critical sections are microsecond-scale
//! - Keys are immutable values; rotation replaces references
//! - Constant-time MAC comparison, never byte-array equality

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;

use hmac::Hmac;
use hmac::Mac;
use rand::RngCore;
use sha1::Sha1;
use tracing::debug;
use tracing::info;

use crate::access_mode::AccessMode;
use crate::block::BlockRef;
use crate::config::BlockTokenConfig;
use crate::constants::SERIAL_LOW_MASK;
use crate::error::BlockTokenError;
use crate::export::ExportedBlockKeys;
use crate::key::BlockKey;
use crate::key::generate_secret;
use crate::time::SystemTimeProvider;
use crate::time::TimeProvider;
use crate::token::BlockToken;
use crate::token::BlockTokenIdentifier;

/// Type alias for HMAC-SHA1.
type HmacSha1 = Hmac<Sha1>;

/// The two manager roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Generates keys, mints tokens, exports snapshots, verifies.
    Master,
    /// Imports snapshots and verifies.
    Slave,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Master => f.write_str("master"),
            Role::Slave => f.write_str("slave"),
        }
    }
}

/// Registry state guarded by the manager's mutex.
struct KeyRegistry {
    /// Every live key by id, retired ones included.
    all_keys: HashMap<i32, BlockKey>,
    /// The key new tokens are minted with. Always present on a constructed
    /// master; absent on a slave until its first import.
    current_key: Option<BlockKey>,
    /// The pre-announced successor. Master only.
    next_key: Option<BlockKey>,
    /// Masked serial counter; see [`KeyRegistry::advance_serial`].
    serial_no: u32,
}

impl KeyRegistry {
    /// Drop every key whose expiry has passed.
    ///
    /// Eviction is lazy: it runs at rotation and at import, never on the
    /// verify path.
    fn remove_expired_keys(&mut self, now_ms: i64) {
        self.all_keys.retain(|_, key| !key.is_expired(now_ms));
    }

    /// Allocate the next key id.
    ///
    /// The low 31 bits advance with wrap-around from a random seed; the high
    /// bit is forced to `nn_index`. The two masters of an HA pair therefore
    /// emit ids from disjoint ranges (non-negative for index 0, negative for
    /// index 1 after the two's-complement cast).
    fn advance_serial(&mut self, nn_index: u8) -> i32 {
        self.serial_no = (self.serial_no.wrapping_add(1) & SERIAL_LOW_MASK) | (u32::from(nn_index) << 31);
        self.serial_no as i32
    }
}

/// Manages block keys and block tokens for one authority or one verifier.
///
/// Long-lived and shared by many request-handling threads; all operations
/// are synchronous and take `&self`.
///
/// # Example
///
/// ```
/// use std::collections::BTreeSet;
/// use blockgate::{AccessMode, BlockRef, BlockTokenConfig, BlockTokenManager};
///
/// let master = BlockTokenManager::master(&BlockTokenConfig::default(), 0)?;
/// let block = BlockRef::new("BP-1", 42);
/// let token = master.generate_token("alice", &block, BTreeSet::from([AccessMode::Read]))?;
/// master.check_access(&token, Some("alice"), &block, AccessMode::Read)?;
/// # Ok::<(), blockgate::BlockTokenError>(())
/// ```
pub struct BlockTokenManager {
    role: Role,
    /// Which half of the HA pair this master is. Always 0 on slaves.
    nn_index: u8,
    key_update_interval_ms: i64,
    /// May be updated without the registry lock; readers tolerate a stale
    /// value for at most one mint.
    token_lifetime_ms: AtomicI64,
    registry: Mutex<KeyRegistry>,
    time: Arc<dyn TimeProvider>,
}

impl BlockTokenManager {
    /// Construct a master for one half of an HA pair.
    ///
    /// Seeds the serial counter from the CSPRNG and generates the initial
    /// `(current, next)` key pair.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if an interval is non-positive or `nn_index` is not
    /// 0 or 1.
    pub fn master(config: &BlockTokenConfig, nn_index: u8) -> Result<Self, BlockTokenError> {
        Self::master_with_time(config, nn_index, Arc::new(SystemTimeProvider))
    }

    /// Construct a master with an injected clock.
    pub fn master_with_time(
        config: &BlockTokenConfig,
        nn_index: u8,
        time: Arc<dyn TimeProvider>,
    ) -> Result<Self, BlockTokenError> {
        config.validate()?;
        if nn_index > 1 {
            return Err(BlockTokenError::InvalidConfig {
                message: format!("nn_index must be 0 or 1, got {nn_index}"),
            });
        }

        let seed = (rand::rng().next_u32() & SERIAL_LOW_MASK) | (u32::from(nn_index) << 31);
        let manager = Self {
            role: Role::Master,
            nn_index,
            key_update_interval_ms: config.key_update_interval_ms,
            token_lifetime_ms: AtomicI64::new(config.token_lifetime_ms),
            registry: Mutex::new(KeyRegistry {
                all_keys: HashMap::new(),
                current_key: None,
                next_key: None,
                serial_no: seed,
            }),
            time,
        };
        manager.generate_keys()?;
        Ok(manager)
    }

    /// Construct a slave.
    ///
    /// The registry starts empty; tokens cannot be verified until the first
    /// successful [`import_keys`](Self::import_keys).
    pub fn slave(config: &BlockTokenConfig) -> Result<Self, BlockTokenError> {
        Self::slave_with_time(config, Arc::new(SystemTimeProvider))
    }

    /// Construct a slave with an injected clock.
    pub fn slave_with_time(config: &BlockTokenConfig, time: Arc<dyn TimeProvider>) -> Result<Self, BlockTokenError> {
        config.validate()?;
        Ok(Self {
            role: Role::Slave,
            nn_index: 0,
            key_update_interval_ms: config.key_update_interval_ms,
            token_lifetime_ms: AtomicI64::new(config.token_lifetime_ms),
            registry: Mutex::new(KeyRegistry {
                all_keys: HashMap::new(),
                current_key: None,
                next_key: None,
                serial_no: 0,
            }),
            time,
        })
    }

    /// This manager's role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The configured key update interval in milliseconds.
    pub fn key_update_interval_ms(&self) -> i64 {
        self.key_update_interval_ms
    }

    /// The current token lifetime in milliseconds.
    pub fn token_lifetime_ms(&self) -> i64 {
        self.token_lifetime_ms.load(Ordering::Relaxed)
    }

    /// Update the token lifetime.
    ///
    /// Takes effect on the next mint; deliberately does not take the
    /// registry lock.
    pub fn set_token_lifetime(&self, token_lifetime_ms: i64) {
        self.token_lifetime_ms.store(token_lifetime_ms, Ordering::Relaxed);
    }

    /// Generate the initial `(current, next)` key pair. Master only.
    ///
    /// Expiry horizons match rotation's: the current key must outlive every
    /// token it can mint (`+ token_lifetime`) plus the time a slave may take
    /// to observe the next snapshot (`+ key_update_interval`), measured from
    /// the end of its minting window.
    fn generate_keys(&self) -> Result<(), BlockTokenError> {
        let token_lifetime = self.token_lifetime_ms.load(Ordering::Relaxed);
        let mut registry = self.lock_registry()?;
        let now = self.time.now_unix_ms();

        let current_id = registry.advance_serial(self.nn_index);
        let current = BlockKey::new(current_id, now + 2 * self.key_update_interval_ms + token_lifetime, generate_secret());
        let next_id = registry.advance_serial(self.nn_index);
        let next = BlockKey::new(next_id, now + 3 * self.key_update_interval_ms + token_lifetime, generate_secret());

        registry.all_keys.insert(current.key_id(), current.clone());
        registry.all_keys.insert(next.key_id(), next.clone());
        registry.current_key = Some(current);
        registry.next_key = Some(next);
        Ok(())
    }

    /// Rotate block keys. Master only.
    ///
    /// Evicts expired keys, retires the outgoing current key with its final
    /// expiry, promotes the next key, and generates a fresh successor.
    /// Returns `Ok(true)` when the rotation ran.
    pub fn update_keys(&self) -> Result<bool, BlockTokenError> {
        self.require_role(Role::Master, "key rotation")?;
        info!("updating block keys");

        let token_lifetime = self.token_lifetime_ms.load(Ordering::Relaxed);
        let mut registry = self.lock_registry()?;
        let now = self.time.now_unix_ms();

        registry.remove_expired_keys(now);

        let current = registry.current_key.clone().ok_or(BlockTokenError::NotInitialized)?;
        let next = registry.next_key.clone().ok_or(BlockTokenError::NotInitialized)?;

        // Set the final expiry of the retiring current key: the last moment a
        // token minted just before rotation may still need to be verified.
        let retired = current.with_expiry(now + self.key_update_interval_ms + token_lifetime);
        registry.all_keys.insert(retired.key_id(), retired);

        // Promote the next key, refreshing its estimated expiry.
        let promoted = next.with_expiry(now + 2 * self.key_update_interval_ms + token_lifetime);
        registry.all_keys.insert(promoted.key_id(), promoted.clone());
        registry.current_key = Some(promoted);

        // Generate a fresh next key.
        let fresh_id = registry.advance_serial(self.nn_index);
        let fresh = BlockKey::new(fresh_id, now + 3 * self.key_update_interval_ms + token_lifetime, generate_secret());
        registry.all_keys.insert(fresh.key_id(), fresh.clone());
        registry.next_key = Some(fresh);

        Ok(true)
    }

    /// Rotate only if `elapsed_ms` exceeds the key update interval.
    ///
    /// The parameter is an **elapsed duration** since the last rotation, not
    /// an absolute timestamp. Returns `Ok(false)` when no rotation was due.
    pub fn update_keys_if_elapsed(&self, elapsed_ms: i64) -> Result<bool, BlockTokenError> {
        if elapsed_ms > self.key_update_interval_ms {
            return self.update_keys();
        }
        Ok(false)
    }

    /// Export a value-copy snapshot of the live key set. Master only.
    ///
    /// The snapshot owns its keys; callers may ship it over the transport
    /// without holding the registry lock.
    pub fn export_keys(&self) -> Result<ExportedBlockKeys, BlockTokenError> {
        self.require_role(Role::Master, "key export")?;
        debug!("exporting block keys");

        let registry = self.lock_registry()?;
        let current_key = registry.current_key.clone().ok_or(BlockTokenError::NotInitialized)?;
        Ok(ExportedBlockKeys {
            is_block_token_enabled: true,
            key_update_interval_ms: self.key_update_interval_ms,
            token_lifetime_ms: self.token_lifetime_ms.load(Ordering::Relaxed),
            current_key,
            all_keys: registry.all_keys.values().cloned().collect(),
        })
    }

    /// Adopt an exported key set. Slave only.
    ///
    /// The master is authoritative: its current key replaces whatever was
    /// previously known, and every key in the envelope is upserted by id.
    /// There is no reconciliation; a slave may hold keys from both masters
    /// of an HA pair, kept unambiguous by the disjoint id ranges.
    pub fn import_keys(&self, exported: &ExportedBlockKeys) -> Result<(), BlockTokenError> {
        self.require_role(Role::Slave, "key import")?;
        info!("setting block keys");

        let mut registry = self.lock_registry()?;
        let now = self.time.now_unix_ms();

        registry.remove_expired_keys(now);
        registry.current_key = Some(exported.current_key.clone());
        for key in &exported.all_keys {
            registry.all_keys.insert(key.key_id(), key.clone());
        }
        Ok(())
    }

    /// Mint a block token for a user. Master only.
    ///
    /// `user_id` may be empty for anonymous callers. The token binds the
    /// user, the block, and the mode set to `now + token_lifetime`.
    ///
    /// # Errors
    ///
    /// `EmptyAccessModes` if `modes` is empty; `NotInitialized` if no
    /// current key exists (the constructor was bypassed).
    pub fn generate_token(
        &self,
        user_id: &str,
        block: &BlockRef,
        modes: BTreeSet<AccessMode>,
    ) -> Result<BlockToken, BlockTokenError> {
        self.require_role(Role::Master, "token minting")?;
        if modes.is_empty() {
            return Err(BlockTokenError::EmptyAccessModes);
        }

        // Snapshot the current key; the mint itself runs outside the lock.
        let key = self.lock_registry()?.current_key.clone().ok_or(BlockTokenError::NotInitialized)?;

        let identifier = BlockTokenIdentifier {
            expiry_ms: self.time.now_unix_ms() + self.token_lifetime_ms.load(Ordering::Relaxed),
            key_id: key.key_id(),
            user_id: user_id.to_string(),
            block_pool_id: block.pool_id.clone(),
            block_id: block.block_id,
            access_modes: modes,
        };
        debug!(user = %identifier.user_id, block = %block, key_id = identifier.key_id, "generating block token");

        let identifier_bytes = identifier.encode()?;
        let password = compute_password(key.secret(), &identifier_bytes);
        Ok(BlockToken::new(identifier_bytes, password))
    }

    /// Check whether a token authorizes `mode` on `block`.
    ///
    /// Structural checks run first, in a fixed order (user, pool, block id,
    /// expiry, mode), then the minting key is resolved and the MAC is
    /// recomputed and compared in constant time. `expected_user` of `None`
    /// skips the user check.
    pub fn check_access(
        &self,
        token: &BlockToken,
        expected_user: Option<&str>,
        block: &BlockRef,
        mode: AccessMode,
    ) -> Result<(), BlockTokenError> {
        let identifier = BlockTokenIdentifier::decode(&token.identifier)?;
        self.check_access_id(&identifier, expected_user, block, mode)?;

        let key = self
            .lock_registry()?
            .all_keys
            .get(&identifier.key_id)
            .cloned()
            .ok_or(BlockTokenError::UnknownKey { key_id: identifier.key_id })?;
        if !verify_password(key.secret(), &token.identifier, &token.password) {
            return Err(BlockTokenError::BadMac);
        }
        Ok(())
    }

    /// Structural checks only, on an already-decoded identifier.
    ///
    /// For transports that verified the token password themselves; performs
    /// no MAC computation.
    pub fn check_access_id(
        &self,
        identifier: &BlockTokenIdentifier,
        expected_user: Option<&str>,
        block: &BlockRef,
        mode: AccessMode,
    ) -> Result<(), BlockTokenError> {
        debug!(user = ?expected_user, block = %block, mode = %mode, "checking access");

        if let Some(expected) = expected_user {
            if expected != identifier.user_id {
                return Err(BlockTokenError::UserMismatch {
                    expected_user: expected.to_string(),
                    token_user: identifier.user_id.clone(),
                });
            }
        }
        if identifier.block_pool_id != block.pool_id || identifier.block_id != block.block_id {
            return Err(BlockTokenError::BlockMismatch {
                pool_id: block.pool_id.clone(),
                block_id: block.block_id,
            });
        }
        let now = self.time.now_unix_ms();
        if now > identifier.expiry_ms {
            return Err(BlockTokenError::Expired {
                expiry_ms: identifier.expiry_ms,
                now_ms: now,
            });
        }
        if !identifier.access_modes.contains(&mode) {
            return Err(BlockTokenError::AccessModeDenied { mode });
        }
        Ok(())
    }

    /// Whether a token's expiry has passed, without a full decode.
    pub fn is_token_expired(&self, token: &BlockToken) -> Result<bool, BlockTokenError> {
        let expiry_ms = BlockTokenIdentifier::decode_expiry_ms(&token.identifier)?;
        Ok(self.time.now_unix_ms() > expiry_ms)
    }

    fn require_role(&self, required: Role, operation: &'static str) -> Result<(), BlockTokenError> {
        if self.role == required {
            return Ok(());
        }
        Err(BlockTokenError::RoleViolation {
            operation,
            role: self.role,
        })
    }

    fn lock_registry(&self) -> Result<MutexGuard<'_, KeyRegistry>, BlockTokenError> {
        self.registry.lock().map_err(|_| BlockTokenError::Internal {
            message: "key registry lock poisoned".to_string(),
        })
    }

    /// Override the serial counter. The masked discipline still applies.
    #[doc(hidden)]
    pub fn set_serial_no(&self, serial_no: u32) -> Result<(), BlockTokenError> {
        let mut registry = self.lock_registry()?;
        registry.serial_no = (serial_no & SERIAL_LOW_MASK) | (u32::from(self.nn_index) << 31);
        Ok(())
    }

    /// Current serial counter value.
    #[doc(hidden)]
    pub fn serial_no(&self) -> Result<u32, BlockTokenError> {
        Ok(self.lock_registry()?.serial_no)
    }

    /// Drop every key, current and next handles included.
    #[doc(hidden)]
    pub fn clear_all_keys(&self) -> Result<(), BlockTokenError> {
        let mut registry = self.lock_registry()?;
        registry.all_keys.clear();
        Ok(())
    }
}

impl fmt::Debug for BlockTokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockTokenManager")
            .field("role", &self.role)
            .field("nn_index", &self.nn_index)
            .field("key_update_interval_ms", &self.key_update_interval_ms)
            .field("token_lifetime_ms", &self.token_lifetime_ms.load(Ordering::Relaxed))
            .finish()
    }
}

// ============================================================================
// MAC Helpers
// ============================================================================

/// Compute the token password: `HMAC-SHA1(secret, identifier_bytes)`.
fn compute_password(secret: &[u8], identifier: &[u8]) -> Vec<u8> {
    // SAFETY: HMAC accepts any key length per RFC 2104; block key secrets are
    // fixed-size byte strings generated by this crate.
    let mut mac = HmacSha1::new_from_slice(secret).expect("HMAC accepts any key size per RFC 2104");
    mac.update(identifier);
    mac.finalize().into_bytes().to_vec()
}

/// Recompute and compare a token password in constant time.
fn verify_password(secret: &[u8], identifier: &[u8], password: &[u8]) -> bool {
    let mut mac = HmacSha1::new_from_slice(secret).expect("HMAC accepts any key size per RFC 2104");
    mac.update(identifier);
    // verify_slice is the crypto library's constant-time comparison
    mac.verify_slice(password).is_ok()
}
