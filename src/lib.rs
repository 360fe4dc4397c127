//! Block access tokens for distributed block storage.
//!
//! A naming authority (the **master**) mints short-lived, HMAC-authenticated
//! tokens binding a user, a block, and a set of access modes. Storage nodes
//! (**slaves**) verify those tokens offline against a key set the master
//! publishes, so the hot read/write path never calls back to the authority.
//! Keys rotate on a schedule to bound the exposure window of a compromised
//! storage node, and a serial-number discipline keeps the key id spaces of an
//! HA master pair disjoint.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeSet;
//! use blockgate::{AccessMode, BlockRef, BlockTokenConfig, BlockTokenManager};
//!
//! // The master mints a token for one block.
//! let master = BlockTokenManager::master(&BlockTokenConfig::default(), 0)?;
//! let block = BlockRef::new("BP-1", 42);
//! let token = master.generate_token("alice", &block, BTreeSet::from([AccessMode::Read]))?;
//!
//! // A slave that imported the master's key set verifies it offline.
//! let slave = BlockTokenManager::slave(&BlockTokenConfig::default())?;
//! slave.import_keys(&master.export_keys()?)?;
//! slave.check_access(&token, Some("alice"), &block, AccessMode::Read)?;
//! # Ok::<(), blockgate::BlockTokenError>(())
//! ```
//!
//! # Roles
//!
//! Role is fixed at construction. Masters generate, rotate, and export keys
//! and mint tokens; slaves import key sets and verify. Invoking an operation
//! on the wrong role surfaces [`BlockTokenError::RoleViolation`].
//!
//! # Wire compatibility
//!
//! Token identifiers, token envelopes, and exported key sets use a fixed
//! postcard layout (zig-zag varints, length-prefixed strings); the MAC is
//! HMAC-SHA1 with 20-byte secrets. See [`token`] for the field order.

pub mod access_mode;
pub mod block;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod key;
pub mod manager;
pub mod time;
pub mod token;

pub use access_mode::AccessMode;
pub use block::BlockRef;
pub use config::BlockTokenConfig;
pub use error::BlockTokenError;
pub use export::ExportedBlockKeys;
pub use key::BlockKey;
pub use manager::BlockTokenManager;
pub use manager::Role;
pub use time::SimulatedTimeProvider;
pub use time::SystemTimeProvider;
pub use time::TimeProvider;
pub use token::BlockToken;
pub use token::BlockTokenIdentifier;
