//! Error types for block token operations.
//!
//! Every failure is surfaced to the caller; nothing is retried internally.
//! The transport layer decides whether a failed check closes the connection
//! or just rejects the request. The MAC comparison itself is constant-time,
//! though the returned kind may still leak via timing (accepted).

use snafu::Snafu;

use crate::access_mode::AccessMode;
use crate::manager::Role;

/// Errors from minting, verifying, rotating, or importing block keys.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum BlockTokenError {
    /// Mint attempted before any block key exists.
    #[snafu(display("current block key hasn't been initialized"))]
    NotInitialized,

    /// Token identifier bytes do not parse.
    #[snafu(display("unable to decode block token identifier: {message}"))]
    Malformed {
        /// Decoder error message.
        message: String,
    },

    /// The token belongs to a different user.
    #[snafu(display("block token for user {token_user:?} doesn't belong to user {expected_user:?}"))]
    UserMismatch {
        /// User the caller claimed.
        expected_user: String,
        /// User named in the token.
        token_user: String,
    },

    /// The token is bound to a different block or pool.
    #[snafu(display("block token doesn't apply to block {pool_id}:blk_{block_id}"))]
    BlockMismatch {
        /// Pool id of the requested block.
        pool_id: String,
        /// Id of the requested block.
        block_id: i64,
    },

    /// The token's expiry instant has passed.
    #[snafu(display("block token is expired (expiry {expiry_ms}ms, now {now_ms}ms)"))]
    Expired {
        /// Expiry instant in the token.
        expiry_ms: i64,
        /// Clock reading at check time.
        now_ms: i64,
    },

    /// The requested mode is not in the token's mode set.
    #[snafu(display("block token doesn't have {mode} permission"))]
    AccessModeDenied {
        /// The mode that was requested.
        mode: AccessMode,
    },

    /// The minting key has been retired and evicted, or belongs to an
    /// unknown authority.
    #[snafu(display("block key {key_id} doesn't exist"))]
    UnknownKey {
        /// Key id named in the token.
        key_id: i32,
    },

    /// The recomputed MAC does not match the token password.
    #[snafu(display("block token password doesn't match"))]
    BadMac,

    /// A master-only operation was invoked on a slave, or vice versa.
    #[snafu(display("{operation} is not permitted in {role} mode"))]
    RoleViolation {
        /// The operation that was attempted.
        operation: &'static str,
        /// The role of the manager it was attempted on.
        role: Role,
    },

    /// A token was requested with no access modes.
    #[snafu(display("access mode set must not be empty"))]
    EmptyAccessModes,

    /// Construction parameters are out of range.
    #[snafu(display("invalid block token configuration: {message}"))]
    InvalidConfig {
        /// What was out of range.
        message: String,
    },

    /// A wire value failed to encode.
    #[snafu(display("failed to encode: {message}"))]
    Encoding {
        /// Encoder error message.
        message: String,
    },

    /// Internal invariant failure (lock poisoning).
    #[snafu(display("internal error: {message}"))]
    Internal {
        /// Description of the failure.
        message: String,
    },
}
