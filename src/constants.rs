//! Protocol constants for block token management.
//!
//! These constants define fixed limits and wire-level parameters shared by
//! masters and slaves. Changing any of them is a protocol change and must be
//! coordinated across every node holding keys.

/// Token kind carried in the token envelope.
///
/// Opaque routing hint for the transport; does not participate in
/// verification. The value is fixed for binary compatibility with deployed
/// clients.
pub const TOKEN_KIND: &str = "HDFS_BLOCK_TOKEN";

/// Size of a block key secret in bytes (HMAC-SHA1 native size).
pub const SECRET_SIZE: usize = 20;

/// Size of a token password in bytes (HMAC-SHA1 output).
pub const PASSWORD_SIZE: usize = 20;

/// Maximum size of an encoded token envelope (8 KB).
///
/// Tiger Style: Bounded to prevent oversized tokens. A typical token with a
/// short user name and pool id is under 100 bytes.
pub const MAX_TOKEN_SIZE: usize = 8 * 1024;

/// Default key update interval (10 hours, in milliseconds).
pub const DEFAULT_KEY_UPDATE_INTERVAL_MS: i64 = 10 * 60 * 60 * 1000;

/// Default token lifetime (10 hours, in milliseconds).
pub const DEFAULT_TOKEN_LIFETIME_MS: i64 = 10 * 60 * 60 * 1000;

/// Mask selecting the low 31 bits of a key serial number.
///
/// The high bit of every serial number is forced to the issuing master's
/// `nn_index`, so the two masters of an HA pair draw key ids from disjoint
/// ranges and a slave can hold both key sets in one map.
pub const SERIAL_LOW_MASK: u32 = !(1 << 31);

// ============================================================================
// Compile-Time Constant Assertions
// ============================================================================

// HMAC-SHA1 secrets and tags are the same size
const _: () = assert!(SECRET_SIZE == PASSWORD_SIZE);

// Defaults must be positive and fit comfortably in an i64 millisecond clock
const _: () = assert!(DEFAULT_KEY_UPDATE_INTERVAL_MS > 0);
const _: () = assert!(DEFAULT_TOKEN_LIFETIME_MS > 0);

// The serial mask must clear exactly the sign bit
const _: () = assert!(SERIAL_LOW_MASK == 0x7FFF_FFFF);
