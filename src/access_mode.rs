//! Access modes a block token can grant.
//!
//! Modes are serialized by their wire name (`"READ"`, `"WRITE"`, `"COPY"`,
//! `"REPLACE"`) rather than by variant index, so the encoded form is stable
//! across enum reordering and readable by non-Rust peers.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

/// Semantic operation a token permits on a block.
///
/// `Copy` and `Replace` are the inter-node transfer modes used during
/// re-replication and pipeline recovery; clients normally hold only `Read`
/// and `Write`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccessMode {
    /// Read block data.
    Read,
    /// Write block data.
    Write,
    /// Copy a block to another node.
    Copy,
    /// Replace a block on another node.
    Replace,
}

impl AccessMode {
    /// All access modes, in canonical order.
    pub const ALL: [AccessMode; 4] = [AccessMode::Read, AccessMode::Write, AccessMode::Copy, AccessMode::Replace];

    /// Wire name of this mode.
    pub fn wire_name(&self) -> &'static str {
        match self {
            AccessMode::Read => "READ",
            AccessMode::Write => "WRITE",
            AccessMode::Copy => "COPY",
            AccessMode::Replace => "REPLACE",
        }
    }

    /// Parse a mode from its wire name.
    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "READ" => Some(AccessMode::Read),
            "WRITE" => Some(AccessMode::Write),
            "COPY" => Some(AccessMode::Copy),
            "REPLACE" => Some(AccessMode::Replace),
            _ => None,
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for AccessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccessMode::from_wire_name(s).ok_or_else(|| format!("unknown access mode: {s}"))
    }
}

impl Serialize for AccessMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer {
        serializer.serialize_str(self.wire_name())
    }
}

impl<'de> Deserialize<'de> for AccessMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: Deserializer<'de> {
        struct ModeVisitor;

        impl<'de> serde::de::Visitor<'de> for ModeVisitor {
            type Value = AccessMode;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("an access mode name")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where E: serde::de::Error {
                AccessMode::from_wire_name(v).ok_or_else(|| E::custom(format!("unknown access mode: {v}")))
            }
        }

        deserializer.deserialize_str(ModeVisitor)
    }
}
