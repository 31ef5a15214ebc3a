//! Record identifier.

use crate::error::StorageError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Five bytes chosen once per process.
static PROCESS_UNIQUE: Lazy<[u8; 5]> = Lazy::new(rand::random);

/// 24-bit counter, seeded randomly.
static COUNTER: Lazy<AtomicU32> = Lazy::new(|| AtomicU32::new(rand::random::<u32>() & 0x00ff_ffff));

/// Unique identifier of a single stored record.
///
/// Layout (12 bytes):
/// - 4 bytes: creation time, big-endian unix seconds
/// - 5 bytes: process-unique random value
/// - 3 bytes: big-endian counter
///
/// Identifiers roughly sort by creation time. They are never reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId([u8; 12]);

impl RecordId {
    /// Length of the hex representation.
    pub const HEX_LEN: usize = 24;

    /// Generates a fresh identifier.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        let count = COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Creates an identifier from raw bytes.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// Returns the creation time embedded in the identifier.
    #[must_use]
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Parses the 24-character hex form.
    ///
    /// Returns `None` for anything else, including the empty string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() != Self::HEX_LEN {
            return None;
        }

        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes).ok()?;
        Some(Self(bytes))
    }

    /// Returns the lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.to_hex())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for RecordId {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| StorageError::InvalidRecordId(s.to_string()))
    }
}

impl From<[u8; 12]> for RecordId {
    fn from(bytes: [u8; 12]) -> Self {
        Self::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_unique() {
        let a = RecordId::new();
        let b = RecordId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn hex_roundtrip() {
        let id = RecordId::new();
        let hex = id.to_hex();
        assert_eq!(hex.len(), RecordId::HEX_LEN);
        assert_eq!(RecordId::parse(&hex), Some(id));
        assert_eq!(RecordId::parse(&hex.to_uppercase()), Some(id));
    }

    #[test]
    fn malformed_hex_is_rejected() {
        assert_eq!(RecordId::parse(""), None);
        assert_eq!(RecordId::parse("not-an-id"), None);
        assert_eq!(RecordId::parse("zz0000000000000000000000"), None);
        assert_eq!(RecordId::parse("0000000000000000000000000"), None);
        assert_eq!(RecordId::parse("0000000000000000000000\u{e9}"), None);
        assert!("xyz".parse::<RecordId>().is_err());
    }

    #[test]
    fn embedded_timestamp_does_not_go_backwards() {
        let first = RecordId::new();
        let second = RecordId::new();
        assert!(first.timestamp() <= second.timestamp());
    }

    #[test]
    fn display_is_hex() {
        let id = RecordId::from_bytes([0xab; 12]);
        assert_eq!(format!("{id}"), "abababababababababababab");
    }
}
