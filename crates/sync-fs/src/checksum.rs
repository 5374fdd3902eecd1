//! Content fingerprints for change detection
//!
//! A fingerprint is a 32-bit FNV-1a hash of a file's raw bytes. It runs on
//! every file on every pass, so it is a single pass over the input with a
//! fixed-size accumulator. Collisions are an accepted risk: two files with
//! the same fingerprint are treated as identical content.

use std::fmt;

use serde::{Deserialize, Serialize};

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Fingerprint of a file's byte content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(u32);

impl Fingerprint {
    /// Fingerprint of zero-length content.
    pub const EMPTY: Fingerprint = Fingerprint(FNV_OFFSET_BASIS);

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Compute the fingerprint of `bytes`.
pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    Fingerprint(hash)
}
