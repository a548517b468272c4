use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Byte length of an [`Address`].
pub const ADDRESS_LEN: usize = 32;

/// Content-addressed name of a chunk or a table file.
///
/// A chunk's address is the BLAKE3 hash of its bytes. Table files are named
/// the same way (see [`ContentHasher::TABLE`](crate::ContentHasher::TABLE)),
/// and the hex form of a table's address is its object key in a bucket.
/// Addresses order bytewise, which is the order table indexes are sorted in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// Compute the address of a chunk's bytes.
    pub fn of(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Wrap a pre-computed hash.
    pub const fn from_hash(hash: [u8; ADDRESS_LEN]) -> Self {
        Self(hash)
    }

    /// Build an address from a slice that must be exactly [`ADDRESS_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|_| TypeError::InvalidLength {
            expected: ADDRESS_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// The all-zero address.
    pub const fn zero() -> Self {
        Self([0u8; ADDRESS_LEN])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// First byte, used to select a fan-out bucket in a table index.
    pub fn prefix(&self) -> u8 {
        self.0[0]
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.short_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<Address> for [u8; ADDRESS_LEN] {
    fn from(addr: Address) -> Self {
        addr.0
    }
}
