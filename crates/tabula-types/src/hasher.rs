use crate::address::Address;

/// Domain-separated BLAKE3 content hasher.
///
/// The domain tag is prepended to every hash computation so that a table
/// file can never share an address with a chunk holding identical bytes.
/// Chunks themselves are addressed with the plain hash, [`Address::of`].
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher that names table files from their complete bytes.
    pub const TABLE: Self = Self {
        domain: "tabula-table-v1",
    };

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Address {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        Address::from_hash(*hasher.finalize().as_bytes())
    }

    /// Verify that data produces the expected address.
    pub fn verify(&self, data: &[u8], expected: &Address) -> bool {
        self.hash(data) == *expected
    }
}
