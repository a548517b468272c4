use std::collections::HashSet;
use std::path::Path;

use bytes::Bytes;
use tabula_codec::BinaryWriter;
use tabula_types::{Address, ContentHasher};

use crate::error::{TableError, TableResult};
use crate::index::{IndexEntry, TableIndex};
use crate::record::encode_record;

/// A finished, immutable table file.
#[derive(Clone, Debug)]
pub struct TableFile {
    /// Name of the table, derived from its bytes.
    pub address: Address,
    pub chunk_count: u32,
    pub data: Bytes,
}

/// Builds a table file from a set of chunks.
pub struct TableWriter {
    chunks: Vec<(Address, Vec<u8>)>,
    seen: HashSet<Address>,
    level: i32,
}

impl TableWriter {
    pub fn new() -> Self {
        Self::with_compression_level(3)
    }

    /// Writer using the given zstd level for chunk records.
    pub fn with_compression_level(level: i32) -> Self {
        Self {
            chunks: Vec::new(),
            seen: HashSet::new(),
            level,
        }
    }

    /// Add a chunk, returning its address. Duplicate chunks are stored once.
    pub fn add(&mut self, data: &[u8]) -> Address {
        let address = Address::of(data);
        self.add_chunk(address, data);
        address
    }

    /// Add a chunk under a caller-computed address. Returns `false` if the
    /// address was already present.
    pub fn add_chunk(&mut self, address: Address, data: &[u8]) -> bool {
        if !self.seen.insert(address) {
            return false;
        }
        self.chunks.push((address, data.to_vec()));
        true
    }

    /// Number of distinct chunks queued.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Lay out records, index and footer in memory.
    pub fn finish(self) -> TableResult<TableFile> {
        let chunk_count =
            u32::try_from(self.chunks.len()).map_err(|_| TableError::TooManyChunks(self.chunks.len()))?;

        let mut w = BinaryWriter::new();
        let mut entries = Vec::with_capacity(self.chunks.len());
        let mut total_uncompressed = 0u64;

        for (address, data) in &self.chunks {
            let offset = w.len() as u64;
            let record = encode_record(data, self.level)?;
            let length = u32::try_from(record.len()).map_err(|_| TableError::ChunkTooLarge {
                address: *address,
                size: data.len(),
            })?;
            entries.push((
                *address,
                IndexEntry {
                    offset,
                    length,
                    checksum: crc32fast::hash(&record),
                },
            ));
            w.write_bytes(&record);
            total_uncompressed += data.len() as u64;
        }

        TableIndex::build(entries, total_uncompressed).encode(&mut w);
        let data = w.into_inner();
        let address = ContentHasher::TABLE.hash(&data);
        tracing::debug!(
            table = %address.short_hex(),
            chunks = chunk_count,
            bytes = data.len(),
            "table file built"
        );

        Ok(TableFile {
            address,
            chunk_count,
            data: Bytes::from(data),
        })
    }

    /// Build the table and write it to `dir/<address hex>`.
    pub fn write_to_dir(self, dir: &Path) -> TableResult<TableFile> {
        let table = self.finish()?;
        std::fs::write(dir.join(table.address.to_hex()), &table.data)?;
        Ok(table)
    }
}

impl Default for TableWriter {
    fn default() -> Self {
        Self::new()
    }
}
