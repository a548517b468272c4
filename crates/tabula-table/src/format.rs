//! On-disk layout of a table file.
//!
//! ```text
//! [chunk record]*   uvarint(uncompressed_len) ++ zstd(payload)
//! [index]           fan-out   256 x u32
//!                   addresses n x [u8; 32]   strictly ascending
//!                   checksums n x u32        CRC32 of each record
//!                   offsets   n x u64
//!                   lengths   n x u32
//! [footer]          chunk_count u32 | index_size u64 | total_uncompressed u64
//!                   | index_checksum u32 | version u32 | magic "TBLF"
//! ```
//!
//! The index size is a function of the chunk count alone, so a reader that
//! knows how many chunks a table holds can fetch index and footer with a
//! single read of the file's tail.

use tabula_codec::{BinaryReader, BinaryWriter};
use tabula_types::ADDRESS_LEN;

use crate::error::{TableError, TableResult};

pub const TABLE_MAGIC: &[u8; 4] = b"TBLF";
pub const FORMAT_VERSION: u32 = 1;

pub const FOOTER_SIZE: u64 = 32;
pub const FAN_OUT_SIZE: u64 = 256 * 4;
/// Address, checksum, offset and length of one chunk.
pub const INDEX_ENTRY_SIZE: u64 = ADDRESS_LEN as u64 + 4 + 8 + 4;

/// Byte size of the index region for `chunk_count` chunks.
pub const fn index_size(chunk_count: u32) -> u64 {
    FAN_OUT_SIZE + chunk_count as u64 * INDEX_ENTRY_SIZE
}

/// Bytes from the end of a table file that hold its index and footer.
pub const fn tail_size(chunk_count: u32) -> u64 {
    index_size(chunk_count) + FOOTER_SIZE
}

/// Fixed-size trailer of a table file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Footer {
    pub chunk_count: u32,
    pub index_size: u64,
    pub total_uncompressed: u64,
    /// CRC32 of the index region.
    pub index_checksum: u32,
}

impl Footer {
    pub fn encode(&self, w: &mut BinaryWriter) {
        w.write_u32(self.chunk_count);
        w.write_u64(self.index_size);
        w.write_u64(self.total_uncompressed);
        w.write_u32(self.index_checksum);
        w.write_u32(FORMAT_VERSION);
        w.write_bytes(TABLE_MAGIC);
    }

    /// Decode exactly [`FOOTER_SIZE`] bytes.
    pub fn decode(data: &[u8]) -> TableResult<Self> {
        if data.len() as u64 != FOOTER_SIZE {
            return Err(TableError::CorruptIndex(format!(
                "footer must be {FOOTER_SIZE} bytes, got {}",
                data.len()
            )));
        }
        let magic = &data[data.len() - 4..];
        if magic != TABLE_MAGIC {
            return Err(TableError::InvalidMagic {
                expected: String::from_utf8_lossy(TABLE_MAGIC).into(),
                actual: String::from_utf8_lossy(magic).into(),
            });
        }

        let mut r = BinaryReader::new(data);
        let chunk_count = r.read_u32()?;
        let index_size = r.read_u64()?;
        let total_uncompressed = r.read_u64()?;
        let index_checksum = r.read_u32()?;
        let version = r.read_u32()?;
        if version != FORMAT_VERSION {
            return Err(TableError::UnsupportedVersion(version));
        }

        Ok(Self {
            chunk_count,
            index_size,
            total_uncompressed,
            index_checksum,
        })
    }
}
