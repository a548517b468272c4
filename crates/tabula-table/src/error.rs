use tabula_codec::CodecError;
use tabula_types::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("invalid table magic: expected {expected}, got {actual}")]
    InvalidMagic { expected: String, actual: String },

    #[error("unsupported table version: {0}")]
    UnsupportedVersion(u32),

    #[error("corrupt table index: {0}")]
    CorruptIndex(String),

    #[error("checksum mismatch for chunk {address}")]
    ChecksumMismatch { address: Address },

    #[error("corrupt chunk record {address}: {reason}")]
    CorruptRecord { address: Address, reason: String },

    #[error("short read at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    #[error("table holds too many chunks: {0}")]
    TooManyChunks(usize),

    #[error("chunk {address} is too large for a table record: {size} bytes")]
    ChunkTooLarge { address: Address, size: usize },

    #[error("decompression failed: {0}")]
    Decompression(String),

    #[error("compression failed: {0}")]
    Compression(String),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TableResult<T> = Result<T, TableError>;
