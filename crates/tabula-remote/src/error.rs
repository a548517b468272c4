use std::io;

use tabula_table::TableError;
use tabula_types::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("object not found: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    #[error("invalid range {range} for {key} ({object_size} bytes)")]
    InvalidRange {
        key: String,
        range: String,
        object_size: u64,
    },

    #[error("read of {length} bytes at {offset} in {key} runs past the end of the address space")]
    RangeOverflow { key: String, offset: u64, length: u64 },

    #[error("unknown multipart upload: {0}")]
    UnknownUpload(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("object store error: {0}")]
    Service(String),

    #[error("content length mismatch: requested {requested} bytes, response declares {declared}")]
    ContentLengthMismatch { requested: u64, declared: u64 },

    #[error("truncated response body: expected {expected} bytes, got {actual}")]
    TruncatedBody { expected: u64, actual: u64 },

    #[error("table error: {0}")]
    Table(#[from] TableError),

    #[error("table {table} holds {actual} chunks, caller expected {expected}")]
    ChunkCountMismatch {
        table: Address,
        expected: u32,
        actual: u32,
    },

    #[error("rate-limit gate closed")]
    GateClosed,

    #[error("operation cancelled")]
    Cancelled,
}

impl RemoteError {
    /// Whether the peer reset the connection, the only failure a ranged
    /// read retries.
    pub fn is_connection_reset(&self) -> bool {
        matches!(self, RemoteError::Io(err) if err.kind() == io::ErrorKind::ConnectionReset)
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_connection_reset_is_transient() {
        let reset = RemoteError::Io(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(reset.is_connection_reset());

        let refused = RemoteError::Io(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(!refused.is_connection_reset());
        assert!(!RemoteError::Service("throttled".into()).is_connection_reset());
        assert!(!RemoteError::TruncatedBody {
            expected: 4,
            actual: 2
        }
        .is_connection_reset());
    }

    #[test]
    fn table_errors_convert() {
        let err: RemoteError = TableError::UnsupportedVersion(9).into();
        assert!(matches!(err, RemoteError::Table(TableError::UnsupportedVersion(9))));
        assert_eq!(err.to_string(), "table error: unsupported table version: 9");
    }
}
