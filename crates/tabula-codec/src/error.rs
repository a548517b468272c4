use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error("truncated varint")]
    TruncatedVarint,

    #[error("varint overflows 64 bits")]
    VarintOverflow,

    #[error("cannot encode non-finite float {0}")]
    NonFinite(f64),

    #[error("float exponent out of range: {0}")]
    ExponentOutOfRange(i64),

    #[error("unexpected end of buffer: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },
}

pub type CodecResult<T> = Result<T, CodecError>;
