//! Binary codec for tabula.
//!
//! Every structured value tabula writes to disk or the wire is built from a
//! few primitives:
//!
//! - **Varints**: LEB128, seven payload bits per byte, high bit set on every
//!   byte but the last. Signed integers are zig-zag mapped first.
//! - **Unrolled decoding**: [`unrolled_decode_uvarint`] decodes without a
//!   loop-carried branch whenever ten bytes are available, and agrees with the
//!   byte-at-a-time [`decode_uvarint`] everywhere.
//! - **Floats**: an `f64` is written as an odd mantissa and a binary exponent,
//!   both zig-zag varints, so every finite value has exactly one encoding.
//! - **Cursors**: [`BinaryWriter`] and [`BinaryReader`] wrap the primitives
//!   plus big-endian fixed-width integers.

pub mod binary;
pub mod error;
pub mod float;
pub mod varint;

pub use binary::{BinaryReader, BinaryWriter};
pub use error::{CodecError, CodecResult};
pub use float::{decode_float, encode_float, float_to_mantissa_exp, mantissa_exp_to_float};
pub use varint::{
    decode_uvarint, decode_varint, encode_uvarint, encode_varint, unrolled_decode_uvarint,
    unrolled_decode_varint, uvarint_len, zigzag_decode, zigzag_encode, MAX_VARINT_LEN,
};
