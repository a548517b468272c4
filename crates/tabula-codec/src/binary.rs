use crate::error::{CodecError, CodecResult};
use crate::float::{decode_float, encode_float};
use crate::varint::{encode_uvarint, encode_varint, unrolled_decode_uvarint, zigzag_decode};

/// Append-only byte buffer with typed writes.
///
/// Fixed-width integers are big-endian.
#[derive(Clone, Debug, Default)]
pub struct BinaryWriter {
    buf: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_uvarint(&mut self, value: u64) -> usize {
        encode_uvarint(&mut self.buf, value)
    }

    pub fn write_varint(&mut self, value: i64) -> usize {
        encode_varint(&mut self.buf, value)
    }

    /// Write a finite float. The buffer is left untouched on error.
    pub fn write_float(&mut self, value: f64) -> CodecResult<usize> {
        encode_float(&mut self.buf, value)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes written so far.
    pub fn data(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over a borrowed buffer, the read-side counterpart of [`BinaryWriter`].
#[derive(Clone, Debug)]
pub struct BinaryReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Everything not yet consumed.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.offset..]
    }

    pub fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(CodecError::UnexpectedEof {
                needed: len,
                remaining,
            });
        }
        let bytes = &self.buf[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u32(&mut self) -> CodecResult<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> CodecResult<u64> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    pub fn read_uvarint(&mut self) -> CodecResult<u64> {
        let (value, len) = unrolled_decode_uvarint(self.rest())?;
        self.offset += len;
        Ok(value)
    }

    pub fn read_varint(&mut self) -> CodecResult<i64> {
        Ok(zigzag_decode(self.read_uvarint()?))
    }

    pub fn read_float(&mut self) -> CodecResult<f64> {
        let (value, len) = decode_float(self.rest())?;
        self.offset += len;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_fields_roundtrip() {
        let mut w = BinaryWriter::new();
        w.write_u8(7);
        w.write_u32(0xDEAD_BEEF);
        w.write_u64(u64::MAX - 1);
        w.write_uvarint(300);
        w.write_varint(-12345);
        w.write_float(-0.25).unwrap();
        w.write_bytes(b"tail");

        let data = w.into_inner();
        let mut r = BinaryReader::new(&data);
        assert_eq!(r.read_u8().unwrap(), 7);
        assert_eq!(r.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(r.read_u64().unwrap(), u64::MAX - 1);
        assert_eq!(r.read_uvarint().unwrap(), 300);
        assert_eq!(r.read_varint().unwrap(), -12345);
        assert_eq!(r.read_float().unwrap(), -0.25);
        assert_eq!(r.read_bytes(4).unwrap(), b"tail");
        assert!(r.is_empty());
        assert_eq!(r.offset(), data.len());
    }

    #[test]
    fn fixed_width_is_big_endian() {
        let mut w = BinaryWriter::with_capacity(4);
        w.write_u32(1);
        assert_eq!(w.data(), &[0, 0, 0, 1]);
        assert_eq!(w.len(), 4);
    }

    #[test]
    fn float_offset_matches_encoding() {
        let mut w = BinaryWriter::new();
        w.write_float(256.0).unwrap();
        let data = w.into_inner();
        let mut r = BinaryReader::new(&data);
        assert_eq!(r.read_float().unwrap(), 256.0);
        assert_eq!(r.offset(), 2);
    }

    #[test]
    fn failed_float_write_leaves_buffer_alone() {
        let mut w = BinaryWriter::new();
        assert!(w.write_float(f64::NAN).is_err());
        assert!(w.is_empty());
    }

    #[test]
    fn reading_past_end_fails() {
        let mut r = BinaryReader::new(&[1, 2]);
        assert_eq!(
            r.read_u32(),
            Err(CodecError::UnexpectedEof {
                needed: 4,
                remaining: 2
            })
        );
        assert_eq!(r.offset(), 0);
        assert_eq!(r.read_bytes(2).unwrap(), &[1, 2]);
        assert_eq!(r.read_uvarint(), Err(CodecError::TruncatedVarint));
    }
}
