use crate::error::{CodecError, CodecResult};

/// Longest LEB128 encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Map a signed integer onto an unsigned one: `2n` for `n >= 0`, `-2n - 1` otherwise.
pub const fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

pub const fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Number of bytes [`encode_uvarint`] writes for `value`.
pub const fn uvarint_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Append `value` as a minimal LEB128 varint. Returns the number of bytes written.
pub fn encode_uvarint(buf: &mut Vec<u8>, mut value: u64) -> usize {
    let start = buf.len();
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
    buf.len() - start
}

/// Append `value` zig-zag mapped and varint encoded.
pub fn encode_varint(buf: &mut Vec<u8>, value: i64) -> usize {
    encode_uvarint(buf, zigzag_encode(value))
}

/// Decode a varint one byte at a time. Returns `(value, bytes_consumed)`.
pub fn decode_uvarint(data: &[u8]) -> CodecResult<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0;
    for (i, &byte) in data.iter().enumerate() {
        // The tenth byte may only carry the top bit of a u64.
        if i == MAX_VARINT_LEN - 1 && byte > 1 {
            return Err(CodecError::VarintOverflow);
        }
        if byte < 0x80 {
            return Ok((value | (byte as u64) << shift, i + 1));
        }
        value |= ((byte & 0x7F) as u64) << shift;
        shift += 7;
    }
    Err(CodecError::TruncatedVarint)
}

pub fn decode_varint(data: &[u8]) -> CodecResult<(i64, usize)> {
    let (value, len) = decode_uvarint(data)?;
    Ok((zigzag_decode(value), len))
}

/// Decode a varint with the per-byte steps written out.
///
/// When at least [`MAX_VARINT_LEN`] bytes are available the bytes are read
/// from a fixed-size array, so each step is a single terminal check with no
/// bounds checks or loop counter. Shorter buffers (the tail of a record) fall
/// back to [`decode_uvarint`]. Both paths return identical results for every
/// input.
pub fn unrolled_decode_uvarint(data: &[u8]) -> CodecResult<(u64, usize)> {
    let Some(b) = data.first_chunk::<MAX_VARINT_LEN>() else {
        return decode_uvarint(data);
    };

    let mut value = b[0] as u64;
    if value < 0x80 {
        return Ok((value, 1));
    }
    value &= 0x7F;

    macro_rules! step {
        ($i:literal) => {
            let byte = b[$i] as u64;
            if byte < 0x80 {
                return Ok((value | byte << (7 * $i), $i + 1));
            }
            value |= (byte & 0x7F) << (7 * $i);
        };
    }

    step!(1);
    step!(2);
    step!(3);
    step!(4);
    step!(5);
    step!(6);
    step!(7);
    step!(8);

    let last = b[9] as u64;
    if last > 1 {
        return Err(CodecError::VarintOverflow);
    }
    Ok((value | last << 63, 10))
}

pub fn unrolled_decode_varint(data: &[u8]) -> CodecResult<(i64, usize)> {
    let (value, len) = unrolled_decode_uvarint(data)?;
    Ok((zigzag_decode(value), len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const MASKS: [u64; 8] = [
        0xFF,
        0xFFFF,
        0xFF_FFFF,
        0xFFFF_FFFF,
        0xFF_FFFF_FFFF,
        0xFFFF_FFFF_FFFF,
        0xFF_FFFF_FFFF_FFFF,
        0xFFFF_FFFF_FFFF_FFFF,
    ];

    /// Encode into a ten-byte scratch buffer so the unrolled path is taken.
    fn padded(value: u64) -> ([u8; MAX_VARINT_LEN], usize) {
        let mut buf = Vec::new();
        let len = encode_uvarint(&mut buf, value);
        let mut out = [0u8; MAX_VARINT_LEN];
        out[..len].copy_from_slice(&buf);
        (out, len)
    }

    #[test]
    fn small_values_are_one_byte() {
        let mut buf = Vec::new();
        assert_eq!(encode_uvarint(&mut buf, 0), 1);
        assert_eq!(encode_uvarint(&mut buf, 127), 1);
        assert_eq!(buf, vec![0, 127]);
    }

    #[test]
    fn known_encodings() {
        let mut buf = Vec::new();
        encode_uvarint(&mut buf, 300);
        assert_eq!(buf, vec![0xAC, 0x02]);

        buf.clear();
        encode_uvarint(&mut buf, u64::MAX);
        assert_eq!(buf.len(), MAX_VARINT_LEN);
        assert_eq!(buf[9], 0x01);
    }

    #[test]
    fn zigzag_mapping() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2), 3);
        assert_eq!(zigzag_encode(i64::MAX), u64::MAX - 1);
        assert_eq!(zigzag_encode(i64::MIN), u64::MAX);
        assert_eq!(zigzag_decode(u64::MAX), i64::MIN);
    }

    #[test]
    fn uvarint_len_matches_encoding() {
        for shift in 0..64 {
            let value = 1u64 << shift;
            let mut buf = Vec::new();
            assert_eq!(uvarint_len(value), encode_uvarint(&mut buf, value));
        }
        assert_eq!(uvarint_len(0), 1);
        assert_eq!(uvarint_len(u64::MAX), MAX_VARINT_LEN);
    }

    #[test]
    fn decode_truncated() {
        assert_eq!(decode_uvarint(&[0x80]), Err(CodecError::TruncatedVarint));
        assert_eq!(decode_uvarint(&[]), Err(CodecError::TruncatedVarint));
        assert_eq!(unrolled_decode_uvarint(&[0x80, 0x80]), Err(CodecError::TruncatedVarint));
    }

    #[test]
    fn decode_overflow() {
        let mut too_long = [0xFFu8; 11];
        too_long[10] = 0;
        assert_eq!(decode_uvarint(&too_long), Err(CodecError::VarintOverflow));
        assert_eq!(unrolled_decode_uvarint(&too_long), Err(CodecError::VarintOverflow));

        let mut tenth_too_big = [0xFFu8; 10];
        tenth_too_big[9] = 0x02;
        assert_eq!(decode_uvarint(&tenth_too_big), Err(CodecError::VarintOverflow));
        assert_eq!(unrolled_decode_uvarint(&tenth_too_big), Err(CodecError::VarintOverflow));
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let mut buf = [0xFFu8; 12];
        buf[0] = 0x05;
        assert_eq!(unrolled_decode_uvarint(&buf), Ok((5, 1)));
        assert_eq!(decode_uvarint(&buf[..3]), Ok((5, 1)));
    }

    #[test]
    fn unrolled_agrees_for_every_length() {
        let mut min = 0u64;
        for len in 1..=MAX_VARINT_LEN {
            let (buf, encoded) = padded(min);
            assert_eq!(encoded, len);
            assert_eq!(unrolled_decode_uvarint(&buf), Ok((min, len)));
            assert_eq!(decode_uvarint(&buf), Ok((min, len)));
            min = (min << 7) | 0x80;
        }
    }

    #[test]
    fn unrolled_agrees_with_canonical_on_random_values() {
        let mut rng = StdRng::seed_from_u64(0);
        for i in 0..100_000 {
            let expected = rng.gen::<u64>() & MASKS[i % 8];
            let (buf, size) = padded(expected);
            assert_eq!(unrolled_decode_uvarint(&buf), Ok((expected, size)));

            let signed = (rng.gen::<u64>() >> 1 & MASKS[i % 8]) as i64;
            for value in [signed, -signed] {
                let mut enc = Vec::new();
                let size = encode_varint(&mut enc, value);
                enc.resize(MAX_VARINT_LEN, 0);
                assert_eq!(unrolled_decode_varint(&enc), Ok((value, size)));
                assert_eq!(decode_varint(&enc), Ok((value, size)));
            }
        }
    }

    proptest! {
        #[test]
        fn uvarint_roundtrip(value in any::<u64>()) {
            let mut buf = Vec::new();
            let len = encode_uvarint(&mut buf, value);
            prop_assert_eq!(len, uvarint_len(value));
            prop_assert_eq!(decode_uvarint(&buf).unwrap(), (value, len));
            prop_assert_eq!(unrolled_decode_uvarint(&buf).unwrap(), (value, len));
        }

        #[test]
        fn varint_roundtrip(value in any::<i64>()) {
            let mut buf = Vec::new();
            let len = encode_varint(&mut buf, value);
            prop_assert_eq!(decode_varint(&buf).unwrap(), (value, len));
        }

        #[test]
        fn decoders_agree_on_arbitrary_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..16)) {
            prop_assert_eq!(decode_uvarint(&bytes), unrolled_decode_uvarint(&bytes));
        }
    }
}
