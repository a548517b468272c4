use crate::error::{CodecError, CodecResult};
use crate::varint::{decode_varint, encode_varint};

const FRACTION_BITS: u32 = 52;
const FRACTION_MASK: u64 = (1 << FRACTION_BITS) - 1;
const EXPONENT_BIAS: i32 = 1075;
const MIN_EXPONENT: i32 = -1074;

/// Split a finite `f64` into `(mantissa, exponent)` with
/// `value == mantissa * 2^exponent`.
///
/// The mantissa is odd, or zero for `0.0`, which makes the pair unique per
/// value. `-0.0` maps to `(0, 0)` like `+0.0`.
pub fn float_to_mantissa_exp(value: f64) -> CodecResult<(i64, i32)> {
    if !value.is_finite() {
        return Err(CodecError::NonFinite(value));
    }
    if value == 0.0 {
        return Ok((0, 0));
    }

    let bits = value.to_bits();
    let biased = ((bits >> FRACTION_BITS) & 0x7FF) as i32;
    let fraction = bits & FRACTION_MASK;
    let (mut mantissa, mut exponent) = if biased == 0 {
        (fraction, MIN_EXPONENT)
    } else {
        (fraction | 1 << FRACTION_BITS, biased - EXPONENT_BIAS)
    };

    let shift = mantissa.trailing_zeros();
    mantissa >>= shift;
    exponent += shift as i32;

    let mantissa = mantissa as i64;
    Ok((if value.is_sign_negative() { -mantissa } else { mantissa }, exponent))
}

/// Inverse of [`float_to_mantissa_exp`]; exact for every pair it produces.
pub fn mantissa_exp_to_float(mantissa: i64, exponent: i32) -> f64 {
    scale_by_pow2(mantissa as f64, exponent)
}

/// `2^exp` for exponents in the normal range.
fn pow2(exp: i32) -> f64 {
    debug_assert!((-1022..=1023).contains(&exp));
    f64::from_bits(((exp + 1023) as u64) << FRACTION_BITS)
}

/// Multiply by `2^exp` in steps that stay inside the normal range, so a result
/// that is representable is produced without rounding.
fn scale_by_pow2(mut value: f64, mut exp: i32) -> f64 {
    while exp > 1023 {
        value *= pow2(1023);
        exp -= 1023;
        if value.is_infinite() {
            return value;
        }
    }
    while exp < -1022 {
        value *= pow2(-1022);
        exp += 1022;
        if value == 0.0 {
            return value;
        }
    }
    value * pow2(exp)
}

/// Append `value` as two zig-zag varints: mantissa, then exponent.
pub fn encode_float(buf: &mut Vec<u8>, value: f64) -> CodecResult<usize> {
    let (mantissa, exponent) = float_to_mantissa_exp(value)?;
    let written = encode_varint(buf, mantissa) + encode_varint(buf, exponent as i64);
    Ok(written)
}

/// Decode a float written by [`encode_float`]. Returns `(value, bytes_consumed)`.
pub fn decode_float(data: &[u8]) -> CodecResult<(f64, usize)> {
    let (mantissa, m_len) = decode_varint(data)?;
    let (exponent, e_len) = decode_varint(&data[m_len..])?;
    let exponent =
        i32::try_from(exponent).map_err(|_| CodecError::ExponentOutOfRange(exponent))?;
    Ok((mantissa_exp_to_float(mantissa, exponent), m_len + e_len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encoded(value: f64) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_float(&mut buf, value).unwrap();
        buf
    }

    // Zig-zag: 2n for n >= 0, 2(-n) - 1 for n < 0.
    #[test]
    fn write_vectors() {
        assert_eq!(encoded(0.0), vec![0, 0]); //   0 * 2^0
        assert_eq!(encoded(1.0), vec![2, 0]); //   1 * 2^0
        assert_eq!(encoded(2.0), vec![2, 2]); //   1 * 2^1
        assert_eq!(encoded(-2.0), vec![1, 2]); // -1 * 2^1
        assert_eq!(encoded(0.5), vec![2, 1]); //   1 * 2^-1
        assert_eq!(encoded(-0.5), vec![1, 1]); // -1 * 2^-1
        assert_eq!(encoded(0.25), vec![2, 3]); //  1 * 2^-2
        assert_eq!(encoded(3.0), vec![6, 0]); // 0b11 * 2^0
        assert_eq!(encoded(15.0), vec![30, 0]);
        assert_eq!(encoded(256.0), vec![2, 16]); // 1 * 2^8
        assert_eq!(encoded(-15.0), vec![29, 0]);
    }

    #[test]
    fn read_vectors() {
        let cases: [(&[u8], f64); 11] = [
            (&[0, 0], 0.0),
            (&[2, 0], 1.0),
            (&[2, 2], 2.0),
            (&[1, 2], -2.0),
            (&[2, 1], 0.5),
            (&[1, 1], -0.5),
            (&[2, 3], 0.25),
            (&[6, 0], 3.0),
            (&[30, 0], 15.0),
            (&[2, 16], 256.0),
            (&[29, 0], -15.0),
        ];
        for (data, expected) in cases {
            let (value, consumed) = decode_float(data).unwrap();
            assert_eq!(value, expected);
            assert_eq!(consumed, data.len());
        }
    }

    #[test]
    fn negative_zero_encodes_as_zero() {
        assert_eq!(encoded(-0.0), vec![0, 0]);
    }

    #[test]
    fn non_finite_is_rejected() {
        let mut buf = Vec::new();
        assert!(matches!(
            encode_float(&mut buf, f64::NAN),
            Err(CodecError::NonFinite(_))
        ));
        assert_eq!(
            encode_float(&mut buf, f64::INFINITY),
            Err(CodecError::NonFinite(f64::INFINITY))
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn extremes_roundtrip() {
        for value in [
            f64::MAX,
            f64::MIN,
            f64::MIN_POSITIVE,
            f64::EPSILON,
            f64::from_bits(1),
            -f64::from_bits(1),
            f64::from_bits(FRACTION_MASK),
        ] {
            let (decoded, _) = decode_float(&encoded(value)).unwrap();
            assert_eq!(decoded.to_bits(), value.to_bits(), "value {value:e}");
        }
    }

    #[test]
    fn mantissa_is_odd() {
        let (m, e) = float_to_mantissa_exp(96.0).unwrap();
        assert_eq!((m, e), (3, 5));
        let (m, e) = float_to_mantissa_exp(f64::from_bits(1)).unwrap();
        assert_eq!((m, e), (1, -1074));
    }

    #[test]
    fn exponent_out_of_range() {
        let mut buf = Vec::new();
        encode_varint(&mut buf, 1);
        encode_varint(&mut buf, i64::from(i32::MAX) + 1);
        assert!(matches!(
            decode_float(&buf),
            Err(CodecError::ExponentOutOfRange(_))
        ));
    }

    #[test]
    fn truncated_float() {
        assert_eq!(decode_float(&[2]), Err(CodecError::TruncatedVarint));
    }

    proptest! {
        #[test]
        fn roundtrip_is_bit_exact(bits in any::<u64>()) {
            let value = f64::from_bits(bits);
            prop_assume!(value.is_finite() && value != 0.0);
            let first = encoded(value);
            prop_assert_eq!(&first, &encoded(value));
            let (decoded, consumed) = decode_float(&first).unwrap();
            prop_assert_eq!(decoded.to_bits(), bits);
            prop_assert_eq!(consumed, first.len());
        }
    }
}
