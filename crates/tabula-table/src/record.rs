use tabula_codec::{BinaryReader, BinaryWriter};
use tabula_types::Address;

use crate::error::{TableError, TableResult};

/// Encode a chunk as a table record: `uvarint(len) ++ zstd(data)`.
pub fn encode_record(data: &[u8], level: i32) -> TableResult<Vec<u8>> {
    let compressed =
        zstd::encode_all(data, level).map_err(|e| TableError::Compression(e.to_string()))?;
    let mut w = BinaryWriter::with_capacity(compressed.len() + 10);
    w.write_uvarint(data.len() as u64);
    w.write_bytes(&compressed);
    Ok(w.into_inner())
}

/// Verify and decode a record read back from a table file.
pub fn decode_record(address: &Address, record: &[u8], checksum: u32) -> TableResult<Vec<u8>> {
    if crc32fast::hash(record) != checksum {
        return Err(TableError::ChecksumMismatch { address: *address });
    }

    let mut r = BinaryReader::new(record);
    let expected_len = r.read_uvarint().map_err(|e| TableError::CorruptRecord {
        address: *address,
        reason: e.to_string(),
    })?;

    let data = zstd::decode_all(r.rest()).map_err(|e| TableError::Decompression(e.to_string()))?;
    if data.len() as u64 != expected_len {
        return Err(TableError::CorruptRecord {
            address: *address,
            reason: format!("size mismatch: expected {expected_len}, got {}", data.len()),
        });
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_roundtrip() {
        let data = b"chunk payload".repeat(20);
        let record = encode_record(&data, 3).unwrap();
        let addr = Address::of(&data);
        let decoded = decode_record(&addr, &record, crc32fast::hash(&record)).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn empty_chunk() {
        let record = encode_record(b"", 3).unwrap();
        assert_eq!(record[0], 0);
        let decoded = decode_record(&Address::of(b""), &record, crc32fast::hash(&record)).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn checksum_mismatch() {
        let record = encode_record(b"data", 3).unwrap();
        let addr = Address::of(b"data");
        let err = decode_record(&addr, &record, crc32fast::hash(&record) ^ 1).unwrap_err();
        assert!(matches!(err, TableError::ChecksumMismatch { address } if address == addr));
    }

    #[test]
    fn length_prefix_mismatch() {
        let mut record = encode_record(b"data", 3).unwrap();
        record[0] = 9;
        let addr = Address::of(b"data");
        let err = decode_record(&addr, &record, crc32fast::hash(&record)).unwrap_err();
        assert!(matches!(err, TableError::CorruptRecord { .. }));
    }

    #[test]
    fn garbage_payload() {
        let record = vec![4, 1, 2, 3, 4];
        let err = decode_record(&Address::zero(), &record, crc32fast::hash(&record)).unwrap_err();
        assert!(matches!(err, TableError::Decompression(_)));
    }
}
