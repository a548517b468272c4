use tabula_codec::{BinaryReader, BinaryWriter};
use tabula_types::Address;

use crate::error::{TableError, TableResult};
use crate::format::{index_size, Footer, FOOTER_SIZE};

/// Location of one chunk record inside a table file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    pub offset: u64,
    pub length: u32,
    /// CRC32 of the stored record.
    pub checksum: u32,
}

impl IndexEntry {
    /// One past the last byte of the record.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length as u64)
    }
}

/// Parsed index and footer of a table file.
///
/// Addresses are held sorted with parallel checksum/offset/length arrays, and
/// a 256-entry fan-out table narrows each lookup to the addresses sharing the
/// first byte before a binary search. An index is a pure function of its
/// table's bytes, so two parses of one table compare equal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableIndex {
    fan_out: [u32; 256],
    addresses: Vec<Address>,
    checksums: Vec<u32>,
    offsets: Vec<u64>,
    lengths: Vec<u32>,
    total_uncompressed: u64,
}

fn fan_out_of(addresses: &[Address]) -> [u32; 256] {
    let mut fan_out = [0u32; 256];
    for addr in addresses {
        fan_out[addr.prefix() as usize] += 1;
    }
    let mut running = 0;
    for slot in fan_out.iter_mut() {
        running += *slot;
        *slot = running;
    }
    fan_out
}

impl TableIndex {
    /// Build an index from `(address, entry)` pairs. Addresses must be unique.
    pub fn build(mut entries: Vec<(Address, IndexEntry)>, total_uncompressed: u64) -> Self {
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut addresses = Vec::with_capacity(entries.len());
        let mut checksums = Vec::with_capacity(entries.len());
        let mut offsets = Vec::with_capacity(entries.len());
        let mut lengths = Vec::with_capacity(entries.len());
        for (addr, entry) in &entries {
            addresses.push(*addr);
            checksums.push(entry.checksum);
            offsets.push(entry.offset);
            lengths.push(entry.length);
        }

        Self {
            fan_out: fan_out_of(&addresses),
            addresses,
            checksums,
            offsets,
            lengths,
            total_uncompressed,
        }
    }

    /// Parse the tail of a table file: exactly the index region followed by
    /// the footer.
    pub fn parse(tail: &[u8]) -> TableResult<Self> {
        let tail_len = tail.len() as u64;
        if tail_len < FOOTER_SIZE {
            return Err(TableError::CorruptIndex(format!(
                "tail of {tail_len} bytes cannot hold a footer"
            )));
        }
        let footer_start = (tail_len - FOOTER_SIZE) as usize;
        let footer = Footer::decode(&tail[footer_start..])?;

        let expected = index_size(footer.chunk_count);
        if footer.index_size != expected {
            return Err(TableError::CorruptIndex(format!(
                "footer declares index size {} but {} chunks need {expected}",
                footer.index_size, footer.chunk_count
            )));
        }
        if footer_start as u64 != expected {
            return Err(TableError::CorruptIndex(format!(
                "index region is {footer_start} bytes, footer declares {expected}"
            )));
        }

        let region = &tail[..footer_start];
        if crc32fast::hash(region) != footer.index_checksum {
            return Err(TableError::CorruptIndex("index checksum mismatch".into()));
        }

        let count = footer.chunk_count as usize;
        let mut r = BinaryReader::new(region);

        let mut fan_out = [0u32; 256];
        for slot in fan_out.iter_mut() {
            *slot = r.read_u32()?;
        }

        let mut addresses = Vec::with_capacity(count);
        for _ in 0..count {
            let addr = Address::from_hash(r.read_array()?);
            if let Some(prev) = addresses.last() {
                if *prev >= addr {
                    return Err(TableError::CorruptIndex(format!(
                        "addresses out of order at {addr}"
                    )));
                }
            }
            addresses.push(addr);
        }
        if fan_out != fan_out_of(&addresses) {
            return Err(TableError::CorruptIndex(
                "fan-out table disagrees with addresses".into(),
            ));
        }

        let mut checksums = Vec::with_capacity(count);
        for _ in 0..count {
            checksums.push(r.read_u32()?);
        }
        let mut offsets = Vec::with_capacity(count);
        for _ in 0..count {
            offsets.push(r.read_u64()?);
        }
        let mut lengths = Vec::with_capacity(count);
        for _ in 0..count {
            lengths.push(r.read_u32()?);
        }
        for ((addr, offset), length) in addresses.iter().zip(&offsets).zip(&lengths) {
            if offset.checked_add(*length as u64).is_none() {
                return Err(TableError::CorruptIndex(format!(
                    "record for {} overflows: offset {offset} + length {length}",
                    addr.short_hex()
                )));
            }
        }

        Ok(Self {
            fan_out,
            addresses,
            checksums,
            offsets,
            lengths,
            total_uncompressed: footer.total_uncompressed,
        })
    }

    /// Append the index region and footer.
    pub fn encode(&self, w: &mut BinaryWriter) {
        let mut region = BinaryWriter::with_capacity(index_size(self.count()) as usize);
        for &count in &self.fan_out {
            region.write_u32(count);
        }
        for addr in &self.addresses {
            region.write_bytes(addr.as_bytes());
        }
        for &checksum in &self.checksums {
            region.write_u32(checksum);
        }
        for &offset in &self.offsets {
            region.write_u64(offset);
        }
        for &length in &self.lengths {
            region.write_u32(length);
        }

        let footer = Footer {
            chunk_count: self.count(),
            index_size: region.len() as u64,
            total_uncompressed: self.total_uncompressed,
            index_checksum: crc32fast::hash(region.data()),
        };
        w.write_bytes(region.data());
        footer.encode(w);
    }

    /// Index region and footer as a standalone buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = BinaryWriter::new();
        self.encode(&mut w);
        w.into_inner()
    }

    /// Find a chunk's record. `None` means this table does not hold it.
    pub fn lookup(&self, addr: &Address) -> Option<IndexEntry> {
        let prefix = addr.prefix() as usize;
        let start = if prefix == 0 {
            0
        } else {
            self.fan_out[prefix - 1] as usize
        };
        let end = self.fan_out[prefix] as usize;

        let pos = start + self.addresses[start..end].binary_search(addr).ok()?;
        Some(IndexEntry {
            offset: self.offsets[pos],
            length: self.lengths[pos],
            checksum: self.checksums[pos],
        })
    }

    pub fn contains(&self, addr: &Address) -> bool {
        self.lookup(addr).is_some()
    }

    /// Chunk count as recorded in the footer.
    pub fn count(&self) -> u32 {
        self.addresses.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Sum of the uncompressed chunk sizes.
    pub fn total_uncompressed(&self) -> u64 {
        self.total_uncompressed
    }

    /// All addresses, ascending.
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    /// Entries in address order.
    pub fn entries(&self) -> impl Iterator<Item = (Address, IndexEntry)> + '_ {
        (0..self.addresses.len()).map(move |i| {
            (
                self.addresses[i],
                IndexEntry {
                    offset: self.offsets[i],
                    length: self.lengths[i],
                    checksum: self.checksums[i],
                },
            )
        })
    }

    /// Length of the record region, i.e. where the index starts in the file.
    pub fn data_len(&self) -> u64 {
        self.entries().map(|(_, e)| e.end()).max().unwrap_or(0)
    }
}
