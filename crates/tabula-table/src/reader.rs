use std::path::Path;
use std::sync::Arc;

use futures::future::try_join_all;
use tabula_types::Address;
use tracing::debug;

use crate::error::{TableError, TableResult};
use crate::format::{tail_size, Footer, FOOTER_SIZE};
use crate::index::{IndexEntry, TableIndex};
use crate::record::decode_record;
use crate::source::{FileSource, ReadAt};

/// Default gap under which neighbouring records are fetched in one read.
pub const DEFAULT_BLOCK_SIZE: u64 = 512 * 1024;

/// Resolves chunk addresses to chunk bytes through a [`TableIndex`] and a
/// random-access source.
#[derive(Debug)]
pub struct TableReader<S> {
    index: Arc<TableIndex>,
    source: S,
    block_size: u64,
}

/// One ranged read covering the records of several requested chunks.
#[derive(Debug)]
struct ReadGroup {
    offset: u64,
    length: u64,
    /// `(request position, address, entry)` for every chunk in the range.
    members: Vec<(usize, Address, IndexEntry)>,
}

impl ReadGroup {
    fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }
}

/// Group located records so that records whose gap is at most `block_size`
/// share one read.
fn plan_reads(mut located: Vec<(usize, Address, IndexEntry)>, block_size: u64) -> Vec<ReadGroup> {
    located.sort_by_key(|(_, _, entry)| entry.offset);

    let mut groups: Vec<ReadGroup> = Vec::new();
    for member in located {
        let entry = member.2;
        match groups.last_mut() {
            Some(group) if entry.offset <= group.end().saturating_add(block_size) => {
                let end = group.end().max(entry.end());
                group.length = end - group.offset;
                group.members.push(member);
            }
            _ => groups.push(ReadGroup {
                offset: entry.offset,
                length: entry.length as u64,
                members: vec![member],
            }),
        }
    }
    groups
}

impl<S: ReadAt> TableReader<S> {
    pub fn new(index: Arc<TableIndex>, source: S, block_size: u64) -> Self {
        Self {
            index,
            source,
            block_size,
        }
    }

    pub fn index(&self) -> &Arc<TableIndex> {
        &self.index
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Number of chunks in the table.
    pub fn count(&self) -> u32 {
        self.index.count()
    }

    pub fn has(&self, address: &Address) -> bool {
        self.index.contains(address)
    }

    pub fn addresses(&self) -> &[Address] {
        self.index.addresses()
    }

    pub fn total_uncompressed(&self) -> u64 {
        self.index.total_uncompressed()
    }

    /// Read one chunk. `Ok(None)` means the table does not hold it.
    pub async fn get(&self, address: &Address) -> Result<Option<Vec<u8>>, S::Error> {
        let Some(entry) = self.index.lookup(address) else {
            return Ok(None);
        };
        let record = self.read_exact(entry.offset, entry.length as u64).await?;
        Ok(Some(decode_record(address, &record, entry.checksum)?))
    }

    /// Read several chunks, coalescing nearby records into shared reads.
    ///
    /// The result is aligned with `addresses`; absent chunks are `None`.
    pub async fn get_many(&self, addresses: &[Address]) -> Result<Vec<Option<Vec<u8>>>, S::Error> {
        let located: Vec<_> = addresses
            .iter()
            .enumerate()
            .filter_map(|(i, addr)| self.index.lookup(addr).map(|entry| (i, *addr, entry)))
            .collect();
        let found = located.len();
        let groups = plan_reads(located, self.block_size);
        debug!(
            requested = addresses.len(),
            found,
            reads = groups.len(),
            "planned chunk reads"
        );

        let buffers = try_join_all(
            groups
                .iter()
                .map(|group| self.read_exact(group.offset, group.length)),
        )
        .await?;

        let mut results = vec![None; addresses.len()];
        for (group, buf) in groups.iter().zip(buffers) {
            for (pos, address, entry) in &group.members {
                let start = (entry.offset - group.offset) as usize;
                let record = buf
                    .get(start..start.saturating_add(entry.length as usize))
                    .ok_or(TableError::ShortRead {
                        offset: entry.offset,
                        expected: entry.length as usize,
                        actual: buf.len().saturating_sub(start),
                    })?;
                results[*pos] = Some(decode_record(address, record, entry.checksum)?);
            }
        }
        Ok(results)
    }

    async fn read_exact(&self, offset: u64, length: u64) -> Result<Vec<u8>, S::Error> {
        let mut buf = vec![0u8; length as usize];
        let n = self.source.read_at(&mut buf, offset).await?;
        if n != buf.len() {
            return Err(TableError::ShortRead {
                offset,
                expected: buf.len(),
                actual: n,
            }
            .into());
        }
        Ok(buf)
    }
}

impl TableReader<FileSource> {
    /// Open a table file on local disk, bootstrapping the index from its tail.
    pub async fn open(path: &Path, block_size: u64) -> TableResult<Self> {
        let source = FileSource::open(path)?;
        let len = source.len();

        let mut footer = [0u8; FOOTER_SIZE as usize];
        source.read_at(&mut footer, len - FOOTER_SIZE).await?;
        let chunk_count = Footer::decode(&footer)?.chunk_count;

        let tail_len = tail_size(chunk_count);
        if tail_len > len {
            return Err(TableError::CorruptIndex(format!(
                "{} chunks need a {tail_len} byte tail, file is {len} bytes",
                chunk_count
            )));
        }
        let mut tail = vec![0u8; tail_len as usize];
        source.read_at(&mut tail, len - tail_len).await?;
        let index = TableIndex::parse(&tail)?;
        debug!(path = %path.display(), chunks = chunk_count, "opened local table");

        Ok(Self::new(Arc::new(index), source, block_size))
    }
}
