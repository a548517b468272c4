//! Table files for tabula.
//!
//! A table file is an immutable container of chunks: compressed chunk
//! records, then an index sorted by chunk address, then a fixed-size footer.
//! Because the index size follows from the chunk count, a reader that knows
//! the count can bootstrap the whole index from one read of the file's tail.
//!
//! # Architecture
//!
//! - [`TableWriter`]: builds a table file from chunks
//! - [`TableIndex`]: parsed index + footer, fan-out table and binary search
//! - [`IndexCache`]: sharded LRU of parsed indexes keyed by table address
//! - [`TableReader`]: resolves addresses to chunks through any [`ReadAt`]
//!   source, coalescing nearby records into one read
//! - [`MemorySource`], [`FileSource`]: in-memory and memory-mapped sources

pub mod cache;
pub mod error;
pub mod format;
pub mod index;
pub mod reader;
pub mod record;
pub mod source;
pub mod writer;

pub use cache::{CacheStats, IndexCache, IndexCacheConfig};
pub use error::{TableError, TableResult};
pub use format::{index_size, tail_size, Footer, FOOTER_SIZE, FORMAT_VERSION, TABLE_MAGIC};
pub use index::{IndexEntry, TableIndex};
pub use reader::{TableReader, DEFAULT_BLOCK_SIZE};
pub use source::{FileSource, MemorySource, ReadAt};
pub use writer::{TableFile, TableWriter};
