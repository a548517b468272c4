use std::fs::File;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use memmap2::Mmap;

use crate::error::{TableError, TableResult};
use crate::format::FOOTER_SIZE;

/// Random-access byte source a [`TableReader`](crate::TableReader) reads
/// chunk records from.
///
/// Implementations must be safe to call concurrently. Each source keeps its
/// own error type so callers can tell a corrupt record (converted from
/// [`TableError`]) from a failure specific to the source, such as a network
/// error.
#[async_trait]
pub trait ReadAt: Send + Sync {
    type Error: std::error::Error + From<TableError> + Send + Sync + 'static;

    /// Fill `buf` with the bytes starting at `offset` and return how many were
    /// read. A count below `buf.len()` means the source ended early.
    async fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, Self::Error>;
}

fn copy_from(data: &[u8], buf: &mut [u8], offset: u64) -> usize {
    let Ok(start) = usize::try_from(offset) else {
        return 0;
    };
    if start >= data.len() {
        return 0;
    }
    let n = buf.len().min(data.len() - start);
    buf[..n].copy_from_slice(&data[start..start + n]);
    n
}

/// A table file held in memory.
#[derive(Clone, Debug)]
pub struct MemorySource {
    data: Bytes,
}

impl MemorySource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn bytes(&self) -> &Bytes {
        &self.data
    }
}

#[async_trait]
impl ReadAt for MemorySource {
    type Error = TableError;

    async fn read_at(&self, buf: &mut [u8], offset: u64) -> TableResult<usize> {
        Ok(copy_from(&self.data, buf, offset))
    }
}

/// A table file on local disk, memory-mapped read-only.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    mmap: Mmap,
}

impl FileSource {
    pub fn open(path: &Path) -> TableResult<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        if len < FOOTER_SIZE {
            return Err(TableError::CorruptIndex(format!(
                "{} is {len} bytes, too short for a table file",
                path.display()
            )));
        }
        // SAFETY: table files are immutable once written; nothing truncates or
        // rewrites a file while it is mapped.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            path: path.to_path_buf(),
            mmap,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.mmap.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }
}

#[async_trait]
impl ReadAt for FileSource {
    type Error = TableError;

    async fn read_at(&self, buf: &mut [u8], offset: u64) -> TableResult<usize> {
        Ok(copy_from(&self.mmap, buf, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_source_reads_ranges() {
        let source = MemorySource::new(b"hello world".to_vec());
        let mut buf = [0u8; 5];
        assert_eq!(source.read_at(&mut buf, 6).await.unwrap(), 5);
        assert_eq!(&buf, b"world");
        assert_eq!(source.len(), 11);
    }

    #[tokio::test]
    async fn memory_source_short_at_end() {
        let source = MemorySource::new(Bytes::from_static(b"abc"));
        let mut buf = [0u8; 4];
        assert_eq!(source.read_at(&mut buf, 1).await.unwrap(), 2);
        assert_eq!(source.read_at(&mut buf, 3).await.unwrap(), 0);
        assert_eq!(source.read_at(&mut buf, u64::MAX).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn file_source_reads_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table");
        std::fs::write(&path, vec![7u8; 64]).unwrap();

        let source = FileSource::open(&path).unwrap();
        assert_eq!(source.len(), 64);
        assert_eq!(source.path(), path.as_path());
        let mut buf = [0u8; 8];
        assert_eq!(source.read_at(&mut buf, 60).await.unwrap(), 4);
        assert_eq!(&buf[..4], &[7, 7, 7, 7]);
    }

    #[test]
    fn file_source_rejects_tiny_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny");
        std::fs::write(&path, b"x").unwrap();
        let err = FileSource::open(&path).unwrap_err();
        assert!(matches!(err, TableError::CorruptIndex(_)));
    }

    #[test]
    fn file_source_missing_file() {
        let err = FileSource::open(Path::new("/nonexistent/table")).unwrap_err();
        assert!(matches!(err, TableError::Io(_)));
    }
}
