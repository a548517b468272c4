use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tabula_table::{tail_size, Footer, IndexCache, ReadAt, TableIndex, TableReader, FOOTER_SIZE};
use tabula_types::Address;
use tracing::{debug, error, warn};

use crate::backoff::{retry_on_reset, BackoffPolicy, Sleeper, TokioSleeper};
use crate::cancel::CancelSignal;
use crate::client::{ByteRange, ObjectStoreClient};
use crate::error::{RemoteError, RemoteResult};
use crate::gate::RateLimitGate;

/// A table file stored as an object named by the table's address.
///
/// Every read is one ranged GET, admitted by the optional gate and retried
/// on connection reset.
pub struct RemoteTableSource {
    client: Arc<dyn ObjectStoreClient>,
    bucket: String,
    table: Address,
    key: String,
    gate: Option<RateLimitGate>,
    backoff: BackoffPolicy,
    sleeper: Arc<dyn Sleeper>,
    cancel: CancelSignal,
}

impl RemoteTableSource {
    pub fn new(client: Arc<dyn ObjectStoreClient>, bucket: impl Into<String>, table: Address) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            table,
            key: table.to_hex(),
            gate: None,
            backoff: BackoffPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            cancel: CancelSignal::never(),
        }
    }

    pub fn with_gate(mut self, gate: Option<RateLimitGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Abort retry loops once `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn table(&self) -> Address {
        self.table
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object key, the table address in hex.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Fetch `range`, which must come back as exactly `expected` bytes.
    pub async fn read_range(&self, range: ByteRange, expected: u64) -> RemoteResult<Bytes> {
        retry_on_reset(&self.backoff, self.sleeper.as_ref(), &self.cancel, move || {
            self.fetch(range, expected)
        })
        .await
    }

    async fn fetch(&self, range: ByteRange, expected: u64) -> RemoteResult<Bytes> {
        let _permit = match &self.gate {
            Some(gate) => Some(gate.acquire().await?),
            None => None,
        };

        let output = self
            .client
            .get_object(&self.bucket, &self.key, Some(range))
            .await
            .inspect_err(|err| {
                warn!(
                    bucket = %self.bucket,
                    key = %self.key,
                    range = %range,
                    error = %err,
                    "ranged read failed"
                );
            })?;

        if output.content_length != expected {
            error!(
                key = %self.key,
                range = %range,
                declared = output.content_length,
                "response length disagrees with requested range"
            );
            return Err(RemoteError::ContentLengthMismatch {
                requested: expected,
                declared: output.content_length,
            });
        }
        let actual = output.body.len() as u64;
        if actual != expected {
            warn!(key = %self.key, range = %range, actual, expected, "truncated response body");
            return Err(RemoteError::TruncatedBody { expected, actual });
        }
        Ok(output.body)
    }
}

impl fmt::Debug for RemoteTableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTableSource")
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .field("gate", &self.gate)
            .finish()
    }
}

#[async_trait]
impl ReadAt for RemoteTableSource {
    type Error = RemoteError;

    async fn read_at(&self, buf: &mut [u8], offset: u64) -> RemoteResult<usize> {
        let length = buf.len() as u64;
        if length > 0 && offset.checked_add(length - 1).is_none() {
            return Err(RemoteError::RangeOverflow {
                key: self.key.clone(),
                offset,
                length,
            });
        }
        let Some(range) = ByteRange::at(offset, length) else {
            return Ok(0);
        };
        let body = self.read_range(range, buf.len() as u64).await?;
        buf.copy_from_slice(&body);
        Ok(body.len())
    }
}

/// Reads chunks out of one table file in an object store.
#[derive(Debug)]
pub struct RemoteTableReader {
    table: Address,
    inner: TableReader<RemoteTableSource>,
}

fn check_chunk_count(table: Address, expected: u32, actual: u32) -> RemoteResult<()> {
    if expected == actual {
        return Ok(());
    }
    error!(
        table = %table.short_hex(),
        expected,
        actual,
        "table chunk count disagrees with caller"
    );
    Err(RemoteError::ChunkCountMismatch {
        table,
        expected,
        actual,
    })
}

impl RemoteTableReader {
    /// Open the table behind `source`, which the caller says holds
    /// `chunk_count` chunks.
    ///
    /// A cached index costs no network traffic. Otherwise the index and
    /// footer are fetched with one suffix read and added to `cache`.
    pub async fn open(
        source: RemoteTableSource,
        chunk_count: u32,
        cache: Option<&IndexCache>,
        block_size: u64,
    ) -> RemoteResult<Self> {
        let table = source.table();
        let index = match cache.and_then(|cache| cache.get(&table)) {
            Some(index) => index,
            None => {
                let size = tail_size(chunk_count);
                let tail = source.read_range(ByteRange::Suffix(size), size).await?;

                let footer = Footer::decode(&tail[tail.len() - FOOTER_SIZE as usize..])?;
                check_chunk_count(table, chunk_count, footer.chunk_count)?;

                let index = Arc::new(TableIndex::parse(&tail)?);
                if let Some(cache) = cache {
                    cache.put(table, Arc::clone(&index));
                }
                debug!(
                    table = %table.short_hex(),
                    chunks = chunk_count,
                    tail_bytes = size,
                    "bootstrapped table index"
                );
                index
            }
        };
        check_chunk_count(table, chunk_count, index.count())?;

        Ok(Self {
            table,
            inner: TableReader::new(index, source, block_size),
        })
    }

    /// Address of the table, also its object key.
    pub fn table(&self) -> Address {
        self.table
    }

    pub fn index(&self) -> &Arc<TableIndex> {
        self.inner.index()
    }

    pub fn source(&self) -> &RemoteTableSource {
        self.inner.source()
    }

    pub fn count(&self) -> u32 {
        self.inner.count()
    }

    pub fn has(&self, address: &Address) -> bool {
        self.inner.has(address)
    }

    pub async fn get(&self, address: &Address) -> RemoteResult<Option<Vec<u8>>> {
        self.inner.get(address).await
    }

    /// Fetch several chunks with as few ranged reads as the block size
    /// allows. Results line up with `addresses`.
    pub async fn get_many(&self, addresses: &[Address]) -> RemoteResult<Vec<Option<Vec<u8>>>> {
        self.inner.get_many(addresses).await
    }
}
