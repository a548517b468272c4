use std::sync::Arc;

use tabula_table::{tail_size, IndexCache, TableError, TableFile, TableIndex};
use tabula_types::Address;

use crate::backoff::{BackoffPolicy, Sleeper, TokioSleeper};
use crate::cancel::CancelSignal;
use crate::client::ObjectStoreClient;
use crate::config::RemoteConfig;
use crate::error::RemoteResult;
use crate::gate::RateLimitGate;
use crate::persister::RemoteTablePersister;
use crate::reader::{RemoteTableReader, RemoteTableSource};

/// Table files in one object-store bucket.
///
/// Every reader opened here shares the store's index cache and rate-limit
/// gate. Stores built from separate configs share nothing unless given the
/// same cache or gate explicitly.
pub struct RemoteTableStore {
    client: Arc<dyn ObjectStoreClient>,
    bucket: String,
    block_size: u64,
    cache: Arc<IndexCache>,
    gate: Option<RateLimitGate>,
    backoff: BackoffPolicy,
    sleeper: Arc<dyn Sleeper>,
    persister: RemoteTablePersister,
}

impl RemoteTableStore {
    pub fn new(client: Arc<dyn ObjectStoreClient>, config: &RemoteConfig) -> Self {
        Self {
            persister: RemoteTablePersister::new(client.clone(), config.bucket.clone(), config.part_size),
            client,
            bucket: config.bucket.clone(),
            block_size: config.block_size,
            cache: Arc::new(IndexCache::new(&config.index_cache)),
            gate: config.max_concurrent_reads.map(RateLimitGate::new),
            backoff: config.backoff.clone(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Share an index cache with other stores.
    pub fn with_cache(mut self, cache: Arc<IndexCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Share a rate-limit gate with other stores, or drop the gate.
    pub fn with_gate(mut self, gate: Option<RateLimitGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn cache(&self) -> &Arc<IndexCache> {
        &self.cache
    }

    pub fn gate(&self) -> Option<&RateLimitGate> {
        self.gate.as_ref()
    }

    /// A byte source over the object holding `table`.
    pub fn source(&self, table: Address) -> RemoteTableSource {
        RemoteTableSource::new(self.client.clone(), self.bucket.clone(), table)
            .with_gate(self.gate.clone())
            .with_backoff(self.backoff.clone())
            .with_sleeper(self.sleeper.clone())
    }

    /// Open a reader for `table`, which must hold `chunk_count` chunks.
    pub async fn open(&self, table: Address, chunk_count: u32) -> RemoteResult<RemoteTableReader> {
        self.open_with_cancel(table, chunk_count, CancelSignal::never())
            .await
    }

    /// Like [`open`](Self::open), with reads abandoning their retries once
    /// `cancel` fires.
    pub async fn open_with_cancel(
        &self,
        table: Address,
        chunk_count: u32,
        cancel: CancelSignal,
    ) -> RemoteResult<RemoteTableReader> {
        let source = self.source(table).with_cancel(cancel);
        RemoteTableReader::open(source, chunk_count, Some(&self.cache), self.block_size).await
    }

    /// Upload a finished table. Its index lands in the cache, so opening it
    /// afterwards costs no bootstrap read.
    pub async fn persist(&self, table: &TableFile) -> RemoteResult<()> {
        self.persister.persist(table).await?;

        let tail_start = table
            .data
            .len()
            .checked_sub(tail_size(table.chunk_count) as usize)
            .ok_or_else(|| {
                TableError::CorruptIndex(format!(
                    "{} byte table cannot hold {} chunks",
                    table.data.len(),
                    table.chunk_count
                ))
            })?;
        let index = TableIndex::parse(&table.data[tail_start..])?;
        self.cache.put(table.address, Arc::new(index));
        Ok(())
    }
}
