use serde::{Deserialize, Serialize};
use tabula_table::{IndexCacheConfig, DEFAULT_BLOCK_SIZE};

use crate::backoff::BackoffPolicy;

/// Smallest part most object stores accept in a multipart upload.
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub bucket: String,
    /// Records closer together than this are fetched in one ranged read.
    pub block_size: u64,
    /// Cap on concurrent ranged reads; `None` disables the gate.
    pub max_concurrent_reads: Option<usize>,
    /// Tables larger than this are uploaded in parts of this size.
    pub part_size: usize,
    pub backoff: BackoffPolicy,
    pub index_cache: IndexCacheConfig,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            bucket: "tabula".into(),
            block_size: DEFAULT_BLOCK_SIZE,
            max_concurrent_reads: Some(64),
            part_size: MIN_PART_SIZE,
            backoff: BackoffPolicy::default(),
            index_cache: IndexCacheConfig::default(),
        }
    }
}
