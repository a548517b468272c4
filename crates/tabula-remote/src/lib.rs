//! Object-store backed table files for tabula.
//!
//! Table files live in a bucket under their table address. Opening one
//! costs a single suffix GET for the index and footer (nothing at all when
//! the index is cached); chunks are then fetched with ranged GETs.
//!
//! # Architecture
//!
//! - [`ObjectStoreClient`]: the service operations used, with
//!   [`InMemoryObjectStore`] as an in-process implementation
//! - [`RemoteTableSource`]: ranged reads behind a [`RateLimitGate`], retried
//!   on connection reset by [`retry_on_reset`] with a [`BackoffPolicy`]
//! - [`RemoteTableReader`]: index bootstrap plus coalesced chunk reads
//! - [`RemoteTablePersister`]: single-PUT or multipart upload of new tables
//! - [`RemoteTableStore`]: one bucket, one cache, one gate, built from a
//!   [`RemoteConfig`]

pub mod backoff;
pub mod cancel;
pub mod client;
pub mod config;
pub mod error;
pub mod gate;
pub mod memory;
pub mod persister;
pub mod reader;
pub mod store;

#[cfg(test)]
mod testing;

pub use backoff::{retry_on_reset, Backoff, BackoffPolicy, Sleeper, TokioSleeper};
pub use cancel::{CancelHandle, CancelSignal};
pub use client::{ByteRange, CompletedPart, GetObjectOutput, ObjectStoreClient};
pub use config::{RemoteConfig, MIN_PART_SIZE};
pub use error::{RemoteError, RemoteResult};
pub use gate::{GatePermit, RateLimitGate};
pub use memory::InMemoryObjectStore;
pub use persister::RemoteTablePersister;
pub use reader::{RemoteTableReader, RemoteTableSource};
pub use store::RemoteTableStore;
