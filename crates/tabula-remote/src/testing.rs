//! Instrumented test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::backoff::Sleeper;
use crate::client::{ByteRange, CompletedPart, GetObjectOutput, ObjectStoreClient};
use crate::error::{RemoteError, RemoteResult};
use crate::memory::InMemoryObjectStore;

pub(crate) fn reset() -> RemoteError {
    RemoteError::Io(io::Error::from(io::ErrorKind::ConnectionReset))
}

/// Records requested delays and returns at once.
#[derive(Default)]
pub(crate) struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub(crate) fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// An in-memory store that counts GETs, tracks how many overlap, and can be
/// scripted to fail.
#[derive(Default)]
pub(crate) struct InstrumentedClient {
    pub(crate) inner: InMemoryObjectStore,
    gets: AtomicUsize,
    ranges: Mutex<Vec<ByteRange>>,
    failures: Mutex<VecDeque<RemoteError>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    truncate_bodies: AtomicBool,
    fail_parts: AtomicBool,
}

impl InstrumentedClient {
    /// Fail the next GET with `err`. Queued failures are used in order.
    pub(crate) fn fail_next(&self, err: RemoteError) {
        self.failures.lock().unwrap().push_back(err);
    }

    /// Drop the last byte of every body while declaring the full length.
    pub(crate) fn truncate_bodies(&self) {
        self.truncate_bodies.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_parts(&self) {
        self.fail_parts.store(true, Ordering::SeqCst);
    }

    pub(crate) fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub(crate) fn ranges(&self) -> Vec<ByteRange> {
        self.ranges.lock().unwrap().clone()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStoreClient for InstrumentedClient {
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        range: Option<ByteRange>,
    ) -> RemoteResult<GetObjectOutput> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if let Some(range) = range {
            self.ranges.lock().unwrap().push(range);
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        // Give concurrent requests a chance to overlap.
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }

        let failure = self.failures.lock().unwrap().pop_front();
        let result = match failure {
            Some(err) => Err(err),
            None => self.inner.get_object(bucket, key, range).await.map(|mut out| {
                if self.truncate_bodies.load(Ordering::SeqCst) && !out.body.is_empty() {
                    out.body = out.body.slice(..out.body.len() - 1);
                }
                out
            }),
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> RemoteResult<()> {
        self.inner.put_object(bucket, key, body).await
    }

    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> RemoteResult<String> {
        self.inner.create_multipart_upload(bucket, key).await
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
    ) -> RemoteResult<CompletedPart> {
        if self.fail_parts.load(Ordering::SeqCst) {
            return Err(RemoteError::Service("part rejected".into()));
        }
        self.inner
            .upload_part(bucket, key, upload_id, part_number, body)
            .await
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> RemoteResult<()> {
        self.inner
            .complete_multipart_upload(bucket, key, upload_id, parts)
            .await
    }

    async fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> RemoteResult<()> {
        self.inner.abort_multipart_upload(bucket, key, upload_id).await
    }
}
