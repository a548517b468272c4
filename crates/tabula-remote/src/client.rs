use std::fmt;
use std::ops::Range;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::RemoteResult;

/// An HTTP byte range. Both ends of a bounded range are inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteRange {
    /// `bytes=<start>-<end>`
    Bounded { start: u64, end: u64 },
    /// `bytes=-<len>`: the last `len` bytes of the object.
    Suffix(u64),
}

impl ByteRange {
    /// The range covering `length` bytes starting at `offset`, or `None` for
    /// an empty read, which HTTP cannot express. A range running past
    /// `u64::MAX` is clipped there.
    pub fn at(offset: u64, length: u64) -> Option<Self> {
        if length == 0 {
            return None;
        }
        Some(ByteRange::Bounded {
            start: offset,
            end: offset.saturating_add(length - 1),
        })
    }

    /// Number of bytes the range asks for. An inverted bounded range asks
    /// for nothing.
    pub fn length(&self) -> u64 {
        match *self {
            ByteRange::Bounded { start, end } if start > end => 0,
            ByteRange::Bounded { start, end } => (end - start).saturating_add(1),
            ByteRange::Suffix(len) => len,
        }
    }

    /// Resolve against an object of `object_size` bytes the way an object
    /// store does: bounded ranges are clipped at the object end, suffix
    /// ranges longer than the object return all of it. `None` means the
    /// range is unsatisfiable.
    pub fn resolve(&self, object_size: u64) -> Option<Range<u64>> {
        match *self {
            ByteRange::Bounded { start, end } => {
                if start > end || start >= object_size {
                    return None;
                }
                Some(start..end.min(object_size - 1) + 1)
            }
            ByteRange::Suffix(0) => None,
            ByteRange::Suffix(len) => Some(object_size.saturating_sub(len)..object_size),
        }
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteRange::Bounded { start, end } => write!(f, "bytes={start}-{end}"),
            ByteRange::Suffix(len) => write!(f, "bytes=-{len}"),
        }
    }
}

/// Response to a GET. `content_length` is what the service declared, which
/// a misbehaving service or a cut connection can make disagree with `body`.
#[derive(Clone, Debug)]
pub struct GetObjectOutput {
    pub content_length: u64,
    pub body: Bytes,
}

/// A part accepted by [`ObjectStoreClient::upload_part`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedPart {
    pub part_number: u32,
    pub etag: String,
}

/// The object-store operations table storage needs.
///
/// Implementations wrap a concrete service SDK or hold objects in memory
/// ([`InMemoryObjectStore`](crate::InMemoryObjectStore)). A dropped
/// connection mid-body must surface as an `io::Error` of kind
/// `ConnectionReset` so readers can retry it.
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    /// Fetch an object, or the part of it selected by `range`.
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        range: Option<ByteRange>,
    ) -> RemoteResult<GetObjectOutput>;

    /// Store an object in one request, replacing any previous value.
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> RemoteResult<()>;

    /// Start a multipart upload and return its upload id.
    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> RemoteResult<String>;

    /// Upload one part. Part numbers start at 1.
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
    ) -> RemoteResult<CompletedPart>;

    /// Assemble the listed parts, in order, into the final object.
    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> RemoteResult<()>;

    /// Discard an upload and every part uploaded for it.
    async fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> RemoteResult<()>;
}
