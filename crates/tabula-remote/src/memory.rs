use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tabula_types::Address;

use crate::client::{ByteRange, CompletedPart, GetObjectOutput, ObjectStoreClient};
use crate::error::{RemoteError, RemoteResult};

type ObjectKey = (String, String);

struct PendingUpload {
    bucket: String,
    key: String,
    parts: BTreeMap<u32, (String, Bytes)>,
}

/// An object store held in memory.
///
/// Buckets spring into existence on first write. Range requests follow HTTP
/// semantics (see [`ByteRange::resolve`]) and multipart uploads behave like
/// the real thing: parts stay invisible until the upload is completed.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectKey, Bytes>>,
    uploads: Mutex<HashMap<String, PendingUpload>>,
    next_upload: AtomicU64,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            uploads: Mutex::new(HashMap::new()),
            next_upload: AtomicU64::new(1),
        }
    }

    /// Store an object directly, bypassing the async client surface.
    pub fn insert(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        self.objects
            .write()
            .expect("lock poisoned")
            .insert((bucket.to_string(), key.to_string()), data.into());
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.object(bucket, key).is_some()
    }

    /// Sorted keys of every object in `bucket`.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .read()
            .expect("lock poisoned")
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Uploads created but neither completed nor aborted.
    pub fn pending_uploads(&self) -> usize {
        self.uploads.lock().expect("lock poisoned").len()
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_upload(upload: &PendingUpload, bucket: &str, key: &str, upload_id: &str) -> RemoteResult<()> {
    if upload.bucket != bucket || upload.key != key {
        return Err(RemoteError::UnknownUpload(upload_id.to_string()));
    }
    Ok(())
}

#[async_trait]
impl ObjectStoreClient for InMemoryObjectStore {
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        range: Option<ByteRange>,
    ) -> RemoteResult<GetObjectOutput> {
        let data = self
            .object(bucket, key)
            .ok_or_else(|| RemoteError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;
        let body = match range {
            None => data,
            Some(range) => {
                let size = data.len() as u64;
                let resolved = range.resolve(size).ok_or_else(|| RemoteError::InvalidRange {
                    key: key.to_string(),
                    range: range.to_string(),
                    object_size: size,
                })?;
                data.slice(resolved.start as usize..resolved.end as usize)
            }
        };
        Ok(GetObjectOutput {
            content_length: body.len() as u64,
            body,
        })
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> RemoteResult<()> {
        self.insert(bucket, key, body);
        Ok(())
    }

    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> RemoteResult<String> {
        let upload_id = format!("upload-{}", self.next_upload.fetch_add(1, Ordering::Relaxed));
        self.uploads.lock().expect("lock poisoned").insert(
            upload_id.clone(),
            PendingUpload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                parts: BTreeMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
    ) -> RemoteResult<CompletedPart> {
        if part_number == 0 {
            return Err(RemoteError::Service("part numbers start at 1".into()));
        }
        let mut uploads = self.uploads.lock().expect("lock poisoned");
        let upload = uploads
            .get_mut(upload_id)
            .ok_or_else(|| RemoteError::UnknownUpload(upload_id.to_string()))?;
        check_upload(upload, bucket, key, upload_id)?;

        let etag = Address::of(&body).short_hex();
        upload.parts.insert(part_number, (etag.clone(), body));
        Ok(CompletedPart { part_number, etag })
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> RemoteResult<()> {
        let upload = {
            let mut uploads = self.uploads.lock().expect("lock poisoned");
            let upload = uploads
                .get(upload_id)
                .ok_or_else(|| RemoteError::UnknownUpload(upload_id.to_string()))?;
            check_upload(upload, bucket, key, upload_id)?;
            if parts.is_empty() {
                return Err(RemoteError::Service("multipart upload has no parts".into()));
            }
            if parts.windows(2).any(|w| w[0].part_number >= w[1].part_number) {
                return Err(RemoteError::Service("parts must be listed in ascending order".into()));
            }
            for part in parts {
                match upload.parts.get(&part.part_number) {
                    Some((etag, _)) if *etag == part.etag => {}
                    _ => {
                        return Err(RemoteError::Service(format!(
                            "part {} was not uploaded with etag {}",
                            part.part_number, part.etag
                        )))
                    }
                }
            }
            uploads
                .remove(upload_id)
                .ok_or_else(|| RemoteError::UnknownUpload(upload_id.to_string()))?
        };

        let mut object = BytesMut::new();
        for part in parts {
            if let Some((_, body)) = upload.parts.get(&part.part_number) {
                object.extend_from_slice(body);
            }
        }
        self.insert(bucket, key, object.freeze());
        Ok(())
    }

    async fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> RemoteResult<()> {
        let mut uploads = self.uploads.lock().expect("lock poisoned");
        let upload = uploads
            .get(upload_id)
            .ok_or_else(|| RemoteError::UnknownUpload(upload_id.to_string()))?;
        check_upload(upload, bucket, key, upload_id)?;
        uploads.remove(upload_id);
        Ok(())
    }
}
