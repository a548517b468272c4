use std::sync::Arc;

use bytes::Bytes;
use futures::future::try_join_all;
use tabula_table::TableFile;
use tracing::{debug, warn};

use crate::client::{CompletedPart, ObjectStoreClient};
use crate::error::RemoteResult;

/// Uploads finished table files, keyed by table address.
pub struct RemoteTablePersister {
    client: Arc<dyn ObjectStoreClient>,
    bucket: String,
    part_size: usize,
}

impl RemoteTablePersister {
    pub fn new(client: Arc<dyn ObjectStoreClient>, bucket: impl Into<String>, part_size: usize) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            part_size: part_size.max(1),
        }
    }

    pub fn part_size(&self) -> usize {
        self.part_size
    }

    /// Upload `table`. Tables that fit in one part go up in a single PUT;
    /// larger ones are uploaded in parts concurrently, and the upload is
    /// aborted if any part fails.
    pub async fn persist(&self, table: &TableFile) -> RemoteResult<()> {
        let key = table.address.to_hex();
        if table.data.len() <= self.part_size {
            self.client
                .put_object(&self.bucket, &key, table.data.clone())
                .await?;
            debug!(
                table = %table.address.short_hex(),
                bytes = table.data.len(),
                "persisted table"
            );
            return Ok(());
        }

        let upload_id = self.client.create_multipart_upload(&self.bucket, &key).await?;
        match self.upload_parts(&key, &upload_id, &table.data).await {
            Ok(parts) => {
                debug!(
                    table = %table.address.short_hex(),
                    bytes = table.data.len(),
                    parts,
                    "persisted table in parts"
                );
                Ok(())
            }
            Err(err) => {
                warn!(table = %table.address.short_hex(), error = %err, "multipart upload failed, aborting");
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload(&self.bucket, &key, &upload_id)
                    .await
                {
                    warn!(upload_id = %upload_id, error = %abort_err, "abort failed");
                }
                Err(err)
            }
        }
    }

    async fn upload_parts(&self, key: &str, upload_id: &str, data: &Bytes) -> RemoteResult<usize> {
        let uploads = (0..data.len()).step_by(self.part_size).zip(1u32..).map(|(start, number)| {
            let end = (start + self.part_size).min(data.len());
            self.client
                .upload_part(&self.bucket, key, upload_id, number, data.slice(start..end))
        });
        let parts: Vec<CompletedPart> = try_join_all(uploads).await?;
        self.client
            .complete_multipart_upload(&self.bucket, key, upload_id, &parts)
            .await?;
        Ok(parts.len())
    }
}
