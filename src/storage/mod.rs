//! Object storage for archived feeds

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Utc};

use crate::config::FeedWindow;
use crate::models::ArchivedObject;
use crate::models::naming::{archive_key, public_location};

/// Content type the monitoring service expects for FireEye-format lists
pub const CSV_CONTENT_TYPE: &str = "application/CSV";

/// Trait for archive destinations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Write `body` under `bucket/key`
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>, content_type: &str) -> Result<()>;
}

/// S3 archive store
pub struct S3ArchiveStore {
    client: aws_sdk_s3::Client,
}

impl S3ArchiveStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ArchiveStore for S3ArchiveStore {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("{}", aws_sdk_s3::error::DisplayErrorContext(e)))
            .with_context(|| format!("Failed to upload s3://{}/{}", bucket, key))?;

        Ok(())
    }
}

/// Store the raw feed body and return where it landed
pub async fn archive_feed(
    store: &dyn ArchiveStore,
    bucket: &str,
    prefix: &str,
    window: FeedWindow,
    now: DateTime<Utc>,
    body: Vec<u8>,
) -> Result<ArchivedObject> {
    let key = archive_key(prefix, now, window);
    let size = body.len();

    store.put(bucket, &key, body, CSV_CONTENT_TYPE).await?;

    tracing::info!(bucket = bucket, key = %key, bytes = size, "Archived feed");

    Ok(ArchivedObject {
        location: public_location(bucket, &key),
        bucket: bucket.to_string(),
        key,
    })
}
