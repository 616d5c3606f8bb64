use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client as S3Client;
use url::Url;

use crate::{Error, Result};

/// Seam between the orchestrator and the remote object store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Upload `bytes` under `key`. Fails rather than replacing an
    /// existing key.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Resolve the publicly dereferenceable address for an uploaded key.
    fn public_url(&self, key: &str) -> Result<String>;
}

/// S3-backed artifact store
pub struct S3Store {
    client: S3Client,
    bucket: String,
    region: String,
    public_base: Option<String>,
}

impl S3Store {
    pub fn new(
        client: S3Client,
        bucket: String,
        region: String,
        public_base: Option<String>,
    ) -> Self {
        Self {
            client,
            bucket,
            region,
            public_base,
        }
    }
}

#[async_trait]
impl ArtifactStore for S3Store {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        tracing::info!(
            "Uploading {} bytes to s3://{}/{}",
            bytes.len(),
            self.bucket,
            key
        );

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(bytes.into())
            .content_type(content_type)
            // Conditional write: an existing key fails the upload instead
            // of being silently replaced
            .if_none_match("*")
            .send()
            .await
            .map_err(|e| Error::UploadFailed(format!("{}", DisplayErrorContext(&e))))?;

        Ok(())
    }

    fn public_url(&self, key: &str) -> Result<String> {
        let base = match &self.public_base {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://{}.s3.{}.amazonaws.com", self.bucket, self.region),
        };
        let url = format!("{}/{}", base, key);

        Url::parse(&url)
            .map_err(|e| Error::PublicUrlResolutionFailed(format!("{}: {}", url, e)))?;

        Ok(url)
    }
}
