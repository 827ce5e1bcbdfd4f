//! S3 transport built from a decrypted key pair.

use super::{commit_partial, partial_path, ObjectStore, StoreError};
use crate::credentials::AccessKeyPair;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bucketsync_core::path_utils::BucketPath;
use bucketsync_core::{ObjectMeta, RemoteObject};
use camino::Utf8Path;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint (MinIO, Ceph, ...). Enables path-style addressing.
    pub endpoint_override: Option<String>,
}

pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
}

struct ListCursor {
    token: Option<String>,
    done: bool,
}

impl S3ObjectStore {
    /// Builds the client once; it is shared by every transfer of the run.
    pub fn connect(config: &S3Config, keys: &AccessKeyPair) -> Self {
        let credentials = aws_credential_types::Credentials::new(
            keys.access_key_id(),
            keys.secret_access_key(),
            None,
            None,
            "bucketsync-encrypted-file",
        );

        let mut config_builder = aws_sdk_s3::Config::builder()
            .region(aws_types::region::Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .behavior_version_latest();

        if let Some(ref endpoint) = config.endpoint_override {
            config_builder = config_builder
                .endpoint_url(endpoint)
                .force_path_style(true);
        }

        debug!(
            "S3 client for bucket {} in {} (endpoint: {:?})",
            config.bucket, config.region, config.endpoint_override
        );

        Self {
            client: S3Client::from_conf(config_builder.build()),
            bucket: config.bucket.clone(),
        }
    }

    async fn write_body(
        &self,
        key: &str,
        mut body: ByteStream,
        tmp: &Utf8Path,
    ) -> Result<u64, StoreError> {
        let mut file = tokio::fs::File::create(tmp)
            .await
            .map_err(|e| StoreError::io(tmp, e))?;
        let mut written = 0u64;
        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| StoreError::Unavailable(format!("failed to read body for {key}: {e}")))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| StoreError::io(tmp, e))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| StoreError::io(tmp, e))?;
        Ok(written)
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3ObjectStore {
    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, Result<RemoteObject, StoreError>> {
        let start = ListCursor {
            token: None,
            done: false,
        };

        stream::try_unfold(start, move |cursor| async move {
            if cursor.done {
                return Ok(None);
            }

            let mut req = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);
            if let Some(token) = cursor.token {
                req = req.continuation_token(token);
            }

            let resp = req.send().await.map_err(|e| {
                StoreError::Unavailable(format!(
                    "list failed for prefix {prefix}: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

            let page: Vec<Result<RemoteObject, StoreError>> = resp
                .contents()
                .iter()
                .filter_map(|obj| {
                    let key = obj.key()?;
                    if BucketPath::is_placeholder(key) {
                        return None;
                    }
                    Some(Ok(RemoteObject {
                        key: key.to_string(),
                        size: obj.size().unwrap_or(0).max(0) as u64,
                        etag: obj.e_tag().map(str::to_string),
                    }))
                })
                .collect();

            debug!("listed {} objects under {prefix}", page.len());

            let next = match (resp.is_truncated(), resp.next_continuation_token()) {
                (Some(true), Some(token)) => ListCursor {
                    token: Some(token.to_string()),
                    done: false,
                },
                _ => ListCursor {
                    token: None,
                    done: true,
                },
            };

            Ok(Some((stream::iter(page), next)))
        })
        .try_flatten()
        .boxed()
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StoreError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(resp) => Ok(Some(ObjectMeta {
                size: resp.content_length().unwrap_or(0).max(0) as u64,
                etag: resp.e_tag().map(str::to_string),
            })),
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_not_found() {
                    Ok(None)
                } else {
                    Err(StoreError::Unavailable(format!(
                        "head object failed for {key}: {}",
                        DisplayErrorContext(&service_err)
                    )))
                }
            }
        }
    }

    async fn get(&self, key: &str, dest: &Utf8Path) -> Result<u64, StoreError> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                StoreError::Unavailable(format!(
                    "download failed for {key}: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }

        let tmp = partial_path(dest);
        match self.write_body(key, resp.body, &tmp).await {
            Ok(written) => {
                commit_partial(&tmp, dest).await?;
                debug!("downloaded {written} bytes from s3://{}/{key}", self.bucket);
                Ok(written)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&tmp).await;
                Err(e)
            }
        }
    }

    async fn put(&self, key: &str, source: &Utf8Path) -> Result<u64, StoreError> {
        let size = tokio::fs::metadata(source)
            .await
            .map_err(|e| StoreError::io(source, e))?
            .len();
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| StoreError::io(source, std::io::Error::other(e)))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_length(size as i64)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                StoreError::Unavailable(format!(
                    "upload failed for {key}: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        debug!("uploaded {size} bytes to s3://{}/{key}", self.bucket);
        Ok(size)
    }
}
