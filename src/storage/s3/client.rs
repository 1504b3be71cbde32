// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::bucket::{GetObjectInput, GetObjectOutput, PutObjectInput, S3Bucket};
use crate::storage::config::StorageType;
use crate::storage::envelope::{
    decompress, inclusive_range, read_body, read_source, snappy_body, upload_with_retry, Envelope,
};
use crate::storage::error::{S3Error, StorageError, StorageResult, S3_NO_SUCH_KEY};
use crate::storage::metadata::{
    canonical_header_key, merge_standard_headers, select_s3_attributes, ObjectMetadata,
    COMPRESSOR_META_KEY,
};
use crate::storage::options::{GetOptions, ListRequest, PutOptions};
use crate::storage::provider::{ObjectClient, ObjectReader, ObjectSource};
use crate::storage::router::{BucketHandle, BucketRouter};

/// [`ObjectClient`] for S3-compatible stores
pub struct S3Client {
    router: BucketRouter<dyn S3Bucket>,
    envelope: Envelope,
}

impl S3Client {
    pub fn new(router: BucketRouter<dyn S3Bucket>, envelope: Envelope) -> Self {
        Self { router, envelope }
    }

    /// Bucket holding `key`, once the key is known to be storable there.
    fn bucket_for(&self, key: &str) -> StorageResult<&Arc<dyn S3Bucket>> {
        let bucket = self.router.resolve(key)?;
        bucket.validate_key(key)?;
        Ok(bucket)
    }

    /// GET that maps `NoSuchKey` to `None`.
    async fn get_object(
        &self,
        key: &str,
        options: &GetOptions,
    ) -> StorageResult<Option<GetObjectOutput>> {
        let bucket = self.bucket_for(key)?;
        debug!("GET {} from {}", key, bucket.name());
        let input = GetObjectInput {
            key: key.to_string(),
            range: None,
            response_content_type: options.content_type.clone(),
            response_content_encoding: options.content_encoding.clone(),
        };
        match bucket.get_object(input).await {
            Ok(output) => Ok(Some(output)),
            Err(e) if e.code() == Some(S3_NO_SUCH_KEY) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put_body(
        &self,
        key: &str,
        source: &mut dyn ObjectSource,
        body: Bytes,
        meta: ObjectMetadata,
        options: &PutOptions,
    ) -> StorageResult<()> {
        let bucket = self.bucket_for(key)?;
        let input = PutObjectInput {
            key: key.to_string(),
            body,
            content_type: options.content_type.clone(),
            content_encoding: options.content_encoding.clone(),
            content_disposition: options.content_disposition.clone(),
            cache_control: options.cache_control.clone(),
            expires: options.expires,
            metadata: meta,
        };
        debug!("PUT {} ({} bytes) to {}", key, input.body.len(), bucket.name());
        upload_with_retry(key, source, || {
            let bucket = Arc::clone(bucket);
            let input = input.clone();
            async move { bucket.put_object(input).await }
        })
        .await
    }
}

fn is_not_found(e: &S3Error) -> bool {
    e.status_code() == Some(404)
}

#[async_trait]
impl ObjectClient for S3Client {
    fn storage_type(&self) -> StorageType {
        StorageType::S3
    }

    async fn get(&self, key: &str, options: &GetOptions) -> StorageResult<Bytes> {
        match self.get_object(key, options).await? {
            Some(output) => read_body(output.body).await,
            None => Ok(Bytes::new()),
        }
    }

    async fn get_as_reader(
        &self,
        key: &str,
        options: &GetOptions,
    ) -> StorageResult<Option<ObjectReader>> {
        Ok(self.get_object(key, options).await?.map(|output| output.body))
    }

    async fn get_with_meta(
        &self,
        key: &str,
        attributes: &[&str],
        options: &GetOptions,
    ) -> StorageResult<Option<(ObjectReader, ObjectMetadata)>> {
        let Some(output) = self.get_object(key, options).await? else {
            return Ok(None);
        };
        let meta = select_s3_attributes(attributes, &merge_standard_headers(&output));
        Ok(Some((output.body, meta)))
    }

    async fn put(
        &self,
        key: &str,
        source: &mut dyn ObjectSource,
        mut meta: ObjectMetadata,
        options: &PutOptions,
    ) -> StorageResult<()> {
        self.bucket_for(key)?;
        let body = read_source(source).await?;
        let (body, options) = self.envelope.compress_for_put(body, &mut meta, options)?;
        self.put_body(key, source, body, meta, &options).await
    }

    async fn compress_and_put(
        &self,
        key: &str,
        source: &mut dyn ObjectSource,
        mut meta: ObjectMetadata,
        options: &PutOptions,
    ) -> StorageResult<()> {
        self.bucket_for(key)?;
        let body = read_source(source).await?;
        let body = snappy_body(&body, &mut meta)?;
        self.put_body(key, source, body, meta, options).await
    }

    async fn get_and_decompress(&self, key: &str) -> StorageResult<Bytes> {
        let Some(output) = self.get_object(key, &GetOptions::default()).await? else {
            return Ok(Bytes::new());
        };
        let compressor = output
            .metadata
            .get(&canonical_header_key(COMPRESSOR_META_KEY))
            .cloned();
        let content = read_body(output.body).await?;
        decompress(content, compressor.as_deref())
    }

    async fn del(&self, key: &str) -> StorageResult<()> {
        let bucket = self.bucket_for(key)?;
        bucket.delete_object(key).await?;
        Ok(())
    }

    async fn del_multi(&self, keys: &[&str]) -> StorageResult<()> {
        let batches = self.router.partition(keys)?;
        for (bucket, batch) in &batches {
            for key in batch {
                bucket.validate_key(key)?;
            }
        }
        for (bucket, batch) in batches {
            debug!("Deleting {} keys from {}", batch.len(), bucket.name());
            bucket.delete_objects(&batch).await?;
        }
        Ok(())
    }

    async fn head(&self, key: &str, attributes: &[&str]) -> StorageResult<Option<ObjectMetadata>> {
        let bucket = self.bucket_for(key)?;
        match bucket.head_object(key).await {
            Ok(output) => Ok(Some(select_s3_attributes(
                attributes,
                &merge_standard_headers(&output),
            ))),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_object(&self, key: &str, request: &ListRequest) -> StorageResult<Vec<String>> {
        let bucket = self.bucket_for(key)?;
        let request = request.clone().with_max_keys(request.page_size());
        debug!("Listing {} with prefix '{}'", bucket.name(), request.prefix);
        Ok(bucket.list_objects(&request).await?)
    }

    async fn sign_url(&self, key: &str, expired_seconds: u64) -> StorageResult<String> {
        let bucket = self.bucket_for(key)?;
        let signed = bucket
            .presign_get(key, Duration::from_secs(expired_seconds))
            .await?;
        self.envelope.rewrite_url(signed)
    }

    async fn sign_url_with_process(
        &self,
        _key: &str,
        _expired_seconds: u64,
        _process: &str,
    ) -> StorageResult<String> {
        Err(StorageError::Unsupported(
            "sign_url_with_process is only available on OSS".to_string(),
        ))
    }

    async fn range(&self, key: &str, offset: u64, length: u64) -> StorageResult<ObjectReader> {
        let range = inclusive_range(offset, length)?;
        let bucket = self.bucket_for(key)?;
        let input = GetObjectInput {
            range: Some(range),
            ..GetObjectInput::new(key)
        };
        Ok(bucket.get_object(input).await?.body)
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let bucket = self.bucket_for(key)?;
        match bucket.head_object(key).await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl Debug for S3Client {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let buckets = match &self.router {
            BucketRouter::Single(bucket) => bucket.name().to_string(),
            BucketRouter::Sharded(_) => "sharded".to_string(),
        };
        write!(f, "S3Client(buckets={}, envelope={:?})", buckets, self.envelope)
    }
}
