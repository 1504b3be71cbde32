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
use crc::{Crc, CRC_64_XZ};
use reqwest::header::HeaderMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::bucket::{OssBucket, OssGetRequest, OssObject, OssPutRequest, OSS_HASH_CRC64, OSS_REQUEST_ID};
use crate::storage::config::StorageType;
use crate::storage::envelope::{
    decompress, inclusive_range, read_body, read_source, snappy_body, upload_with_retry, Envelope,
};
use crate::storage::error::{OssError, StorageError, StorageResult};
use crate::storage::metadata::{
    header_str, oss_meta_header, select_oss_attributes, ObjectMetadata, COMPRESSOR_META_KEY,
};
use crate::storage::options::{GetOptions, ListRequest, PutOptions};
use crate::storage::provider::{ObjectClient, ObjectReader, ObjectSource};
use crate::storage::router::{BucketHandle, BucketRouter};

/// CRC-64 as OSS computes it (ECMA-182 polynomial, reflected)
const OSS_CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_XZ);

/// [`ObjectClient`] for OSS
pub struct OssClient {
    router: BucketRouter<dyn OssBucket>,
    envelope: Envelope,
}

fn is_not_found(e: &OssError) -> bool {
    e.status_code() == Some(404)
}

/// Compare the body's CRC-64 with the one the server reported.
///
/// A missing, unparseable or zero server value skips the check.
fn check_crc(headers: &HeaderMap, content: &[u8]) -> StorageResult<()> {
    let Some(server_crc) = header_str(headers, OSS_HASH_CRC64).and_then(|v| v.parse::<u64>().ok())
    else {
        return Ok(());
    };
    if server_crc == 0 {
        return Ok(());
    }
    let client_crc = OSS_CRC64.checksum(content);
    if client_crc != server_crc {
        let request_id = header_str(headers, OSS_REQUEST_ID).unwrap_or_default().to_string();
        warn!(
            "CRC64 mismatch, request_id={}, server_crc={}, client_crc={}",
            request_id, server_crc, client_crc
        );
        return Err(StorageError::CrcMismatch {
            request_id,
            server_crc,
            client_crc,
        });
    }
    Ok(())
}

impl OssClient {
    pub fn new(router: BucketRouter<dyn OssBucket>, envelope: Envelope) -> Self {
        Self { router, envelope }
    }

    /// GET that maps a 404 to `None`.
    async fn get_object(&self, key: &str, options: &GetOptions) -> StorageResult<Option<OssObject>> {
        let bucket = self.router.resolve(key)?;
        debug!("GET {} from {}", key, bucket.name());
        let request = OssGetRequest {
            range: None,
            response_content_type: options.content_type.clone(),
            response_content_encoding: options.content_encoding.clone(),
        };
        match bucket.get_object(key, &request).await {
            Ok(object) => Ok(Some(object)),
            Err(e) if is_not_found(&e) => Ok(None),
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
        let bucket = self.router.resolve(key)?;
        let request = OssPutRequest {
            body,
            content_type: options.content_type.clone(),
            content_encoding: options.content_encoding.clone(),
            content_disposition: options.content_disposition.clone(),
            cache_control: options.cache_control.clone(),
            expires: options.expires,
            metadata: meta,
        };
        debug!("PUT {} ({} bytes) to {}", key, request.body.len(), bucket.name());
        upload_with_retry(key, source, || {
            let bucket = Arc::clone(bucket);
            let request = request.clone();
            async move { bucket.put_object(key, request).await }
        })
        .await
    }

    async fn sign(&self, key: &str, expired_seconds: u64, process: Option<&str>) -> StorageResult<String> {
        let bucket = self.router.resolve(key)?;
        let signed = bucket.sign_url(key, Duration::from_secs(expired_seconds), process)?;
        self.envelope.rewrite_url(signed)
    }
}

#[async_trait]
impl ObjectClient for OssClient {
    fn storage_type(&self) -> StorageType {
        StorageType::Oss
    }

    async fn get(&self, key: &str, options: &GetOptions) -> StorageResult<Bytes> {
        let Some(object) = self.get_object(key, options).await? else {
            return Ok(Bytes::new());
        };
        let content = read_body(object.body).await?;
        if options.enable_crc_validation {
            check_crc(&object.headers, &content)?;
        }
        Ok(content)
    }

    async fn get_as_reader(
        &self,
        key: &str,
        options: &GetOptions,
    ) -> StorageResult<Option<ObjectReader>> {
        Ok(self.get_object(key, options).await?.map(|object| object.body))
    }

    async fn get_with_meta(
        &self,
        key: &str,
        attributes: &[&str],
        options: &GetOptions,
    ) -> StorageResult<Option<(ObjectReader, ObjectMetadata)>> {
        let Some(object) = self.get_object(key, options).await? else {
            return Ok(None);
        };
        let meta = select_oss_attributes(attributes, &object.headers);
        Ok(Some((object.body, meta)))
    }

    async fn put(
        &self,
        key: &str,
        source: &mut dyn ObjectSource,
        mut meta: ObjectMetadata,
        options: &PutOptions,
    ) -> StorageResult<()> {
        self.router.resolve(key)?;
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
        self.router.resolve(key)?;
        let body = read_source(source).await?;
        let body = snappy_body(&body, &mut meta)?;
        self.put_body(key, source, body, meta, options).await
    }

    async fn get_and_decompress(&self, key: &str) -> StorageResult<Bytes> {
        let Some(object) = self.get_object(key, &GetOptions::default()).await? else {
            return Ok(Bytes::new());
        };
        let compressor = header_str(&object.headers, &oss_meta_header(COMPRESSOR_META_KEY))
            .map(str::to_string);
        let content = read_body(object.body).await?;
        decompress(content, compressor.as_deref())
    }

    async fn del(&self, key: &str) -> StorageResult<()> {
        let bucket = self.router.resolve(key)?;
        bucket.delete_object(key).await?;
        Ok(())
    }

    async fn del_multi(&self, keys: &[&str]) -> StorageResult<()> {
        for (bucket, batch) in self.router.partition(keys)? {
            debug!("Deleting {} keys from {}", batch.len(), bucket.name());
            bucket.delete_objects(&batch).await?;
        }
        Ok(())
    }

    async fn head(&self, key: &str, attributes: &[&str]) -> StorageResult<Option<ObjectMetadata>> {
        let bucket = self.router.resolve(key)?;
        match bucket.get_object_meta(key).await {
            Ok(headers) => Ok(Some(select_oss_attributes(attributes, &headers))),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_object(&self, key: &str, request: &ListRequest) -> StorageResult<Vec<String>> {
        let bucket = self.router.resolve(key)?;
        let request = request.clone().with_max_keys(request.page_size());
        debug!("Listing {} with prefix '{}'", bucket.name(), request.prefix);
        Ok(bucket.list_objects(&request).await?)
    }

    async fn sign_url(&self, key: &str, expired_seconds: u64) -> StorageResult<String> {
        self.sign(key, expired_seconds, None).await
    }

    async fn sign_url_with_process(
        &self,
        key: &str,
        expired_seconds: u64,
        process: &str,
    ) -> StorageResult<String> {
        self.sign(key, expired_seconds, Some(process)).await
    }

    async fn range(&self, key: &str, offset: u64, length: u64) -> StorageResult<ObjectReader> {
        let range = inclusive_range(offset, length)?;
        let bucket = self.router.resolve(key)?;
        let request = OssGetRequest {
            range: Some(range),
            ..Default::default()
        };
        Ok(bucket.get_object(key, &request).await?.body)
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let bucket = self.router.resolve(key)?;
        match bucket.get_object_meta(key).await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl Debug for OssClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let buckets = match &self.router {
            BucketRouter::Single(bucket) => bucket.name().to_string(),
            BucketRouter::Sharded(_) => "sharded".to_string(),
        };
        write!(f, "OssClient(buckets={}, envelope={:?})", buckets, self.envelope)
    }
}
