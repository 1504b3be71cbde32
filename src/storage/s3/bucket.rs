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
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use object_store::{
    Attribute, AttributeValue, Attributes, ClientOptions, GetOptions as StoreGetOptions,
    GetRange, GetResult, ObjectStore, PutOptions as StorePutOptions, PutPayload, RetryConfig,
};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::io::StreamReader;
use tracing::debug;

use super::sign_v2::V2Presigner;
use crate::storage::config::{SignatureVersion, StorageOptions};
use crate::storage::error::{S3Error, StorageError, StorageResult, S3_NO_SUCH_KEY};
use crate::storage::metadata::{canonical_header_key, ObjectHeaders};
use crate::storage::options::ListRequest;
use crate::storage::provider::ObjectReader;
use crate::storage::router::BucketHandle;
use crate::util::replacer::add_scheme;

/// Error code S3 returns from HEAD when the key does not exist
const S3_NOT_FOUND: &str = "NotFound";

/// Parameters of a GetObject call
#[derive(Debug, Clone, Default)]
pub struct GetObjectInput {
    pub key: String,
    /// Inclusive byte range
    pub range: Option<(u64, u64)>,
    pub response_content_type: Option<String>,
    pub response_content_encoding: Option<String>,
}

impl GetObjectInput {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }
}

/// Result of a GetObject call
pub struct GetObjectOutput {
    pub body: ObjectReader,
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub content_disposition: Option<String>,
    /// User metadata, keys in canonical form
    pub metadata: HashMap<String, String>,
}

/// Result of a HeadObject call
#[derive(Debug, Clone, Default)]
pub struct HeadObjectOutput {
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub content_disposition: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Parameters of a PutObject call
#[derive(Debug, Clone, Default)]
pub struct PutObjectInput {
    pub key: String,
    pub body: Bytes,
    pub content_type: String,
    pub content_encoding: Option<String>,
    pub content_disposition: Option<String>,
    pub cache_control: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    pub metadata: HashMap<String, String>,
}

macro_rules! impl_object_headers {
    ($output:ty) => {
        impl ObjectHeaders for $output {
            fn content_length(&self) -> Option<u64> {
                self.content_length
            }
            fn content_type(&self) -> Option<&str> {
                self.content_type.as_deref()
            }
            fn content_encoding(&self) -> Option<&str> {
                self.content_encoding.as_deref()
            }
            fn content_disposition(&self) -> Option<&str> {
                self.content_disposition.as_deref()
            }
            fn metadata(&self) -> &HashMap<String, String> {
                &self.metadata
            }
        }
    };
}

impl_object_headers!(GetObjectOutput);
impl_object_headers!(HeadObjectOutput);

/// The S3 primitives the adapter is written against, one bucket per handle
#[async_trait]
pub trait S3Bucket: BucketHandle {
    /// Checked before any request on `key` is sent.
    ///
    /// # Errors
    ///
    /// Returns `S3Error::InvalidKey` if the bucket cannot store `key` under
    /// exactly that name.
    fn validate_key(&self, _key: &str) -> Result<(), S3Error> {
        Ok(())
    }

    /// Absence is reported as a service error with code `NoSuchKey`.
    async fn get_object(&self, input: GetObjectInput) -> Result<GetObjectOutput, S3Error>;

    /// Absence is reported as a service error with status 404.
    async fn head_object(&self, key: &str) -> Result<HeadObjectOutput, S3Error>;

    async fn put_object(&self, input: PutObjectInput) -> Result<(), S3Error>;

    async fn delete_object(&self, key: &str) -> Result<(), S3Error>;

    /// One batch delete call.
    async fn delete_objects(&self, keys: &[String]) -> Result<(), S3Error>;

    /// One page of keys in key order. `request.max_keys` is already resolved
    /// to a positive page size.
    ///
    /// [`ObjectStoreBucket`] lists the directory holding the prefix: with a
    /// `/` delimiter that is a single delimited listing of its direct
    /// children. Without one, the whole directory tree is walked from the
    /// marker, skipping keys that sort before the prefix, until the page is
    /// full or the keys pass the prefix. Any other delimiter is filtered
    /// client-side on top of that walk.
    async fn list_objects(&self, request: &ListRequest) -> Result<Vec<String>, S3Error>;

    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, S3Error>;
}

/// [`S3Bucket`] on top of an `object_store` store
///
/// Production buckets are `AmazonS3` stores, which also sign URLs. Any other
/// store can be plugged in; without a signer, presigning fails.
///
/// Keys map one to one onto store paths, so keys the store would rewrite
/// (empty segments as in `a//b`, a leading or trailing `/`, `.` or `..`
/// segments, control characters) are rejected.
pub struct ObjectStoreBucket {
    name: String,
    store: Arc<dyn ObjectStore>,
    signer: Option<Arc<dyn Signer>>,
    v2: Option<V2Presigner>,
}

impl ObjectStoreBucket {
    pub fn new(name: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            name: name.into(),
            store,
            signer: None,
            v2: None,
        }
    }

    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Presign with V2 query authentication instead of the store's signer.
    pub fn with_v2_presigner(mut self, presigner: V2Presigner) -> Self {
        self.v2 = Some(presigner);
        self
    }

    /// Open the physical S3 bucket `bucket_name` with the connection settings
    /// from `options`.
    ///
    /// The store's own retries are disabled: writes are retried by the client
    /// and everything else is not retried at all.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConfigError` if the store cannot be built.
    pub fn from_options(options: &StorageOptions, bucket_name: &str) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(bucket_name)
            .with_access_key_id(&options.access_key_id)
            .with_secret_access_key(&options.access_key_secret)
            .with_region(options.region.as_deref().unwrap_or("us-east-1"))
            .with_virtual_hosted_style_request(!options.force_path_style)
            .with_client_options(Self::build_connection_options(options))
            .with_retry(RetryConfig {
                backoff: Default::default(),
                max_retries: 0,
                retry_timeout: Duration::from_secs(0),
            });

        let endpoint = if options.endpoint.is_empty() {
            None
        } else {
            let endpoint = Self::bucket_endpoint(
                &add_scheme(&options.endpoint, options.ssl),
                bucket_name,
                options.force_path_style,
            );
            builder = builder
                .with_allow_http(endpoint.starts_with("http://"))
                .with_endpoint(&endpoint);
            Some(endpoint)
        };

        let store = Arc::new(builder.build().map_err(|e| {
            StorageError::ConfigError(format!("Failed to create S3 store: {}", e))
        })?);
        let bucket = Self::new(bucket_name, store.clone()).with_signer(store);

        let bucket = match options.signature_version {
            SignatureVersion::V4 => bucket,
            SignatureVersion::V2 => {
                let endpoint = endpoint.ok_or_else(|| {
                    StorageError::ConfigError(
                        "V2 signatures need an explicit endpoint".to_string(),
                    )
                })?;
                bucket.with_v2_presigner(V2Presigner::new(
                    &options.access_key_id,
                    &options.access_key_secret,
                    bucket_name,
                    &endpoint,
                    options.force_path_style,
                ))
            }
        };
        debug!(
            "Opened S3 bucket {} (signature {:?})",
            bucket_name, options.signature_version
        );
        Ok(bucket)
    }

    /// Virtual-hosted requests expect the endpoint to already name the bucket.
    fn bucket_endpoint(endpoint: &str, bucket_name: &str, force_path_style: bool) -> String {
        let endpoint = endpoint.trim_end_matches('/');
        if force_path_style {
            return endpoint.to_string();
        }
        match endpoint.split_once("://") {
            Some((scheme, host)) => format!("{}://{}.{}", scheme, bucket_name, host),
            None => format!("{}.{}", bucket_name, endpoint),
        }
    }

    fn build_connection_options(options: &StorageOptions) -> ClientOptions {
        let http = &options.http;
        let mut client_options = ClientOptions::default()
            .with_pool_idle_timeout(http.pool_idle_timeout())
            .with_pool_max_idle_per_host(http.pool_max_idle_per_host);
        client_options = match http.timeout() {
            Some(timeout) => client_options.with_timeout(timeout),
            None => client_options.with_timeout_disabled(),
        };
        if let Some(connect_timeout) = http.connect_timeout() {
            client_options = client_options.with_connect_timeout(connect_timeout);
        }
        client_options
    }

    /// Store path for `key`, exactly as given.
    fn path(key: &str) -> Result<ObjectPath, S3Error> {
        match ObjectPath::parse(key) {
            Ok(path) if path.as_ref() == key => Ok(path),
            Ok(_) => Err(S3Error::InvalidKey(format!(
                "'{}' starts or ends with '/'",
                key
            ))),
            Err(e) => Err(S3Error::InvalidKey(format!("'{}': {}", key, e))),
        }
    }

    /// Direct children of `parent` that fall in the page `request` asks for.
    async fn list_children(
        &self,
        parent: Option<&ObjectPath>,
        request: &ListRequest,
    ) -> Result<Vec<String>, S3Error> {
        let listing = self.store.list_with_delimiter(parent).await?;
        let mut keys: Vec<String> = listing
            .objects
            .into_iter()
            .map(|meta| meta.location.to_string())
            .filter(|key| {
                key.starts_with(request.prefix.as_str()) && key.as_str() > request.marker.as_str()
            })
            .collect();
        keys.sort_unstable();
        keys.truncate(request.max_keys);
        Ok(keys)
    }

    fn read_attributes(attributes: &Attributes) -> ResponseAttributes {
        let mut response = ResponseAttributes::default();
        for (attribute, value) in attributes.iter() {
            let value: &str = value.as_ref();
            match attribute {
                Attribute::ContentType => response.content_type = Some(value.to_string()),
                Attribute::ContentEncoding => response.content_encoding = Some(value.to_string()),
                Attribute::ContentDisposition => {
                    response.content_disposition = Some(value.to_string())
                }
                Attribute::Metadata(name) => {
                    response
                        .metadata
                        .insert(canonical_header_key(name), value.to_string());
                }
                _ => {}
            }
        }
        response
    }

    fn into_reader(result: GetResult) -> ObjectReader {
        let stream = result
            .into_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        Box::new(StreamReader::new(stream))
    }
}

#[derive(Default)]
struct ResponseAttributes {
    content_type: Option<String>,
    content_encoding: Option<String>,
    content_disposition: Option<String>,
    metadata: HashMap<String, String>,
}

/// Translate a store error into the error S3 itself would have answered.
fn service_error(e: object_store::Error, not_found_code: &str) -> S3Error {
    match e {
        object_store::Error::NotFound { path, source } => S3Error::Service {
            code: not_found_code.to_string(),
            status_code: 404,
            message: format!("{}: {}", path, source),
        },
        other => S3Error::Transport(other),
    }
}

#[async_trait]
impl S3Bucket for ObjectStoreBucket {
    async fn get_object(&self, input: GetObjectInput) -> Result<GetObjectOutput, S3Error> {
        let options = StoreGetOptions {
            range: input
                .range
                .map(|(start, end)| GetRange::Bounded(start as usize..end as usize + 1)),
            ..Default::default()
        };
        let result = self
            .store
            .get_opts(&Self::path(&input.key)?, options)
            .await
            .map_err(|e| service_error(e, S3_NO_SUCH_KEY))?;

        let attributes = Self::read_attributes(&result.attributes);
        let content_length = (result.range.end - result.range.start) as u64;

        Ok(GetObjectOutput {
            content_length: Some(content_length),
            content_type: input.response_content_type.or(attributes.content_type),
            content_encoding: input
                .response_content_encoding
                .or(attributes.content_encoding),
            content_disposition: attributes.content_disposition,
            metadata: attributes.metadata,
            body: Self::into_reader(result),
        })
    }

    async fn head_object(&self, key: &str) -> Result<HeadObjectOutput, S3Error> {
        let options = StoreGetOptions {
            head: true,
            ..Default::default()
        };
        let result = self
            .store
            .get_opts(&Self::path(key)?, options)
            .await
            .map_err(|e| service_error(e, S3_NOT_FOUND))?;

        let attributes = Self::read_attributes(&result.attributes);
        Ok(HeadObjectOutput {
            content_length: Some(result.meta.size as u64),
            content_type: attributes.content_type,
            content_encoding: attributes.content_encoding,
            content_disposition: attributes.content_disposition,
            metadata: attributes.metadata,
        })
    }

    async fn put_object(&self, input: PutObjectInput) -> Result<(), S3Error> {
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, AttributeValue::from(input.content_type));
        let optional = [
            (Attribute::ContentEncoding, input.content_encoding),
            (Attribute::ContentDisposition, input.content_disposition),
            (Attribute::CacheControl, input.cache_control),
        ];
        for (attribute, value) in optional {
            if let Some(value) = value {
                attributes.insert(attribute, AttributeValue::from(value));
            }
        }
        for (name, value) in input.metadata {
            attributes.insert(
                Attribute::Metadata(canonical_header_key(&name).into()),
                AttributeValue::from(value),
            );
        }
        if let Some(expires) = input.expires {
            debug!(
                "Expires ({}) is not forwarded for {}, the store has no such attribute",
                expires, input.key
            );
        }

        let options = StorePutOptions {
            attributes,
            ..Default::default()
        };
        self.store
            .put_opts(&Self::path(&input.key)?, PutPayload::from(input.body), options)
            .await?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), S3Error> {
        match self.store.delete(&Self::path(key)?).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<(), S3Error> {
        let locations = keys
            .iter()
            .map(|k| Self::path(k))
            .collect::<Result<Vec<_>, _>>()?;
        let locations = stream::iter(locations.into_iter().map(Ok)).boxed();
        let mut results = self.store.delete_stream(locations);
        while let Some(result) = results.next().await {
            match result {
                Ok(_) | Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn list_objects(&self, request: &ListRequest) -> Result<Vec<String>, S3Error> {
        // The store lists whole directories; start from the prefix's parent
        // and filter down to the prefix.
        let parent = match request.prefix.rfind('/') {
            Some(i) => Some(Self::path(&request.prefix[..i])?),
            None => None,
        };
        if request.delimiter == "/" {
            return self.list_children(parent.as_ref(), request).await;
        }

        let mut entries = if request.marker.is_empty() {
            self.store.list(parent.as_ref())
        } else {
            self.store
                .list_with_offset(parent.as_ref(), &Self::path(&request.marker)?)
        };

        let mut keys = Vec::new();
        while let Some(meta) = entries.next().await {
            let key = meta?.location.to_string();
            let Some(rest) = key.strip_prefix(request.prefix.as_str()) else {
                if key.as_str() > request.prefix.as_str() {
                    break;
                }
                continue;
            };
            if !request.delimiter.is_empty() && rest.contains(request.delimiter.as_str()) {
                continue;
            }
            keys.push(key);
            if keys.len() >= request.max_keys {
                break;
            }
        }
        Ok(keys)
    }

    fn validate_key(&self, key: &str) -> Result<(), S3Error> {
        Self::path(key).map(|_| ())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, S3Error> {
        let path = Self::path(key)?;
        if let Some(v2) = &self.v2 {
            return v2.presign_get(key, expires_in);
        }
        let signer = self
            .signer
            .as_ref()
            .ok_or(S3Error::Transport(object_store::Error::NotImplemented))?;
        let url = signer
            .signed_url(reqwest::Method::GET, &path, expires_in)
            .await?;
        Ok(url.to_string())
    }
}

impl BucketHandle for ObjectStoreBucket {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Debug for ObjectStoreBucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "ObjectStoreBucket(name={}, store={}, signer={}, v2={})",
            self.name,
            self.store,
            self.signer.is_some(),
            self.v2.is_some()
        )
    }
}
