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

use std::sync::Arc;
use tracing::info;

use super::config::{StorageOptions, StorageType};
use super::envelope::Envelope;
use super::error::{StorageError, StorageResult};
use super::oss::{HttpOssBucket, OssBucket, OssClient};
use super::provider::ObjectClient;
use super::router::{BucketRouter, ShardMap};
use super::s3::{ObjectStoreBucket, S3Bucket, S3Client};
use crate::compress::CompressorRegistry;
use crate::util::replacer::{EndpointReplacer, PresignedUrlReplacer, UrlRewriter};

/// Factory for creating storage clients
pub struct StorageClientFactory;

impl StorageClientFactory {
    /// Create a client from options, with the default codecs and no URL
    /// rewriting.
    ///
    /// # Arguments
    ///
    /// * `options` - Backend, credentials, bucket and sharding configuration
    ///
    /// # Returns
    ///
    /// A `Result` containing:
    /// * `Ok(Arc<dyn ObjectClient>)` - A thread-safe reference to the client
    /// * `Err(StorageError)` - If the client cannot be created
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * The options are invalid (see [`StorageOptions::validate`])
    /// * Compression names a codec that is not registered
    /// * A bucket handle cannot be initialized
    pub fn from_options(options: StorageOptions) -> StorageResult<Arc<dyn ObjectClient>> {
        Self::builder(options).build()
    }

    /// Start a builder for clients that need a custom codec registry or URL
    /// rewriting hooks.
    pub fn builder(options: StorageOptions) -> StorageClientBuilder {
        StorageClientBuilder::new(options)
    }
}

/// Builder for [`ObjectClient`] instances
pub struct StorageClientBuilder {
    options: StorageOptions,
    registry: Option<Arc<CompressorRegistry>>,
    rewriter: UrlRewriter,
}

impl StorageClientBuilder {
    pub fn new(options: StorageOptions) -> Self {
        Self {
            options,
            registry: None,
            rewriter: UrlRewriter::default(),
        }
    }

    /// Use a shared codec registry instead of a fresh one with the defaults.
    pub fn with_registry(mut self, registry: Arc<CompressorRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Rewrite the endpoint of every signed URL.
    pub fn with_endpoint_replacer(mut self, replacer: EndpointReplacer) -> Self {
        self.rewriter.endpoint = Some(replacer);
        self
    }

    /// Rewrite every signed URL as a whole, after the endpoint replacer.
    pub fn with_presigned_url_replacer(mut self, replacer: PresignedUrlReplacer) -> Self {
        self.rewriter.presigned = Some(replacer);
        self
    }

    /// Validate the options and open one bucket handle per physical bucket.
    ///
    /// No request is sent; connection problems show up on the first call.
    pub fn build(self) -> StorageResult<Arc<dyn ObjectClient>> {
        let options = self.options;
        options.validate()?;

        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(CompressorRegistry::with_defaults()));
        if options.compress.enabled && registry.get(&options.compress.codec).is_none() {
            return Err(StorageError::UnsupportedCompressor(
                options.compress.codec.clone(),
            ));
        }
        let envelope = Envelope::new(options.compress.clone(), registry, self.rewriter);

        let client: Arc<dyn ObjectClient> = match options.storage_type() {
            StorageType::S3 => {
                let router = build_router(&options, |name| {
                    Ok(Arc::new(ObjectStoreBucket::from_options(&options, name)?) as Arc<dyn S3Bucket>)
                })?;
                Arc::new(S3Client::new(router, envelope))
            }
            StorageType::Oss => {
                let router = build_router(&options, |name| {
                    Ok(Arc::new(HttpOssBucket::from_options(&options, name)?) as Arc<dyn OssBucket>)
                })?;
                Arc::new(OssClient::new(router, envelope))
            }
        };

        info!(
            "Created {} client for bucket {} (shards: {:?}, compression: {})",
            options.storage_type().as_str(),
            options.bucket,
            options.shards,
            if options.compress.enabled {
                options.compress.codec.as_str()
            } else {
                "off"
            }
        );
        Ok(client)
    }
}

/// One handle per shard group, or a single handle for the base bucket.
fn build_router<B, F>(options: &StorageOptions, mut open: F) -> StorageResult<BucketRouter<B>>
where
    B: super::router::BucketHandle + ?Sized,
    F: FnMut(&str) -> StorageResult<Arc<B>>,
{
    let shards = ShardMap::build(&options.shards, |shard| {
        open(&options.shard_bucket_name(shard))
    })?;
    let default = if shards.is_empty() {
        Some(open(&options.bucket)?)
    } else {
        None
    };
    BucketRouter::new(default, shards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::{CompressionMarker, Compressor};
    use crate::util::replacer::replace_endpoint;
    use std::io::{Cursor, Read};

    fn s3_options() -> StorageOptions {
        StorageOptions::s3("content")
            .with_credentials("ak", "sk")
            .with_endpoint("http://127.0.0.1:9000")
            .with_force_path_style(true)
    }

    fn oss_options() -> StorageOptions {
        StorageOptions::oss("content")
            .with_credentials("ak", "sk")
            .with_endpoint("oss-cn-hangzhou-internal.aliyuncs.com")
    }

    struct Identity;

    impl Compressor for Identity {
        fn content_encoding(&self) -> &str {
            "identity"
        }

        fn marker(&self) -> CompressionMarker {
            CompressionMarker::ContentEncoding
        }

        fn compress(&self, reader: &mut dyn Read) -> StorageResult<(Cursor<Vec<u8>>, u64)> {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf)?;
            let len = buf.len() as u64;
            Ok((Cursor::new(buf), len))
        }
    }

    #[test]
    fn test_from_options_s3() {
        let client = StorageClientFactory::from_options(s3_options()).unwrap();
        assert_eq!(client.storage_type(), StorageType::S3);
    }

    #[test]
    fn test_from_options_oss_sharded() {
        let client =
            StorageClientFactory::from_options(oss_options().with_shards(["abc", "def"])).unwrap();
        assert_eq!(client.storage_type(), StorageType::Oss);
    }

    #[test]
    fn test_invalid_options_fail_early() {
        assert!(matches!(
            StorageClientFactory::from_options(StorageOptions::s3("")),
            Err(StorageError::ConfigError(_))
        ));
        assert!(matches!(
            StorageClientFactory::from_options(s3_options().with_shards(["abc", ""])),
            Err(StorageError::ConfigError(_))
        ));
        assert!(matches!(
            StorageClientFactory::from_options(StorageOptions::oss("content")),
            Err(StorageError::ConfigError(_))
        ));
    }

    #[test]
    fn test_unregistered_codec_fails_at_construction() {
        let result = StorageClientFactory::from_options(s3_options().with_compression("zstd", 0));
        assert!(matches!(
            result,
            Err(StorageError::UnsupportedCompressor(name)) if name == "zstd"
        ));
    }

    #[test]
    fn test_builder_with_custom_registry() {
        let registry = Arc::new(CompressorRegistry::with_defaults());
        registry.register(Arc::new(Identity));

        let client = StorageClientFactory::builder(oss_options().with_compression("identity", 1024))
            .with_registry(registry)
            .with_endpoint_replacer(replace_endpoint("cdn.example.com", true))
            .build()
            .unwrap();
        assert_eq!(client.storage_type(), StorageType::Oss);
    }

    #[tokio::test]
    async fn test_built_oss_client_signs_with_rewriting() {
        let client = StorageClientFactory::builder(oss_options())
            .with_presigned_url_replacer(crate::util::replacer::to_public_oss_host(true))
            .build()
            .unwrap();

        let url = client.sign_url("a/b.png", 300).await.unwrap();
        assert!(url.starts_with("https://content.oss-cn-hangzhou.aliyuncs.com/a/b.png?"));
        assert!(url.contains("OSSAccessKeyId=ak"));
    }

    #[tokio::test]
    async fn test_built_sharded_client_routes_before_any_request() {
        let client =
            StorageClientFactory::from_options(oss_options().with_shards(["abc", "def"])).unwrap();
        assert!(matches!(
            client.exists("key-z").await,
            Err(StorageError::RoutingError { suffix: 'z', .. })
        ));
        let url = client.sign_url("key-E", 60).await.unwrap();
        assert!(url.starts_with("http://content-def.oss-cn-hangzhou-internal.aliyuncs.com/key-E?"));
    }
}
