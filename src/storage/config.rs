// Copyright 2022 Adobe. All rights reserved.
// This file is licensed to you under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License. You may obtain a copy
// of the License at http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under
// the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR REPRESENTATIONS
// OF ANY KIND, either express or implied. See the License for the specific language
// governing permissions and limitations under the License.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::time::Duration;

use super::error::{StorageError, StorageResult};

/// Storage backend type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// S3-compatible storage (AWS S3, MinIO, ...)
    #[serde(alias = "aws")]
    S3,
    /// Alibaba Cloud OSS
    Oss,
}

impl StorageType {
    /// Get the storage type as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageType::S3 => "s3",
            StorageType::Oss => "oss",
        }
    }
}

impl FromStr for StorageType {
    type Err = StorageError;

    /// Parse a storage type, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConfigError` naming the value when it is neither
    /// `s3` (or its alias `aws`) nor `oss`.
    fn from_str(s: &str) -> StorageResult<Self> {
        match s.to_lowercase().as_str() {
            "s3" | "aws" => Ok(StorageType::S3),
            "oss" => Ok(StorageType::Oss),
            _ => Err(StorageError::ConfigError(format!(
                "Unknown storage type '{}', expected 's3' or 'oss'",
                s
            ))),
        }
    }
}

impl Display for StorageType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// How S3 presigned URLs are signed
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SignatureVersion {
    /// AWS Signature Version 4
    #[default]
    V4,
    /// Legacy HMAC-SHA1 query signing, for old S3-compatible services
    V2,
}

/// HTTP transport tuning shared by both backends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpOptions {
    /// Whole-request timeout in seconds, `0` disables it
    pub timeout_secs: u64,
    /// Connect timeout in seconds, `0` keeps the transport default
    pub connect_timeout_secs: u64,
    /// Idle pooled connections are closed after this many seconds
    pub pool_idle_timeout_secs: u64,
    /// Maximum idle pooled connections per host
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            connect_timeout_secs: 30,
            pool_idle_timeout_secs: 15,
            pool_max_idle_per_host: 5,
        }
    }
}

impl HttpOptions {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_secs > 0).then(|| Duration::from_secs(self.connect_timeout_secs))
    }

    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }
}

/// Transparent compression applied by `put`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressOptions {
    /// Compress bodies on `put`
    pub enabled: bool,
    /// Registered codec name (content-encoding)
    pub codec: String,
    /// Only bodies strictly larger than this many bytes are compressed
    pub threshold: u64,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            codec: "gzip".to_string(),
            threshold: 0,
        }
    }
}

/// Configuration for one logical bucket
///
/// The storage type is fixed when the value is created; everything else is
/// adjusted through the `with_*` methods before the value is handed to the
/// factory.
///
/// # Examples
///
/// ## S3 with shards
/// ```
/// use blobgate::storage::StorageOptions;
///
/// let options = StorageOptions::s3("content")
///     .with_credentials("ACCESS_KEY", "SECRET_KEY")
///     .with_region("us-east-1")
///     .with_shards(["abc", "def"]);
/// assert_eq!(options.storage_type().as_str(), "s3");
/// ```
///
/// ## OSS
/// ```
/// use blobgate::storage::StorageOptions;
///
/// let options = StorageOptions::oss("content")
///     .with_credentials("ACCESS_KEY", "SECRET_KEY")
///     .with_endpoint("oss-cn-hangzhou.aliyuncs.com");
/// assert_eq!(options.storage_type().as_str(), "oss");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageOptions {
    #[serde(rename = "type")]
    storage_type: StorageType,

    pub access_key_id: String,

    pub access_key_secret: String,

    /// Service endpoint, with or without scheme. Empty means the AWS default
    /// endpoint for S3.
    #[serde(default)]
    pub endpoint: String,

    /// Logical bucket name; shard buckets are named `{bucket}-{shard}`
    pub bucket: String,

    /// Shard suffix groups, e.g. `["abc", "def"]`
    #[serde(default)]
    pub shards: Vec<String>,

    /// S3 region
    #[serde(default)]
    pub region: Option<String>,

    /// S3 only: address buckets as `endpoint/bucket` (MinIO)
    #[serde(default)]
    pub force_path_style: bool,

    /// S3 only: signature scheme of presigned URLs
    #[serde(default)]
    pub signature_version: SignatureVersion,

    /// Use https when the endpoint carries no scheme
    #[serde(default)]
    pub ssl: bool,

    #[serde(default)]
    pub http: HttpOptions,

    #[serde(default)]
    pub compress: CompressOptions,
}

impl StorageOptions {
    /// Create options for the named storage type.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConfigError` if the storage type is unknown.
    pub fn new(storage_type: &str, bucket: impl Into<String>) -> StorageResult<Self> {
        Ok(Self::with_type(storage_type.parse()?, bucket))
    }

    /// Create S3 options for a bucket.
    pub fn s3(bucket: impl Into<String>) -> Self {
        Self::with_type(StorageType::S3, bucket)
    }

    /// Create OSS options for a bucket.
    pub fn oss(bucket: impl Into<String>) -> Self {
        Self::with_type(StorageType::Oss, bucket)
    }

    fn with_type(storage_type: StorageType, bucket: impl Into<String>) -> Self {
        Self {
            storage_type,
            access_key_id: String::new(),
            access_key_secret: String::new(),
            endpoint: String::new(),
            bucket: bucket.into(),
            shards: Vec::new(),
            region: None,
            force_path_style: false,
            signature_version: SignatureVersion::V4,
            ssl: false,
            http: HttpOptions::default(),
            compress: CompressOptions::default(),
        }
    }

    pub fn storage_type(&self) -> StorageType {
        self.storage_type
    }

    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
    ) -> Self {
        self.access_key_id = access_key_id.into();
        self.access_key_secret = access_key_secret.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_shards<I, S>(mut self, shards: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shards = shards.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_force_path_style(mut self, force_path_style: bool) -> Self {
        self.force_path_style = force_path_style;
        self
    }

    pub fn with_signature_version(mut self, signature_version: SignatureVersion) -> Self {
        self.signature_version = signature_version;
        self
    }

    pub fn with_ssl(mut self, ssl: bool) -> Self {
        self.ssl = ssl;
        self
    }

    pub fn with_http(mut self, http: HttpOptions) -> Self {
        self.http = http;
        self
    }

    /// Enable transparent compression with the named codec.
    pub fn with_compression(mut self, codec: impl Into<String>, threshold: u64) -> Self {
        self.compress = CompressOptions {
            enabled: true,
            codec: codec.into(),
            threshold,
        };
        self
    }

    /// Physical bucket name for a shard group.
    pub fn shard_bucket_name(&self, shard: &str) -> String {
        format!("{}-{}", self.bucket, shard)
    }

    /// Check the options before any client is built.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConfigError` if:
    /// * The bucket name is empty
    /// * A shard group is empty
    /// * Compression is enabled without a codec name
    pub fn validate(&self) -> StorageResult<()> {
        if self.bucket.is_empty() {
            return Err(StorageError::ConfigError(
                "Bucket name must not be empty".to_string(),
            ));
        }
        if let Some(index) = self.shards.iter().position(String::is_empty) {
            return Err(StorageError::ConfigError(format!(
                "Shard group #{} is empty",
                index
            )));
        }
        if self.compress.enabled && self.compress.codec.is_empty() {
            return Err(StorageError::ConfigError(
                "Compression is enabled but no codec is named".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_type_from_str() {
        assert_eq!("s3".parse::<StorageType>().unwrap(), StorageType::S3);
        assert_eq!("AWS".parse::<StorageType>().unwrap(), StorageType::S3);
        assert_eq!("Oss".parse::<StorageType>().unwrap(), StorageType::Oss);
    }

    #[test]
    fn test_storage_type_from_str_invalid_names_value() {
        let err = "gcs".parse::<StorageType>().unwrap_err();
        match err {
            StorageError::ConfigError(msg) => assert!(msg.contains("'gcs'")),
            other => panic!("Expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_storage_type_serialization() {
        assert_eq!(serde_json::to_string(&StorageType::S3).unwrap(), "\"s3\"");
        assert_eq!(serde_json::to_string(&StorageType::Oss).unwrap(), "\"oss\"");

        let aws: StorageType = serde_json::from_str("\"aws\"").unwrap();
        assert_eq!(aws, StorageType::S3);
    }

    #[test]
    fn test_new_with_unknown_type() {
        assert!(matches!(
            StorageOptions::new("azure", "bucket"),
            Err(StorageError::ConfigError(_))
        ));
    }

    #[test]
    fn test_builder_methods() {
        let options = StorageOptions::s3("content")
            .with_credentials("ak", "sk")
            .with_endpoint("127.0.0.1:9000")
            .with_region("cn-north-1")
            .with_shards(["abc", "def"])
            .with_force_path_style(true)
            .with_ssl(false);

        assert_eq!(options.storage_type(), StorageType::S3);
        assert_eq!(options.access_key_id, "ak");
        assert_eq!(options.access_key_secret, "sk");
        assert_eq!(options.endpoint, "127.0.0.1:9000");
        assert_eq!(options.region.as_deref(), Some("cn-north-1"));
        assert_eq!(options.shards, vec!["abc", "def"]);
        assert!(options.force_path_style);
        assert!(!options.ssl);
        assert_eq!(options.signature_version, SignatureVersion::V4);
        assert_eq!(
            options
                .with_signature_version(SignatureVersion::V2)
                .signature_version,
            SignatureVersion::V2
        );
    }

    #[test]
    fn test_shard_bucket_name() {
        let options = StorageOptions::oss("content");
        assert_eq!(options.shard_bucket_name("abc"), "content-abc");
    }

    #[test]
    fn test_validate_rejects_empty_shard() {
        let options = StorageOptions::s3("content").with_shards(["abc", ""]);
        assert!(matches!(
            options.validate(),
            Err(StorageError::ConfigError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_bucket() {
        assert!(StorageOptions::s3("").validate().is_err());
        assert!(StorageOptions::s3("content").validate().is_ok());
    }

    #[test]
    fn test_with_compression_later_call_wins() {
        let options = StorageOptions::s3("content")
            .with_compression("gzip", 1024)
            .with_compression("snappy", 10);
        assert!(options.compress.enabled);
        assert_eq!(options.compress.codec, "snappy");
        assert_eq!(options.compress.threshold, 10);
    }

    #[test]
    fn test_http_defaults() {
        let http = HttpOptions::default();
        assert_eq!(http.timeout(), Some(Duration::from_secs(60)));
        assert_eq!(http.connect_timeout(), Some(Duration::from_secs(30)));

        let disabled = HttpOptions {
            timeout_secs: 0,
            ..HttpOptions::default()
        };
        assert_eq!(disabled.timeout(), None);
    }

    #[test]
    fn test_config_deserialization() {
        let json = r#"{
            "type": "oss",
            "access_key_id": "ak",
            "access_key_secret": "sk",
            "endpoint": "oss-cn-hangzhou.aliyuncs.com",
            "bucket": "content",
            "shards": ["abc", "def"],
            "compress": {"enabled": true, "codec": "gzip", "threshold": 512}
        }"#;
        let options: StorageOptions = serde_json::from_str(json).unwrap();

        assert_eq!(options.storage_type(), StorageType::Oss);
        assert_eq!(options.shards.len(), 2);
        assert!(options.compress.enabled);
        assert_eq!(options.compress.threshold, 512);
        assert_eq!(options.http, HttpOptions::default());
        assert!(!options.ssl);
        assert_eq!(options.signature_version, SignatureVersion::V4);
    }

    #[test]
    fn test_config_deserialization_signature_version() {
        let json = r#"{
            "type": "s3",
            "access_key_id": "ak",
            "access_key_secret": "sk",
            "endpoint": "s3v2-compatible.com",
            "bucket": "content",
            "signature_version": "v2"
        }"#;
        let options: StorageOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.signature_version, SignatureVersion::V2);
    }

    #[test]
    fn test_config_deserialization_rejects_unknown_type() {
        let json = r#"{"type":"gcs","access_key_id":"","access_key_secret":"","bucket":"b"}"#;
        assert!(serde_json::from_str::<StorageOptions>(json).is_err());
    }

    #[test]
    fn test_config_serialization() {
        let options = StorageOptions::s3("test-bucket").with_region("us-east-1");
        let json = serde_json::to_string(&options).unwrap();
        assert!(json.contains("\"type\":\"s3\""));
        assert!(json.contains("\"bucket\":\"test-bucket\""));
    }
}
