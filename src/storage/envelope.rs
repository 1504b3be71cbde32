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

//! Logic shared by both backend adapters: body handling, compression on the
//! way in and out, the write retry and signed URL rewriting.

use bytes::Bytes;
use std::fmt::Display;
use std::future::Future;
use std::io::SeekFrom;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, warn};

use super::config::CompressOptions;
use super::error::{StorageError, StorageResult};
use super::metadata::{ObjectMetadata, COMPRESSOR_META_KEY};
use super::options::PutOptions;
use super::provider::{ObjectReader, ObjectSource};
use crate::compress::{decode_snappy, CompressionMarker, CompressorRegistry, SnappyCompressor, SNAPPY};
use crate::util::replacer::UrlRewriter;
use crate::util::retry::{retry_fixed, RetryPolicy};

/// Per-client settings layered around the raw backend calls
#[derive(Debug, Clone)]
pub struct Envelope {
    compress: CompressOptions,
    registry: Arc<CompressorRegistry>,
    rewriter: UrlRewriter,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new(
            CompressOptions::default(),
            Arc::new(CompressorRegistry::with_defaults()),
            UrlRewriter::default(),
        )
    }
}

impl Envelope {
    pub fn new(
        compress: CompressOptions,
        registry: Arc<CompressorRegistry>,
        rewriter: UrlRewriter,
    ) -> Self {
        Self {
            compress,
            registry,
            rewriter,
        }
    }

    /// Compress a `put` body when the client is configured to.
    ///
    /// Nothing happens when compression is disabled, when the caller already
    /// set a content encoding, or when the body is not larger than the
    /// threshold. Otherwise the body is replaced by its compressed form and
    /// the codec's marker is stamped into `meta` or the returned options.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::UnsupportedCompressor` if the configured codec
    /// is not registered.
    pub fn compress_for_put(
        &self,
        body: Bytes,
        meta: &mut ObjectMetadata,
        options: &PutOptions,
    ) -> StorageResult<(Bytes, PutOptions)> {
        let mut options = options.clone();
        if !self.compress.enabled
            || options.content_encoding.is_some()
            || body.len() as u64 <= self.compress.threshold
        {
            return Ok((body, options));
        }

        let compressor = self
            .registry
            .get(&self.compress.codec)
            .ok_or_else(|| StorageError::UnsupportedCompressor(self.compress.codec.clone()))?;
        let original_len = body.len();
        let (compressed, length) = compressor.compress(&mut body.as_ref())?;
        debug!(
            "Compressed put body with {}: {} -> {} bytes",
            compressor.content_encoding(),
            original_len,
            length
        );

        match compressor.marker() {
            CompressionMarker::ContentEncoding => {
                options.content_encoding = Some(compressor.content_encoding().to_string());
            }
            CompressionMarker::Metadata => {
                meta.insert(
                    COMPRESSOR_META_KEY.to_string(),
                    compressor.content_encoding().to_string(),
                );
            }
        }
        Ok((Bytes::from(compressed.into_inner()), options))
    }

    /// Apply the URL rewriting hooks to a freshly signed URL.
    pub fn rewrite_url(&self, signed: String) -> StorageResult<String> {
        self.rewriter.apply(signed)
    }
}

/// Read `source` from its current position to the end.
pub async fn read_source(source: &mut dyn ObjectSource) -> StorageResult<Bytes> {
    let mut buf = Vec::new();
    source.read_to_end(&mut buf).await?;
    Ok(Bytes::from(buf))
}

/// Drain a backend body into memory.
pub async fn read_body(mut reader: ObjectReader) -> StorageResult<Bytes> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(Bytes::from(buf))
}

/// Snappy block-encode `body` and mark it in `meta`.
pub fn snappy_body(body: &[u8], meta: &mut ObjectMetadata) -> StorageResult<Bytes> {
    let encoded = SnappyCompressor.encode(body)?;
    meta.insert(COMPRESSOR_META_KEY.to_string(), SNAPPY.to_string());
    Ok(Bytes::from(encoded))
}

/// Undo the compression named by an object's `Compressor` entry.
///
/// # Errors
///
/// * `StorageError::UnsupportedCompressor` - the entry names another codec
/// * `StorageError::CompressionError` - the payload does not decode
pub fn decompress(content: Bytes, compressor: Option<&str>) -> StorageResult<Bytes> {
    match compressor {
        None => Ok(content),
        Some(SNAPPY) => Ok(Bytes::from(decode_snappy(&content)?)),
        Some(other) => Err(StorageError::UnsupportedCompressor(other.to_string())),
    }
}

/// Inclusive bounds of the byte range `offset..offset + length`.
///
/// # Errors
///
/// Returns `StorageError::InvalidRange` for an empty or overflowing range.
pub fn inclusive_range(offset: u64, length: u64) -> StorageResult<(u64, u64)> {
    if length == 0 {
        return Err(StorageError::InvalidRange { offset, length });
    }
    let end = offset
        .checked_add(length - 1)
        .ok_or(StorageError::InvalidRange { offset, length })?;
    Ok((offset, end))
}

/// Run an upload under the write retry policy.
///
/// When every attempt fails, `source` is rewound to offset 0 so the caller
/// can hand it out again, and the last attempt's error is returned.
pub async fn upload_with_retry<F, Fut, E>(
    key: &str,
    source: &mut dyn ObjectSource,
    upload: F,
) -> StorageResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display + Into<StorageError>,
{
    let operation = format!("put {}", key);
    match retry_fixed(RetryPolicy::PUT, &operation, upload).await {
        Ok(()) => Ok(()),
        Err(e) => {
            if let Err(seek_error) = source.seek(SeekFrom::Start(0)).await {
                warn!("Failed to rewind source of {}: {}", key, seek_error);
            }
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::{Compressor, GzipCompressor, GZIP};
    use std::io::Cursor;

    fn enabled(codec: &str, threshold: u64) -> Envelope {
        Envelope::new(
            CompressOptions {
                enabled: true,
                codec: codec.to_string(),
                threshold,
            },
            Arc::new(CompressorRegistry::with_defaults()),
            UrlRewriter::default(),
        )
    }

    #[test]
    fn test_compression_disabled_passes_body_through() {
        let mut meta = ObjectMetadata::new();
        let body = Bytes::from_static(b"0123456789");
        let (out, options) = Envelope::default()
            .compress_for_put(body.clone(), &mut meta, &PutOptions::default())
            .unwrap();
        assert_eq!(out, body);
        assert!(options.content_encoding.is_none());
        assert!(meta.is_empty());
    }

    #[test]
    fn test_gzip_marks_content_encoding() {
        let mut meta = ObjectMetadata::new();
        let body = Bytes::from(b"abcabcabc".repeat(100));
        let (out, options) = enabled(GZIP, 10)
            .compress_for_put(body.clone(), &mut meta, &PutOptions::default())
            .unwrap();

        assert_ne!(out, body);
        assert_eq!(options.content_encoding.as_deref(), Some("gzip"));
        assert!(meta.is_empty());

        let (expected, _) = GzipCompressor.compress(&mut body.as_ref()).unwrap();
        assert_eq!(out.as_ref(), expected.get_ref().as_slice());
    }

    #[test]
    fn test_snappy_marks_metadata() {
        let mut meta = ObjectMetadata::new();
        let body = Bytes::from(b"abcabcabc".repeat(100));
        let (out, options) = enabled(SNAPPY, 0)
            .compress_for_put(body.clone(), &mut meta, &PutOptions::default())
            .unwrap();

        assert!(options.content_encoding.is_none());
        assert_eq!(meta.get(COMPRESSOR_META_KEY).map(String::as_str), Some("snappy"));
        assert_eq!(decompress(out, Some(SNAPPY)).unwrap(), body);
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut meta = ObjectMetadata::new();
        let body = Bytes::from_static(b"0123456789");
        let (out, options) = enabled(GZIP, 10)
            .compress_for_put(body.clone(), &mut meta, &PutOptions::default())
            .unwrap();
        assert_eq!(out, body);
        assert!(options.content_encoding.is_none());
    }

    #[test]
    fn test_explicit_content_encoding_skips_compression() {
        let mut meta = ObjectMetadata::new();
        let body = Bytes::from(b"x".repeat(100));
        let (out, options) = enabled(GZIP, 0)
            .compress_for_put(
                body.clone(),
                &mut meta,
                &PutOptions::default().with_content_encoding("br"),
            )
            .unwrap();
        assert_eq!(out, body);
        assert_eq!(options.content_encoding.as_deref(), Some("br"));
    }

    #[test]
    fn test_unregistered_codec_fails() {
        let mut meta = ObjectMetadata::new();
        let result = enabled("zstd", 0).compress_for_put(
            Bytes::from_static(b"payload"),
            &mut meta,
            &PutOptions::default(),
        );
        assert!(matches!(result, Err(StorageError::UnsupportedCompressor(name)) if name == "zstd"));
    }

    #[test]
    fn test_decompress() {
        let raw = Bytes::from_static(b"raw");
        assert_eq!(decompress(raw.clone(), None).unwrap(), raw);
        assert!(matches!(
            decompress(raw, Some("gzip")),
            Err(StorageError::UnsupportedCompressor(_))
        ));
    }

    #[test]
    fn test_snappy_body_stamps_marker() {
        let mut meta = ObjectMetadata::new();
        let encoded = snappy_body(b"hello", &mut meta).unwrap();
        assert_eq!(meta.get("Compressor").map(String::as_str), Some("snappy"));
        assert_eq!(decode_snappy(&encoded).unwrap(), b"hello");
    }

    #[test]
    fn test_inclusive_range() {
        assert_eq!(inclusive_range(3, 3).unwrap(), (3, 5));
        assert_eq!(inclusive_range(0, 1).unwrap(), (0, 0));
        assert!(matches!(
            inclusive_range(3, 0),
            Err(StorageError::InvalidRange { offset: 3, length: 0 })
        ));
        assert!(inclusive_range(u64::MAX, 2).is_err());
    }

    #[tokio::test]
    async fn test_read_source_from_current_position() {
        let mut source = Cursor::new(b"0123456789".to_vec());
        source.set_position(4);
        assert_eq!(read_source(&mut source).await.unwrap().as_ref(), b"456789");
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_failure_rewinds_source() {
        let mut source = Cursor::new(b"0123456789".to_vec());
        read_source(&mut source).await.unwrap();
        assert_eq!(source.position(), 10);

        let result = upload_with_retry("k", &mut source, || async {
            Err::<(), _>(StorageError::ConfigError("down".to_string()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(source.position(), 0);
    }
}
