// Copyright 2022 Adobe. All rights reserved.
// This file is licensed to you under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License. You may obtain a copy
// of the License at http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under
// the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR REPRESENTATIONS
// OF ANY KIND, either express or implied. See the License for the specific language
// governing permissions and limitations under the License.

use async_trait::async_trait;
use bytes::Bytes;
use std::io::Cursor;
use tokio::io::{AsyncRead, AsyncSeek};

use super::config::StorageType;
use super::error::StorageResult;
use super::metadata::ObjectMetadata;
use super::options::{GetOptions, ListRequest, PutOptions};

/// Seekable body accepted by `put`
///
/// Implemented for every seekable async reader, e.g. `std::io::Cursor` or
/// `tokio::fs::File`.
pub trait ObjectSource: AsyncRead + AsyncSeek + Unpin + Send {}

impl<T: AsyncRead + AsyncSeek + Unpin + Send + ?Sized> ObjectSource for T {}

/// Streaming object body handed to the caller
///
/// Dropping the reader releases the underlying connection.
pub type ObjectReader = Box<dyn AsyncRead + Send + Unpin>;

/// Unified object storage client
///
/// Every backend implements the same contract. In particular, absence is
/// never an error: `get` returns empty content, `get_as_reader`, `head` and
/// `get_with_meta` return `None` and `exists` returns `false`.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// Backend this client talks to.
    fn storage_type(&self) -> StorageType;

    /// Read a whole object.
    ///
    /// # Arguments
    ///
    /// * `key` - The object key; with sharding its last character picks the bucket
    /// * `options` - Response overrides and, on OSS, CRC validation
    ///
    /// # Returns
    ///
    /// A `Result` containing:
    /// * `Ok(Bytes)` - The object content, empty if the object does not exist
    /// * `Err(StorageError)` - If routing or the backend call fails
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * The key is empty or cannot be routed to a shard bucket
    /// * The backend reports anything other than a missing object
    /// * CRC validation is enabled and the checksums differ
    async fn get(&self, key: &str, options: &GetOptions) -> StorageResult<Bytes>;

    /// Same as [`ObjectClient::get`], as an owned byte vector.
    async fn get_bytes(&self, key: &str, options: &GetOptions) -> StorageResult<Vec<u8>> {
        Ok(self.get(key, options).await?.to_vec())
    }

    /// Stream an object.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    async fn get_as_reader(
        &self,
        key: &str,
        options: &GetOptions,
    ) -> StorageResult<Option<ObjectReader>>;

    /// Stream an object together with selected metadata, both taken from a
    /// single backend GET.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    async fn get_with_meta(
        &self,
        key: &str,
        attributes: &[&str],
        options: &GetOptions,
    ) -> StorageResult<Option<(ObjectReader, ObjectMetadata)>>;

    /// Store an object.
    ///
    /// The body is read from the current position of `source` to its end.
    /// The upload is attempted up to 3 times, 1 second apart. When every
    /// attempt fails, `source` is rewound to offset 0 and the last error is
    /// returned.
    ///
    /// When compression is enabled for the client and `options` names no
    /// content encoding, bodies above the configured threshold are compressed
    /// first.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * The key is empty or cannot be routed to a shard bucket
    /// * The configured codec is not registered
    /// * Reading `source` fails
    /// * All upload attempts fail
    async fn put(
        &self,
        key: &str,
        source: &mut dyn ObjectSource,
        meta: ObjectMetadata,
        options: &PutOptions,
    ) -> StorageResult<()>;

    /// Snappy-compress the whole body in memory, mark it with
    /// `Compressor=snappy` and store it like [`ObjectClient::put`].
    async fn compress_and_put(
        &self,
        key: &str,
        source: &mut dyn ObjectSource,
        meta: ObjectMetadata,
        options: &PutOptions,
    ) -> StorageResult<()>;

    /// Read an object and undo the compression recorded in its `Compressor`
    /// metadata entry.
    ///
    /// Objects without the entry are returned as stored; absent objects come
    /// back empty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::UnsupportedCompressor` if the entry names
    /// anything other than `snappy`.
    async fn get_and_decompress(&self, key: &str) -> StorageResult<Bytes>;

    /// [`ObjectClient::get_and_decompress`] behind an in-memory reader.
    async fn get_and_decompress_as_reader(&self, key: &str) -> StorageResult<ObjectReader> {
        let content = self.get_and_decompress(key).await?;
        Ok(Box::new(Cursor::new(content)))
    }

    /// Delete an object. Deleting an absent object succeeds.
    async fn del(&self, key: &str) -> StorageResult<()>;

    /// Delete several objects with one batch call per bucket.
    ///
    /// The first failing batch aborts the remaining ones.
    async fn del_multi(&self, keys: &[&str]) -> StorageResult<()>;

    /// Fetch selected metadata of an object.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    async fn head(&self, key: &str, attributes: &[&str]) -> StorageResult<Option<ObjectMetadata>>;

    /// List one page of keys from the bucket `key` routes to.
    async fn list_object(&self, key: &str, request: &ListRequest) -> StorageResult<Vec<String>>;

    /// Presign a GET for `key`, valid for `expired_seconds`, then apply the
    /// client's URL rewriting hooks.
    async fn sign_url(&self, key: &str, expired_seconds: u64) -> StorageResult<String>;

    /// Like [`ObjectClient::sign_url`], carrying an OSS `x-oss-process`
    /// instruction.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unsupported` on backends without image
    /// processing.
    async fn sign_url_with_process(
        &self,
        key: &str,
        expired_seconds: u64,
        process: &str,
    ) -> StorageResult<String>;

    /// Stream `length` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidRange` if `length` is 0.
    async fn range(&self, key: &str, offset: u64, length: u64) -> StorageResult<ObjectReader>;

    /// Check whether an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;
}
