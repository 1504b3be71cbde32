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

//! Content compression
//!
//! Codecs are looked up by their content-encoding name in a
//! [`CompressorRegistry`]. Two codecs ship with the crate:
//!
//! - [`GzipCompressor`] (`gzip`), signalled through the `Content-Encoding` header
//! - [`SnappyCompressor`] (`snappy`), signalled through the `Compressor` user
//!   metadata entry

pub mod gzip;
pub mod registry;
pub mod snappy;

use std::io::{Cursor, Read};

use crate::storage::error::StorageResult;

pub use gzip::{GzipCompressor, GZIP};
pub use registry::CompressorRegistry;
pub use snappy::{decode_snappy, SnappyCompressor, SNAPPY};

/// Where a codec records that a stored object is compressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMarker {
    /// The HTTP `Content-Encoding` header carries the codec name
    ContentEncoding,
    /// The `Compressor` user metadata entry carries the codec name
    Metadata,
}

/// A named content codec
pub trait Compressor: Send + Sync {
    /// Codec name, also used as the content-encoding value
    fn content_encoding(&self) -> &str;

    fn marker(&self) -> CompressionMarker;

    /// Compress everything `reader` yields.
    ///
    /// Returns a seekable reader over the compressed bytes and their length.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::IoError` if reading the input fails, or
    /// `StorageError::CompressionError` if the codec rejects it.
    fn compress(&self, reader: &mut dyn Read) -> StorageResult<(Cursor<Vec<u8>>, u64)>;
}
