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

use snap::raw::{Decoder, Encoder};
use snap::read::FrameDecoder;
use std::io::{Cursor, Read};
use tracing::debug;

use super::{CompressionMarker, Compressor};
use crate::storage::error::{StorageError, StorageResult};

pub const SNAPPY: &str = "snappy";

/// Snappy block format
///
/// Objects are written as a single raw block. Readers also accept the framed
/// stream format, see [`decode_snappy`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SnappyCompressor;

impl SnappyCompressor {
    /// Block-encode a buffer that is already in memory.
    pub fn encode(&self, input: &[u8]) -> StorageResult<Vec<u8>> {
        Encoder::new()
            .compress_vec(input)
            .map_err(|e| StorageError::CompressionError(format!("snappy encode: {}", e)))
    }
}

impl Compressor for SnappyCompressor {
    fn content_encoding(&self) -> &str {
        SNAPPY
    }

    fn marker(&self) -> CompressionMarker {
        CompressionMarker::Metadata
    }

    fn compress(&self, reader: &mut dyn Read) -> StorageResult<(Cursor<Vec<u8>>, u64)> {
        let mut input = Vec::new();
        reader.read_to_end(&mut input)?;
        let compressed = self.encode(&input)?;
        let length = compressed.len() as u64;
        Ok((Cursor::new(compressed), length))
    }
}

/// Decode a snappy payload.
///
/// Block decoding is tried first. Only when the block decoder reports a
/// corrupt input is the payload read again as a framed stream; any other
/// block error is returned as is.
///
/// # Errors
///
/// Returns `StorageError::CompressionError` if neither format decodes.
pub fn decode_snappy(data: &[u8]) -> StorageResult<Vec<u8>> {
    match Decoder::new().decompress_vec(data) {
        Ok(decoded) => Ok(decoded),
        Err(e) if is_corrupt(&e) => {
            debug!("Snappy block decode failed ({}), trying frame format", e);
            let mut decoded = Vec::new();
            FrameDecoder::new(data)
                .read_to_end(&mut decoded)
                .map_err(|e| StorageError::CompressionError(format!("snappy frame decode: {}", e)))?;
            Ok(decoded)
        }
        Err(e) => Err(StorageError::CompressionError(format!(
            "snappy decode: {}",
            e
        ))),
    }
}

fn is_corrupt(err: &snap::Error) -> bool {
    matches!(
        err,
        snap::Error::Empty
            | snap::Error::Header
            | snap::Error::HeaderMismatch { .. }
            | snap::Error::Literal { .. }
            | snap::Error::CopyRead { .. }
            | snap::Error::CopyWrite { .. }
            | snap::Error::Offset { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use snap::write::FrameEncoder;
    use std::io::Write;

    #[test]
    fn test_block_payload_decodes() {
        let input = b"the quick brown fox ".repeat(50);
        let (compressed, _) = SnappyCompressor.compress(&mut input.as_slice()).unwrap();
        assert_ne!(compressed.get_ref(), &input);
        assert_eq!(decode_snappy(compressed.get_ref()).unwrap(), input);
    }

    #[test]
    fn test_frame_payload_falls_back() {
        let input = b"framed framed framed".to_vec();
        let mut encoder = FrameEncoder::new(Vec::new());
        encoder.write_all(&input).unwrap();
        let framed = encoder.into_inner().unwrap();

        assert_eq!(decode_snappy(&framed).unwrap(), input);
    }

    #[test]
    fn test_garbage_fails() {
        // declares 5 bytes, carries 1
        let result = decode_snappy(&[0x05, 0x00, 0x41]);
        assert!(matches!(result, Err(StorageError::CompressionError(_))));
    }

    #[test]
    fn test_empty_input_round_trip() {
        let encoded = SnappyCompressor.encode(&[]).unwrap();
        assert!(decode_snappy(&encoded).unwrap().is_empty());
    }
}
