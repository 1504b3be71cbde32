use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, Cursor, Read};

use super::{CompressionMarker, Compressor};
use crate::storage::error::StorageResult;

pub const GZIP: &str = "gzip";

/// gzip at the default compression level
#[derive(Debug, Default, Clone, Copy)]
pub struct GzipCompressor;

impl Compressor for GzipCompressor {
    fn content_encoding(&self) -> &str {
        GZIP
    }

    fn marker(&self) -> CompressionMarker {
        CompressionMarker::ContentEncoding
    }

    fn compress(&self, reader: &mut dyn Read) -> StorageResult<(Cursor<Vec<u8>>, u64)> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        io::copy(reader, &mut encoder)?;
        let compressed = encoder.finish()?;
        let length = compressed.len() as u64;
        Ok((Cursor::new(compressed), length))
    }
}
