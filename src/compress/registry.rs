use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use tracing::debug;

use super::{Compressor, GzipCompressor, SnappyCompressor};

/// Named codecs, shared between clients
///
/// Registration normally happens once at startup; lookups take the read lock.
pub struct CompressorRegistry {
    compressors: RwLock<HashMap<String, Arc<dyn Compressor>>>,
}

impl CompressorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            compressors: RwLock::new(HashMap::new()),
        }
    }

    /// A registry holding `gzip` and `snappy`.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(GzipCompressor));
        registry.register(Arc::new(SnappyCompressor));
        registry
    }

    /// Register a codec under its content-encoding, replacing any codec
    /// already registered under that name.
    pub fn register(&self, compressor: Arc<dyn Compressor>) {
        let name = compressor.content_encoding().to_string();
        debug!("Registering compressor {}", name);
        self.compressors.write().insert(name, compressor);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Compressor>> {
        self.compressors.read().get(name).cloned()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.compressors.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for CompressorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Debug for CompressorRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "CompressorRegistry({:?})", self.names())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::CompressionMarker;
    use crate::storage::error::StorageResult;
    use std::io::{Cursor, Read};

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
    fn test_defaults() {
        let registry = CompressorRegistry::default();
        assert_eq!(registry.names(), vec!["gzip", "snappy"]);
        assert!(registry.get("gzip").is_some());
        assert!(registry.get("zstd").is_none());
    }

    #[test]
    fn test_empty_registry() {
        let registry = CompressorRegistry::new();
        assert!(registry.names().is_empty());
        assert!(registry.get("gzip").is_none());
    }

    #[test]
    fn test_register_custom_codec() {
        let registry = CompressorRegistry::with_defaults();
        registry.register(Arc::new(Identity));
        let codec = registry.get("identity").unwrap();
        let (out, len) = codec.compress(&mut &b"abc"[..]).unwrap();
        assert_eq!(out.into_inner(), b"abc");
        assert_eq!(len, 3);
    }

    #[test]
    fn test_registry_is_shareable_across_threads() {
        let registry = Arc::new(CompressorRegistry::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.register(Arc::new(GzipCompressor)))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.names(), vec!["gzip"]);
    }
}
