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

use thiserror::Error;

/// Error code S3 returns from GET when the key does not exist
pub const S3_NO_SUCH_KEY: &str = "NoSuchKey";

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Routing error: no shard bucket for suffix '{suffix}' of key '{key}'")]
    RoutingError { key: String, suffix: char },

    #[error("Unsupported compressor: {0}")]
    UnsupportedCompressor(String),

    #[error("Compression error: {0}")]
    CompressionError(String),

    #[error("Invalid range: offset={offset}, length={length}")]
    InvalidRange { offset: u64, length: u64 },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error(
        "CRC64 check failed, request_id={request_id}, server_crc={server_crc}, client_crc={client_crc}"
    )]
    CrcMismatch {
        request_id: String,
        server_crc: u64,
        client_crc: u64,
    },

    #[error("S3 error: {0}")]
    S3Error(#[source] S3Error),

    #[error("OSS error: {0}")]
    OssError(#[from] OssError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Failure reported by an S3 bucket handle
#[derive(Error, Debug)]
pub enum S3Error {
    /// The service answered with an error document or status
    #[error("{code}: {message} (status code: {status_code})")]
    Service {
        code: String,
        status_code: u16,
        message: String,
    },

    /// The request never produced a service answer
    #[error("transport error: {0}")]
    Transport(#[from] object_store::Error),

    /// The key cannot be stored under its own name
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A presigned URL could not be produced
    #[error("signing failed: {0}")]
    Signing(String),
}

impl From<S3Error> for StorageError {
    fn from(e: S3Error) -> Self {
        match e {
            S3Error::InvalidKey(message) => StorageError::InvalidKey(message),
            other => StorageError::S3Error(other),
        }
    }
}

impl S3Error {
    /// Service error code, if the service answered
    pub fn code(&self) -> Option<&str> {
        match self {
            S3Error::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    /// HTTP status code, if the service answered
    pub fn status_code(&self) -> Option<u16> {
        match self {
            S3Error::Service { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

/// Failure reported by an OSS bucket handle
#[derive(Error, Debug)]
pub enum OssError {
    /// The service answered with a non-2xx status
    #[error(
        "service returned error: StatusCode={status_code}, ErrorCode={code}, ErrorMessage=\"{message}\", RequestId={request_id}"
    )]
    Service {
        status_code: u16,
        code: String,
        message: String,
        request_id: String,
    },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request could not be built, e.g. a metadata value is not a valid
    /// header value
    #[error("invalid request: {0}")]
    Request(String),

    #[error("malformed response: {0}")]
    Response(String),
}

impl OssError {
    /// HTTP status code, if the service answered
    pub fn status_code(&self) -> Option<u16> {
        match self {
            OssError::Service { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_error() {
        let error = StorageError::ConfigError("Invalid configuration".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: Invalid configuration"
        );
    }

    #[test]
    fn test_routing_error_names_key_and_suffix() {
        let error = StorageError::RoutingError {
            key: "testxyz".to_string(),
            suffix: 'z',
        };
        let msg = error.to_string();
        assert!(msg.contains("'z'"));
        assert!(msg.contains("testxyz"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let storage_error: StorageError = io_error.into();

        match storage_error {
            StorageError::IoError(_) => {
                assert!(storage_error.to_string().contains("IO error"));
            }
            _ => panic!("Expected IoError variant"),
        }
    }

    #[test]
    fn test_url_parse_error_conversion() {
        let url_error = url::ParseError::EmptyHost;
        let storage_error: StorageError = url_error.into();

        match storage_error {
            StorageError::UrlParseError(_) => {
                assert!(storage_error.to_string().contains("URL parse error"));
            }
            _ => panic!("Expected UrlParseError variant"),
        }
    }

    #[test]
    fn test_s3_service_error_keeps_code() {
        let error = S3Error::Service {
            code: "AccessDenied".to_string(),
            status_code: 403,
            message: "denied".to_string(),
        };
        assert_eq!(error.code(), Some("AccessDenied"));
        assert_eq!(error.status_code(), Some(403));

        let storage_error: StorageError = error.into();
        match storage_error {
            StorageError::S3Error(inner) => assert_eq!(inner.code(), Some("AccessDenied")),
            _ => panic!("Expected S3Error variant"),
        }
    }

    #[test]
    fn test_s3_transport_error_has_no_code() {
        let error = S3Error::Transport(object_store::Error::Generic {
            store: "S3",
            source: "connection reset".into(),
        });
        assert_eq!(error.code(), None);
        assert_eq!(error.status_code(), None);
        assert!(error.to_string().contains("connection reset"));
    }

    #[test]
    fn test_s3_invalid_key_becomes_storage_invalid_key() {
        let storage_error: StorageError = S3Error::InvalidKey("'dir//k'".to_string()).into();
        assert!(matches!(storage_error, StorageError::InvalidKey(ref m) if m == "'dir//k'"));

        let storage_error: StorageError = S3Error::Signing("bad".to_string()).into();
        assert!(matches!(storage_error, StorageError::S3Error(S3Error::Signing(_))));
    }

    #[test]
    fn test_oss_service_error_display() {
        let error = OssError::Service {
            status_code: 404,
            code: "NoSuchKey".to_string(),
            message: "The specified key does not exist.".to_string(),
            request_id: "5C3D9175B6FC201293AD4890".to_string(),
        };
        assert_eq!(error.status_code(), Some(404));
        let msg = error.to_string();
        assert!(msg.contains("StatusCode=404"));
        assert!(msg.contains("RequestId=5C3D9175B6FC201293AD4890"));
    }

    #[test]
    fn test_crc_mismatch_display() {
        let error = StorageError::CrcMismatch {
            request_id: "req-1".to_string(),
            server_crc: 1,
            client_crc: 2,
        };
        assert_eq!(
            error.to_string(),
            "CRC64 check failed, request_id=req-1, server_crc=1, client_crc=2"
        );
    }

    #[test]
    fn test_storage_result_err() {
        let result: StorageResult<i32> = Err(StorageError::ConfigError("error".to_string()));
        assert!(result.is_err());
    }
}
