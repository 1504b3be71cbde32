//! Alibaba Cloud OSS backend
//!
//! [`OssBucket`] describes the primitives of one OSS bucket and
//! [`HttpOssBucket`] implements them over the OSS REST API with V1 header
//! signing. [`OssClient`] layers sharding, compression, CRC validation and
//! write retries on top.

pub mod bucket;
pub mod client;
pub mod sign;

pub use bucket::{HttpOssBucket, OssBucket, OssGetRequest, OssObject, OssPutRequest};
pub use client::OssClient;
pub use sign::OssCredentials;
