//! S3-compatible backend
//!
//! [`S3Bucket`] describes the primitives of one S3 bucket; [`ObjectStoreBucket`]
//! provides them through `object_store`. [`S3Client`] layers sharding,
//! compression and write retries on top. [`V2Presigner`] signs URLs for
//! services that predate signature version 4.

pub mod bucket;
pub mod client;
pub mod sign_v2;

pub use bucket::{
    GetObjectInput, GetObjectOutput, HeadObjectOutput, ObjectStoreBucket, PutObjectInput, S3Bucket,
};
pub use client::S3Client;
pub use sign_v2::V2Presigner;
