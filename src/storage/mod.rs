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

//! Object storage abstraction layer
//!
//! This module provides one client contract, [`ObjectClient`], over two
//! backends: S3-compatible stores and Alibaba Cloud OSS.
//!
//! Each backend is split in two. A bucket trait ([`s3::S3Bucket`],
//! [`oss::OssBucket`]) covers the raw calls against a single physical bucket,
//! and a client ([`s3::S3Client`], [`oss::OssClient`]) adds what the raw calls
//! lack: routing keys to shard buckets, transparent compression, retrying
//! writes and rewriting signed URLs.

pub mod config;
pub mod envelope;
pub mod error;
pub mod factory;
pub mod metadata;
pub mod options;
pub mod oss;
pub mod provider;
pub mod router;
pub mod s3;

// Public exports
pub use config::{CompressOptions, HttpOptions, SignatureVersion, StorageOptions, StorageType};
pub use error::{OssError, S3Error, StorageError, StorageResult};
pub use factory::{StorageClientBuilder, StorageClientFactory};
pub use metadata::ObjectMetadata;
pub use options::{GetOptions, ListRequest, PutOptions};
pub use provider::{ObjectClient, ObjectReader, ObjectSource};
