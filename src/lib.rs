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

//! # Blobgate
//!
//! A Rust library giving S3-compatible stores and Alibaba Cloud OSS one
//! object storage interface.
//!
//! ## Features
//!
//! - **One contract**: get, put, delete, head, list, presign and ranged reads
//!   behave the same on both backends; a missing object is never an error
//! - **Bucket sharding**: the last character of a key picks one of several
//!   physical buckets
//! - **Compression**: pluggable codecs (gzip, snappy) applied on write, snappy
//!   undone on read
//! - **Retrying writes**: uploads are attempted 3 times, 1 second apart
//! - **Signed URL rewriting**: swap internal endpoints for public ones
//!
//! ## Quick Start
//!
//! ### S3 Example
//!
//! ```rust,no_run
//! use blobgate::{GetOptions, ObjectMetadata, PutOptions, StorageClientFactory, StorageOptions};
//! use std::io::Cursor;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let options = StorageOptions::s3("my-bucket")
//!     .with_credentials("ACCESS_KEY", "SECRET_KEY")
//!     .with_endpoint("http://127.0.0.1:9000")
//!     .with_force_path_style(true);
//!
//! let client = StorageClientFactory::from_options(options)?;
//!
//! let mut body = Cursor::new(b"hello".to_vec());
//! client
//!     .put("greeting", &mut body, ObjectMetadata::new(), &PutOptions::default())
//!     .await?;
//! let content = client.get("greeting", &GetOptions::default()).await?;
//! assert_eq!(content.as_ref(), b"hello");
//! # Ok(())
//! # }
//! ```
//!
//! ### Sharded OSS Example
//!
//! ```rust,no_run
//! use blobgate::util::replacer::to_public_oss_host;
//! use blobgate::{StorageClientFactory, StorageOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! // Keys ending in a, b or c live in "content-abc", keys ending in d, e or f
//! // in "content-def".
//! let options = StorageOptions::oss("content")
//!     .with_credentials("ACCESS_KEY", "SECRET_KEY")
//!     .with_endpoint("oss-cn-hangzhou-internal.aliyuncs.com")
//!     .with_shards(["abc", "def"])
//!     .with_compression("snappy", 4096);
//!
//! let client = StorageClientFactory::builder(options)
//!     .with_presigned_url_replacer(to_public_oss_host(true))
//!     .build()?;
//!
//! let url = client.sign_url("avatar-e", 600).await?;
//! println!("{}", url);
//! # Ok(())
//! # }
//! ```
//!
//! For more examples, see the `demos/` directory.
//!
//! ## Modules
//!
//! - [`storage`] - Client contract, backends, sharding and configuration
//! - [`compress`] - Codecs and the codec registry
//! - [`util`] - Retry policy and URL rewriting

pub mod compress;
pub mod storage;
pub mod util;

// Re-export commonly used types
pub use compress::{Compressor, CompressorRegistry};
pub use storage::{
    GetOptions, ListRequest, ObjectClient, ObjectMetadata, PutOptions, StorageClientFactory,
    StorageError, StorageOptions, StorageResult, StorageType,
};
