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

//! Key → bucket routing
//!
//! When shards are configured, the last character of a key (lowercased)
//! selects the physical bucket. There is no fallback bucket: a character that
//! belongs to no shard group is a routing failure.

use std::collections::HashMap;
use std::sync::Arc;

use super::error::{StorageError, StorageResult};

/// Anything addressable as a named bucket
pub trait BucketHandle: Send + Sync {
    /// Physical bucket name
    fn name(&self) -> &str;
}

/// Lowercase suffix character → bucket
pub struct ShardMap<B: ?Sized> {
    buckets: HashMap<char, Arc<B>>,
}

impl<B: BucketHandle + ?Sized> ShardMap<B> {
    /// Build the map from shard groups.
    ///
    /// `open` is called once per group with the group string and must return
    /// the handle for that group's physical bucket. Every character of the
    /// group maps to that handle; when two groups share a character the later
    /// group wins.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConfigError` if a group is empty, or whatever
    /// `open` returns.
    pub fn build<F>(shards: &[String], mut open: F) -> StorageResult<Self>
    where
        F: FnMut(&str) -> StorageResult<Arc<B>>,
    {
        let mut buckets = HashMap::new();
        for shard in shards {
            if shard.is_empty() {
                return Err(StorageError::ConfigError(
                    "Shard group must not be empty".to_string(),
                ));
            }
            let bucket = open(shard)?;
            for c in shard.chars() {
                buckets.insert(fold(c), Arc::clone(&bucket));
            }
        }
        Ok(Self { buckets })
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn get(&self, suffix: char) -> Option<&Arc<B>> {
        self.buckets.get(&fold(suffix))
    }
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Resolves object keys to bucket handles
pub enum BucketRouter<B: ?Sized> {
    Single(Arc<B>),
    Sharded(ShardMap<B>),
}

impl<B: BucketHandle + ?Sized> BucketRouter<B> {
    /// Route to a shard map, or to `default` when the map is empty.
    pub fn new(default: Option<Arc<B>>, shards: ShardMap<B>) -> StorageResult<Self> {
        if !shards.is_empty() {
            return Ok(BucketRouter::Sharded(shards));
        }
        default.map(BucketRouter::Single).ok_or_else(|| {
            StorageError::ConfigError("Neither a bucket nor shard buckets are configured".into())
        })
    }

    /// Resolve the bucket holding `key`.
    ///
    /// # Errors
    ///
    /// * `StorageError::InvalidKey` - the key is empty
    /// * `StorageError::RoutingError` - sharding is enabled and no group
    ///   contains the key's last character
    pub fn resolve(&self, key: &str) -> StorageResult<&Arc<B>> {
        let suffix = key
            .chars()
            .next_back()
            .ok_or_else(|| StorageError::InvalidKey("key must not be empty".to_string()))?;

        match self {
            BucketRouter::Single(bucket) => Ok(bucket),
            BucketRouter::Sharded(shards) => {
                shards
                    .get(suffix)
                    .ok_or_else(|| StorageError::RoutingError {
                        key: key.to_string(),
                        suffix: fold(suffix),
                    })
            }
        }
    }

    /// Group keys by the bucket they resolve to.
    ///
    /// Groups come out in order of first appearance. Any key that fails to
    /// resolve fails the whole call.
    pub fn partition<S: AsRef<str>>(&self, keys: &[S]) -> StorageResult<Vec<(Arc<B>, Vec<String>)>> {
        let mut groups: Vec<(Arc<B>, Vec<String>)> = Vec::new();
        for key in keys {
            let key = key.as_ref();
            let bucket = self.resolve(key)?;
            match groups.iter_mut().find(|(b, _)| b.name() == bucket.name()) {
                Some((_, group)) => group.push(key.to_string()),
                None => groups.push((Arc::clone(bucket), vec![key.to_string()])),
            }
        }
        Ok(groups)
    }
}
