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

//! Per-call options
//!
//! Each struct starts from its `Default` and is refined with `with_*`
//! calls; a later call overrides an earlier one.

use chrono::{DateTime, Utc};

/// Content type stored when the caller does not name one
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Options for a single `put`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOptions {
    pub content_type: String,
    pub content_encoding: Option<String>,
    pub content_disposition: Option<String>,
    pub cache_control: Option<String>,
    pub expires: Option<DateTime<Utc>>,
}

impl Default for PutOptions {
    fn default() -> Self {
        Self {
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            content_encoding: None,
            content_disposition: None,
            cache_control: None,
            expires: None,
        }
    }
}

impl PutOptions {
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_content_encoding(mut self, content_encoding: impl Into<String>) -> Self {
        self.content_encoding = Some(content_encoding.into());
        self
    }

    pub fn with_content_disposition(mut self, content_disposition: impl Into<String>) -> Self {
        self.content_disposition = Some(content_disposition.into());
        self
    }

    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }

    pub fn with_expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }
}

/// Options for the get family
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Ask the backend to answer with this `Content-Type`
    pub content_type: Option<String>,
    /// Ask the backend to answer with this `Content-Encoding`
    pub content_encoding: Option<String>,
    /// OSS only: compare the body against the server's CRC-64
    pub enable_crc_validation: bool,
}

impl GetOptions {
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_content_encoding(mut self, content_encoding: impl Into<String>) -> Self {
        self.content_encoding = Some(content_encoding.into());
        self
    }

    pub fn with_crc_validation(mut self, enabled: bool) -> Self {
        self.enable_crc_validation = enabled;
        self
    }
}

/// One page of a bucket listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    pub prefix: String,
    /// Listing starts after this key
    pub marker: String,
    /// `0` lets the backend pick its default page size
    pub max_keys: usize,
    pub delimiter: String,
}

impl ListRequest {
    /// Page size used when `max_keys` is `0`
    pub const DEFAULT_MAX_KEYS: usize = 1000;

    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = max_keys;
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn page_size(&self) -> usize {
        if self.max_keys == 0 {
            Self::DEFAULT_MAX_KEYS
        } else {
            self.max_keys
        }
    }
}
