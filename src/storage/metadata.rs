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

//! Metadata normalization
//!
//! S3 hands back metadata keys in HTTP canonical form (`X-Foo-Bar`) on both
//! the GET and the HEAD response, next to typed standard header fields. OSS
//! hands back raw response headers where user metadata carries the
//! `x-oss-meta-` prefix. Both end up as one attribute → value map here.

use reqwest::header::HeaderMap;
use std::collections::HashMap;
use tracing::warn;

/// Attribute name → value
pub type ObjectMetadata = HashMap<String, String>;

pub const CONTENT_LENGTH: &str = "Content-Length";
pub const CONTENT_ENCODING: &str = "Content-Encoding";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_DISPOSITION: &str = "Content-Disposition";

/// User metadata entry naming the codec of a compressed payload
pub const COMPRESSOR_META_KEY: &str = "Compressor";

/// Header prefix of OSS user metadata
pub const OSS_META_PREFIX: &str = "x-oss-meta-";

/// Typed view of an S3 GET or HEAD response
pub trait ObjectHeaders {
    fn content_length(&self) -> Option<u64>;
    fn content_type(&self) -> Option<&str>;
    fn content_encoding(&self) -> Option<&str>;
    fn content_disposition(&self) -> Option<&str>;
    /// User metadata, keys in canonical form
    fn metadata(&self) -> &HashMap<String, String>;
}

/// Merge user metadata with the standard headers of a response.
///
/// A response without a content length is logged and reported as `"0"`.
pub fn merge_standard_headers(output: &dyn ObjectHeaders) -> ObjectMetadata {
    let mut merged = output.metadata().clone();

    let content_length = match output.content_length() {
        Some(length) => length,
        None => {
            warn!("Response carries no content length, reporting 0");
            0
        }
    };
    merged.insert(CONTENT_LENGTH.to_string(), content_length.to_string());

    let standard = [
        (CONTENT_ENCODING, output.content_encoding()),
        (CONTENT_TYPE, output.content_type()),
        (CONTENT_DISPOSITION, output.content_disposition()),
    ];
    for (name, value) in standard {
        match value {
            Some(value) => {
                merged.insert(name.to_string(), value.to_string());
            }
            None => {
                merged.remove(name);
            }
        }
    }
    merged
}

/// Pick the requested attributes out of merged S3 metadata.
///
/// Each name is title-cased and must then match a stored key exactly; names
/// without a match are left out.
pub fn select_s3_attributes<S: AsRef<str>>(
    attributes: &[S],
    merged: &ObjectMetadata,
) -> ObjectMetadata {
    attributes
        .iter()
        .filter_map(|name| {
            let name = name.as_ref();
            merged
                .get(&title_case(name))
                .map(|value| (name.to_string(), value.clone()))
        })
        .collect()
}

/// Pick the requested attributes out of OSS response headers.
///
/// The raw header wins; otherwise the `x-oss-meta-` header is used. A name
/// found in neither maps to an empty value.
pub fn select_oss_attributes<S: AsRef<str>>(
    attributes: &[S],
    headers: &HeaderMap,
) -> ObjectMetadata {
    attributes
        .iter()
        .map(|name| {
            let name = name.as_ref();
            let value = header_str(headers, name)
                .filter(|v| !v.is_empty())
                .or_else(|| header_str(headers, &oss_meta_header(name)))
                .unwrap_or_default();
            (name.to_string(), value.to_string())
        })
        .collect()
}

/// OSS header carrying the user metadata entry `name`
pub fn oss_meta_header(name: &str) -> String {
    format!("{}{}", OSS_META_PREFIX, name.to_lowercase())
}

/// Case-insensitive header lookup; invalid names and non-UTF-8 values miss
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// HTTP canonical header form: first letter and every letter after `-`
/// uppercased, all others lowercased. Keys containing characters outside the
/// header token set come back unchanged.
pub fn canonical_header_key(key: &str) -> String {
    if !key.bytes().all(is_token_byte) {
        return key.to_string();
    }
    let mut upper = true;
    key.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

/// Uppercase the first letter of every word, leave everything else as is.
/// Anything but a letter, digit or `_` separates words.
pub fn title_case(s: &str) -> String {
    let mut at_word_start = true;
    s.chars()
        .map(|c| {
            let out = if at_word_start {
                c.to_uppercase().next().unwrap_or(c)
            } else {
                c
            };
            at_word_start = !(c.is_alphanumeric() || c == '_');
            out
        })
        .collect()
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}
