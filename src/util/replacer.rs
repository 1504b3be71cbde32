//! Presigned URL rewriting
//!
//! Signing happens against the endpoint the client talks to, which is often
//! an internal address. The hooks here turn such URLs into public ones after
//! signing; the signature itself is left untouched.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use tracing::warn;
use url::{Position, Url};

use crate::storage::error::StorageResult;

lazy_static! {
    static ref SCHEME: Regex = Regex::new(r"^([^:]+)://").unwrap();
}

/// Maps the signed URL's `scheme://host[:port]` to a replacement endpoint
pub type EndpointReplacer = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Maps a whole signed URL to its final form
pub type PresignedUrlReplacer = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// The pair of optional hooks a client applies to every signed URL
#[derive(Clone, Default)]
pub struct UrlRewriter {
    pub endpoint: Option<EndpointReplacer>,
    pub presigned: Option<PresignedUrlReplacer>,
}

impl UrlRewriter {
    /// Apply the endpoint replacer, then the presigned-URL replacer, each at
    /// most once.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::UrlParseError` if an endpoint replacer is set
    /// and `signed` is not an absolute URL.
    pub fn apply(&self, signed: String) -> StorageResult<String> {
        let mut result = signed;
        if let Some(replace) = &self.endpoint {
            let url = Url::parse(&result)?;
            let endpoint = replace(&url[..Position::BeforePath]);
            result = format!("{}{}", endpoint.trim_end_matches('/'), &url[Position::BeforePath..]);
        }
        if let Some(replace) = &self.presigned {
            result = replace(&result);
        }
        Ok(result)
    }
}

impl Debug for UrlRewriter {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("UrlRewriter")
            .field("endpoint", &self.endpoint.is_some())
            .field("presigned", &self.presigned.is_some())
            .finish()
    }
}

/// Replace whatever endpoint a URL was signed against with `to`.
///
/// `to` may omit the scheme, in which case `https` or `http` is added
/// according to `ssl`.
pub fn replace_endpoint(to: &str, ssl: bool) -> EndpointReplacer {
    let endpoint = add_scheme(to, ssl);
    Arc::new(move |_before: &str| endpoint.clone())
}

/// Turn an OSS internal-network URL into its public form.
///
/// The first `-internal.` in the host becomes `.` and the scheme is forced to
/// `https` or `http` according to `ssl`. Unparseable input is returned as is.
pub fn to_public_oss_host(ssl: bool) -> PresignedUrlReplacer {
    Arc::new(move |presigned: &str| {
        let mut url = match Url::parse(presigned) {
            Ok(url) => url,
            Err(e) => {
                warn!("Cannot parse presigned url {}: {}", presigned, e);
                return presigned.to_string();
            }
        };
        if let Some(host) = url.host_str().map(|h| h.replacen("-internal.", ".", 1)) {
            if url.set_host(Some(&host)).is_err() {
                warn!("Cannot set host {} on presigned url", host);
            }
        }
        if url.set_scheme(scheme(ssl)).is_err() {
            warn!("Cannot set scheme {} on presigned url {}", scheme(ssl), presigned);
        }
        url.to_string()
    })
}

/// Prefix `endpoint` with a scheme unless it already has one.
pub fn add_scheme(endpoint: &str, ssl: bool) -> String {
    if SCHEME.is_match(endpoint) {
        endpoint.to_string()
    } else {
        format!("{}://{}", scheme(ssl), endpoint)
    }
}

fn scheme(ssl: bool) -> &'static str {
    if ssl {
        "https"
    } else {
        "http"
    }
}
