//! OSS header signing (signature version 1)
//!
//! `Authorization: OSS <AccessKeyId>:<Signature>` where the signature is
//! `base64(hmac-sha1(AccessKeySecret, StringToSign))` and
//!
//! ```text
//! StringToSign = VERB + "\n"
//!              + Content-MD5 + "\n"
//!              + Content-Type + "\n"
//!              + Date + "\n"
//!              + CanonicalizedOSSHeaders
//!              + CanonicalizedResource
//! ```
//!
//! Presigned URLs put the expiry timestamp in place of the date.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::HeaderMap;
use sha1::Sha1;

use crate::storage::error::OssError;

type HmacSha1 = Hmac<Sha1>;

/// Query parameters that take part in the signature
const SIGNED_SUBRESOURCES: &[&str] = &[
    "acl",
    "delete",
    "objectMeta",
    "partNumber",
    "response-cache-control",
    "response-content-disposition",
    "response-content-encoding",
    "response-content-language",
    "response-content-type",
    "response-expires",
    "security-token",
    "uploadId",
    "uploads",
    "x-oss-process",
];

#[derive(Clone)]
pub struct OssCredentials {
    pub access_key_id: String,
    pub access_key_secret: String,
}

impl std::fmt::Debug for OssCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OssCredentials")
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}

/// The request fields the signature covers
#[derive(Debug, Default)]
pub struct SignedRequest<'a> {
    pub verb: &'a str,
    pub content_md5: &'a str,
    pub content_type: &'a str,
    /// HTTP date, or the expiry timestamp for presigned URLs
    pub date: &'a str,
    pub bucket: &'a str,
    /// Raw object key, empty for bucket-level requests
    pub key: &'a str,
    /// Query parameters; only signed subresources are kept
    pub query: &'a [(&'a str, &'a str)],
}

impl OssCredentials {
    /// Signature over `request` and the `x-oss-*` headers in `headers`.
    pub fn sign(&self, request: &SignedRequest<'_>, headers: &HeaderMap) -> Result<String, OssError> {
        let string_to_sign = string_to_sign(request, headers);
        let mut mac = HmacSha1::new_from_slice(self.access_key_secret.as_bytes())
            .map_err(|e| OssError::Request(format!("invalid signing key: {}", e)))?;
        mac.update(string_to_sign.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    /// Value of the `Authorization` header for `request`.
    pub fn authorization(
        &self,
        request: &SignedRequest<'_>,
        headers: &HeaderMap,
    ) -> Result<String, OssError> {
        Ok(format!("OSS {}:{}", self.access_key_id, self.sign(request, headers)?))
    }
}

pub fn string_to_sign(request: &SignedRequest<'_>, headers: &HeaderMap) -> String {
    format!(
        "{}\n{}\n{}\n{}\n{}{}",
        request.verb,
        request.content_md5,
        request.content_type,
        request.date,
        canonical_oss_headers(headers),
        canonical_resource(request.bucket, request.key, request.query)
    )
}

/// `x-oss-*` headers, lowercased, sorted, one `name:value\n` each
fn canonical_oss_headers(headers: &HeaderMap) -> String {
    let mut oss_headers: Vec<(String, String)> = headers
        .iter()
        .filter(|(name, _)| name.as_str().starts_with("x-oss-"))
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).trim().to_string(),
            )
        })
        .collect();
    oss_headers.sort();
    oss_headers
        .into_iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect()
}

/// `/bucket/key` followed by the sorted signed subresources
fn canonical_resource(bucket: &str, key: &str, query: &[(&str, &str)]) -> String {
    let mut resource = format!("/{}/{}", bucket, key);
    let mut subresources: Vec<&(&str, &str)> = query
        .iter()
        .filter(|(name, _)| SIGNED_SUBRESOURCES.contains(name))
        .collect();
    subresources.sort();
    for (i, (name, value)) in subresources.into_iter().enumerate() {
        resource.push(if i == 0 { '?' } else { '&' });
        resource.push_str(name);
        if !value.is_empty() {
            resource.push('=');
            resource.push_str(value);
        }
    }
    resource
}

/// RFC 1123 date as OSS expects it
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use reqwest::header::HeaderValue;

    fn credentials() -> OssCredentials {
        OssCredentials {
            access_key_id: "44CF9590006BF252F707".to_string(),
            access_key_secret: "OtxrzxIsfpFjA7SwPzILwy8Bw21TLhquhboDYROV".to_string(),
        }
    }

    #[test]
    fn test_string_to_sign_layout() {
        let mut headers = HeaderMap::new();
        headers.insert("x-oss-meta-b", HeaderValue::from_static("2"));
        headers.insert("x-oss-meta-a", HeaderValue::from_static(" 1 "));
        headers.insert("content-type", HeaderValue::from_static("text/html"));

        let request = SignedRequest {
            verb: "PUT",
            content_type: "text/html",
            date: "Thu, 17 Nov 2005 18:49:58 GMT",
            bucket: "oss-example",
            key: "nelson",
            ..Default::default()
        };
        assert_eq!(
            string_to_sign(&request, &headers),
            "PUT\n\ntext/html\nThu, 17 Nov 2005 18:49:58 GMT\nx-oss-meta-a:1\nx-oss-meta-b:2\n/oss-example/nelson"
        );
    }

    #[test]
    fn test_canonical_resource_keeps_only_subresources_sorted() {
        let query = [
            ("prefix", "logs/"),
            ("x-oss-process", "image/resize,w_100"),
            ("delete", ""),
            ("max-keys", "10"),
        ];
        assert_eq!(
            canonical_resource("b", "", &query),
            "/b/?delete&x-oss-process=image/resize,w_100"
        );
        assert_eq!(canonical_resource("b", "k", &[]), "/b/k");
    }

    #[test]
    fn test_signature_matches_documented_example() {
        let mut headers = HeaderMap::new();
        headers.insert("x-oss-meta-author", HeaderValue::from_static("foo@bar.com"));
        headers.insert("x-oss-magic", HeaderValue::from_static("abracadabra"));
        let request = SignedRequest {
            verb: "PUT",
            content_md5: "ODBGOERFMDMzQTczRUY3NUE3NzA5QzdFNUYzMDQxNEM=",
            content_type: "text/html",
            date: "Thu, 17 Nov 2005 18:49:58 GMT",
            bucket: "oss-example",
            key: "nelson",
            query: &[],
        };
        assert_eq!(
            credentials().sign(&request, &headers).unwrap(),
            "26NBxoKdsyly4EDv6inkoDft/yA="
        );
    }

    #[test]
    fn test_authorization_header() {
        let auth = credentials()
            .authorization(&SignedRequest::default(), &HeaderMap::new())
            .unwrap();
        assert!(auth.starts_with("OSS 44CF9590006BF252F707:"));
    }

    #[test]
    fn test_http_date() {
        let at = Utc.with_ymd_and_hms(2005, 11, 17, 18, 49, 58).unwrap();
        assert_eq!(http_date(at), "Thu, 17 Nov 2005 18:49:58 GMT");
    }
}
