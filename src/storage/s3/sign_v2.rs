//! S3 query-string signing, signature version 2
//!
//! Some older S3-compatible services only accept V2 presigned URLs:
//!
//! ```text
//! ?AWSAccessKeyId=<id>&Expires=<epoch>&Signature=<base64(hmac-sha1(secret, StringToSign))>
//!
//! StringToSign = VERB + "\n"
//!              + Content-MD5 + "\n"
//!              + Content-Type + "\n"
//!              + Expires + "\n"
//!              + CanonicalizedAmzHeaders
//!              + CanonicalizedResource
//! ```
//!
//! Only GET URLs are presigned, so the MD5, type and `x-amz-*` headers are
//! always empty.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;
use url::form_urlencoded;

use crate::storage::error::S3Error;

type HmacSha1 = Hmac<Sha1>;

/// Query parameters that take part in the signature, sorted
const SIGNED_SUBRESOURCES: &[&str] = &[
    "acl",
    "delete",
    "lifecycle",
    "location",
    "logging",
    "notification",
    "partNumber",
    "policy",
    "replication",
    "requestPayment",
    "response-cache-control",
    "response-content-disposition",
    "response-content-encoding",
    "response-content-language",
    "response-content-type",
    "response-expires",
    "torrent",
    "uploadId",
    "uploads",
    "versionId",
    "versioning",
    "versions",
    "website",
];

/// Signs GET URLs for one bucket with V2 query authentication
#[derive(Clone)]
pub struct V2Presigner {
    access_key_id: String,
    secret_access_key: String,
    bucket: String,
    /// `scheme://host[:port]` requests are sent to, already naming the
    /// bucket for virtual-hosted style
    base_url: String,
    path_style: bool,
}

impl V2Presigner {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        bucket: impl Into<String>,
        base_url: &str,
        path_style: bool,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            bucket: bucket.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            path_style,
        }
    }

    /// URL for GET `key`, valid for `expires_in` from now.
    ///
    /// # Errors
    ///
    /// Returns `S3Error::Signing` if the expiry does not fit an epoch
    /// timestamp.
    pub fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, S3Error> {
        let expires = i64::try_from(expires_in.as_secs())
            .ok()
            .and_then(|secs| Utc::now().timestamp().checked_add(secs))
            .ok_or_else(|| S3Error::Signing(format!("expiry out of range: {:?}", expires_in)))?;
        self.presign_get_until(key, expires)
    }

    /// URL for GET `key`, valid until the epoch second `expires`.
    pub fn presign_get_until(&self, key: &str, expires: i64) -> Result<String, S3Error> {
        let expires = expires.to_string();
        let resource = format!("/{}/{}", self.bucket, encode_path(key));
        let signature = self.sign(&string_to_sign("GET", &expires, &resource, &[]))?;

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("AWSAccessKeyId", &self.access_key_id)
            .append_pair("Expires", &expires)
            .append_pair("Signature", &signature)
            .finish();
        let path = if self.path_style {
            resource
        } else {
            format!("/{}", encode_path(key))
        };
        Ok(format!("{}{}?{}", self.base_url, path, query))
    }

    fn sign(&self, string_to_sign: &str) -> Result<String, S3Error> {
        let mut mac = HmacSha1::new_from_slice(self.secret_access_key.as_bytes())
            .map_err(|e| S3Error::Signing(format!("invalid signing key: {}", e)))?;
        mac.update(string_to_sign.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}

impl Debug for V2Presigner {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("V2Presigner")
            .field("access_key_id", &self.access_key_id)
            .field("bucket", &self.bucket)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// String to sign for a header-less request on `resource` (an encoded
/// `/bucket/key` path) with the given query parameters.
pub fn string_to_sign(verb: &str, expires: &str, resource: &str, query: &[(&str, &str)]) -> String {
    format!(
        "{}\n\n\n{}\n{}",
        verb,
        expires,
        canonical_resource(resource, query)
    )
}

fn canonical_resource(resource: &str, query: &[(&str, &str)]) -> String {
    let mut canonical = resource.to_string();
    let mut separator = '?';
    for name in SIGNED_SUBRESOURCES {
        let Some((_, value)) = query.iter().find(|(k, _)| k == name) else {
            continue;
        };
        canonical.push(separator);
        canonical.push_str(name);
        if !value.is_empty() {
            canonical.push('=');
            canonical.push_str(value);
        }
        separator = '&';
    }
    canonical
}

/// Percent-encode everything but `A-Z a-z 0-9 - _ . ~ /`, uppercase hex over
/// the UTF-8 bytes.
pub fn encode_path(path: &str) -> String {
    let mut encoded = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn presigner(path_style: bool) -> V2Presigner {
        V2Presigner::new(
            "AKID",
            "SECRET",
            "awostest",
            if path_style {
                "https://s3v2-compatible.com/"
            } else {
                "https://awostest.s3v2-compatible.com"
            },
            path_style,
        )
    }

    fn query_value(url: &str, name: &str) -> Option<String> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn test_subresources_are_sorted() {
        let mut sorted = SIGNED_SUBRESOURCES.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, SIGNED_SUBRESOURCES);
    }

    #[test]
    fn test_string_to_sign_layout() {
        assert_eq!(
            string_to_sign("GET", "1621836702", "/awostest/test123", &[]),
            "GET\n\n\n1621836702\n/awostest/test123"
        );
        assert_eq!(
            string_to_sign(
                "GET",
                "1",
                "/b/k",
                &[("versionId", "3"), ("foo", "bar"), ("acl", "")]
            ),
            "GET\n\n\n1\n/b/k?acl&versionId=3"
        );
    }

    #[test]
    fn test_signature_matches_known_vector() {
        // signed at 1621836642, valid for one minute
        let url = presigner(true).presign_get_until("test123", 1621836702).unwrap();

        assert!(url.starts_with("https://s3v2-compatible.com/awostest/test123?"));
        let parsed = Url::parse(&url).unwrap();
        assert_eq!(parsed.query_pairs().count(), 3);
        assert_eq!(query_value(&url, "AWSAccessKeyId").as_deref(), Some("AKID"));
        assert_eq!(query_value(&url, "Expires").as_deref(), Some("1621836702"));
        assert_eq!(
            query_value(&url, "Signature").as_deref(),
            Some("aIShchTjP5Ly7bH0NtX+3yXtPjU=")
        );
        assert!(url.contains("Signature=aIShchTjP5Ly7bH0NtX%2B3yXtPjU%3D"));
    }

    #[test]
    fn test_virtual_hosted_url_signs_same_resource() {
        let url = presigner(false).presign_get_until("test123", 1621836702).unwrap();
        assert!(url.starts_with("https://awostest.s3v2-compatible.com/test123?"));
        assert_eq!(
            query_value(&url, "Signature").as_deref(),
            Some("aIShchTjP5Ly7bH0NtX+3yXtPjU=")
        );
    }

    #[test]
    fn test_presign_get_expiry() {
        let url = presigner(true)
            .presign_get("dir/a b.txt", Duration::from_secs(60))
            .unwrap();
        assert!(url.starts_with("https://s3v2-compatible.com/awostest/dir/a%20b.txt?"));

        let expires: i64 = query_value(&url, "Expires").unwrap().parse().unwrap();
        let now = Utc::now().timestamp();
        assert!(expires > now && expires <= now + 61);

        assert!(matches!(
            presigner(true).presign_get("k", Duration::from_secs(u64::MAX)),
            Err(S3Error::Signing(_))
        ));
    }

    #[test]
    fn test_encode_path() {
        let cases = [
            ("thisisthe%url", "thisisthe%25url"),
            ("本語", "%E6%9C%AC%E8%AA%9E"),
            ("本語.1", "%E6%9C%AC%E8%AA%9E.1"),
            (">123", "%3E123"),
            ("myurl#link", "myurl%23link"),
            ("space in url", "space%20in%20url"),
            ("url+path", "url%2Bpath"),
            ("url/path", "url/path"),
            ("a-b_c.d~e", "a-b_c.d~e"),
        ];
        for (input, expected) in cases {
            assert_eq!(encode_path(input), expected, "{}", input);
        }
    }
}
