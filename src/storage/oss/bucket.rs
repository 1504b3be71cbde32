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

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, DATE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::io;
use std::time::Duration;
use tokio_util::io::StreamReader;
use tracing::debug;
use url::Url;

use super::sign::{http_date, OssCredentials, SignedRequest};
use crate::storage::config::StorageOptions;
use crate::storage::error::{OssError, StorageError, StorageResult};
use crate::storage::metadata::{header_str, oss_meta_header};
use crate::storage::options::ListRequest;
use crate::storage::provider::ObjectReader;
use crate::storage::router::BucketHandle;
use crate::util::replacer::add_scheme;

pub const OSS_REQUEST_ID: &str = "x-oss-request-id";
pub const OSS_HASH_CRC64: &str = "x-oss-hash-crc64ecma";

/// Parameters of a GetObject call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OssGetRequest {
    /// Inclusive byte range
    pub range: Option<(u64, u64)>,
    pub response_content_type: Option<String>,
    pub response_content_encoding: Option<String>,
}

/// Parameters of a PutObject call
#[derive(Debug, Clone, Default)]
pub struct OssPutRequest {
    pub body: Bytes,
    pub content_type: String,
    pub content_encoding: Option<String>,
    pub content_disposition: Option<String>,
    pub cache_control: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    /// User metadata, sent as `x-oss-meta-*`
    pub metadata: HashMap<String, String>,
}

/// A GET response: streaming body plus raw response headers
pub struct OssObject {
    pub body: ObjectReader,
    pub headers: HeaderMap,
}

/// The OSS primitives the adapter is written against, one bucket per handle
///
/// Failures the service answered are `OssError::Service`; absence is status
/// 404.
#[async_trait]
pub trait OssBucket: BucketHandle {
    async fn get_object(&self, key: &str, request: &OssGetRequest) -> Result<OssObject, OssError>;

    /// HEAD: all response headers of the object.
    async fn get_object_meta(&self, key: &str) -> Result<HeaderMap, OssError>;

    async fn put_object(&self, key: &str, request: OssPutRequest) -> Result<(), OssError>;

    async fn delete_object(&self, key: &str) -> Result<(), OssError>;

    /// One batch delete call.
    async fn delete_objects(&self, keys: &[String]) -> Result<(), OssError>;

    /// One page of keys. `request.max_keys` is already resolved to a
    /// positive page size.
    async fn list_objects(&self, request: &ListRequest) -> Result<Vec<String>, OssError>;

    /// Presigned GET URL, optionally carrying an image-processing instruction.
    fn sign_url(&self, key: &str, expires_in: Duration, process: Option<&str>) -> Result<String, OssError>;
}

/// [`OssBucket`] speaking the OSS REST API over `reqwest`
pub struct HttpOssBucket {
    name: String,
    /// `scheme://bucket.host[:port]`
    base_url: String,
    credentials: OssCredentials,
    client: Client,
}

impl HttpOssBucket {
    /// Open the physical OSS bucket `bucket_name`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConfigError` if the endpoint is missing or
    /// invalid, or the HTTP client cannot be built.
    pub fn from_options(options: &StorageOptions, bucket_name: &str) -> StorageResult<Self> {
        if options.endpoint.is_empty() {
            return Err(StorageError::ConfigError(
                "OSS requires an endpoint".to_string(),
            ));
        }
        let endpoint = Url::parse(&add_scheme(&options.endpoint, options.ssl))?;
        let host = endpoint.host_str().ok_or_else(|| {
            StorageError::ConfigError(format!("OSS endpoint '{}' has no host", options.endpoint))
        })?;
        let port = endpoint
            .port()
            .map(|p| format!(":{}", p))
            .unwrap_or_default();
        let base_url = format!("{}://{}.{}{}", endpoint.scheme(), bucket_name, host, port);

        let http = &options.http;
        let mut builder = Client::builder()
            .pool_idle_timeout(http.pool_idle_timeout())
            .pool_max_idle_per_host(http.pool_max_idle_per_host);
        if let Some(timeout) = http.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = http.connect_timeout() {
            builder = builder.connect_timeout(connect_timeout);
        }
        let client = builder.build().map_err(|e| {
            StorageError::ConfigError(format!("Failed to create OSS http client: {}", e))
        })?;
        debug!("Opened OSS bucket {} at {}", bucket_name, base_url);

        Ok(Self {
            name: bucket_name.to_string(),
            base_url,
            credentials: OssCredentials {
                access_key_id: options.access_key_id.clone(),
                access_key_secret: options.access_key_secret.clone(),
            },
            client,
        })
    }

    /// Object URL with a percent-encoded key and an encoded query string.
    fn url(&self, key: &str, query: &[(&str, &str)]) -> String {
        let path = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let mut url = format!("{}/{}", self.base_url, path);
        for (i, (name, value)) in query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(name);
            if !value.is_empty() {
                url.push('=');
                url.push_str(&urlencoding::encode(value));
            }
        }
        url
    }

    /// Build a signed request. `headers` must already hold every header the
    /// request sends; Date and Authorization are added here.
    fn request(
        &self,
        method: Method,
        key: &str,
        query: &[(&str, &str)],
        mut headers: HeaderMap,
    ) -> Result<RequestBuilder, OssError> {
        let date = http_date(Utc::now());
        let content_md5 = header_str(&headers, "content-md5").unwrap_or_default().to_string();
        let content_type = header_str(&headers, "content-type").unwrap_or_default().to_string();
        let authorization = self.credentials.authorization(
            &SignedRequest {
                verb: method.as_str(),
                content_md5: &content_md5,
                content_type: &content_type,
                date: &date,
                bucket: &self.name,
                key,
                query,
            },
            &headers,
        )?;
        headers.insert(DATE, header_value(&date)?);
        headers.insert(AUTHORIZATION, header_value(&authorization)?);
        Ok(self
            .client
            .request(method, self.url(key, query))
            .headers(headers))
    }

    /// Send and turn non-2xx answers into `OssError::Service`.
    async fn send(&self, request: RequestBuilder) -> Result<Response, OssError> {
        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status_code = response.status().as_u16();
        let header_request_id = header_str(response.headers(), OSS_REQUEST_ID)
            .unwrap_or_default()
            .to_string();
        let text = response.text().await.unwrap_or_default();
        let document: ErrorDocument = quick_xml::de::from_str(&text).unwrap_or_default();
        Err(OssError::Service {
            status_code,
            code: document.code,
            message: document.message,
            request_id: if document.request_id.is_empty() {
                header_request_id
            } else {
                document.request_id
            },
        })
    }

    fn put_headers(request: &OssPutRequest) -> Result<HeaderMap, OssError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, header_value(&request.content_type)?);
        let optional = [
            ("content-encoding", request.content_encoding.clone()),
            ("content-disposition", request.content_disposition.clone()),
            ("cache-control", request.cache_control.clone()),
            ("expires", request.expires.map(http_date)),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                headers.insert(name, header_value(&value)?);
            }
        }
        for (name, value) in &request.metadata {
            let name = HeaderName::from_bytes(oss_meta_header(name).as_bytes())
                .map_err(|e| OssError::Request(format!("metadata name '{}': {}", name, e)))?;
            headers.insert(name, header_value(value)?);
        }
        Ok(headers)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, OssError> {
    HeaderValue::from_str(value)
        .map_err(|e| OssError::Request(format!("header value '{}': {}", value, e)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ErrorDocument {
    code: String,
    message: String,
    request_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ListBucketResult {
    contents: Vec<ListEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListEntry {
    key: String,
}

/// Parse a ListObjects answer into its keys.
fn parse_list(xml: &str) -> Result<Vec<String>, OssError> {
    let result: ListBucketResult = quick_xml::de::from_str(xml)
        .map_err(|e| OssError::Response(format!("ListBucketResult: {}", e)))?;
    Ok(result.contents.into_iter().map(|entry| entry.key).collect())
}

fn delete_document(keys: &[String]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Delete><Quiet>true</Quiet>");
    for key in keys {
        xml.push_str("<Object><Key>");
        xml.push_str(&quick_xml::escape::escape(key.as_str()));
        xml.push_str("</Key></Object>");
    }
    xml.push_str("</Delete>");
    xml
}

#[async_trait]
impl OssBucket for HttpOssBucket {
    async fn get_object(&self, key: &str, request: &OssGetRequest) -> Result<OssObject, OssError> {
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(content_type) = &request.response_content_type {
            query.push(("response-content-type", content_type.as_str()));
        }
        if let Some(content_encoding) = &request.response_content_encoding {
            query.push(("response-content-encoding", content_encoding.as_str()));
        }
        let mut headers = HeaderMap::new();
        if let Some((start, end)) = request.range {
            headers.insert("range", header_value(&format!("bytes={}-{}", start, end))?);
        }

        let response = self
            .send(self.request(Method::GET, key, &query, headers)?)
            .await?;
        let headers = response.headers().clone();
        let stream = response
            .bytes_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        Ok(OssObject {
            body: Box::new(StreamReader::new(Box::pin(stream))),
            headers,
        })
    }

    async fn get_object_meta(&self, key: &str) -> Result<HeaderMap, OssError> {
        let response = self
            .send(self.request(Method::HEAD, key, &[], HeaderMap::new())?)
            .await?;
        Ok(response.headers().clone())
    }

    async fn put_object(&self, key: &str, request: OssPutRequest) -> Result<(), OssError> {
        let headers = Self::put_headers(&request)?;
        self.send(self.request(Method::PUT, key, &[], headers)?.body(request.body))
            .await?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), OssError> {
        self.send(self.request(Method::DELETE, key, &[], HeaderMap::new())?)
            .await?;
        Ok(())
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<(), OssError> {
        let body = delete_document(keys);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/xml"));
        headers.insert(
            "content-md5",
            header_value(&BASE64.encode(md5::compute(body.as_bytes()).0))?,
        );
        self.send(
            self.request(Method::POST, "", &[("delete", "")], headers)?
                .body(body),
        )
        .await?;
        Ok(())
    }

    async fn list_objects(&self, request: &ListRequest) -> Result<Vec<String>, OssError> {
        let max_keys = request.max_keys.to_string();
        let mut query: Vec<(&str, &str)> = vec![("max-keys", max_keys.as_str())];
        for (name, value) in [
            ("prefix", request.prefix.as_str()),
            ("marker", request.marker.as_str()),
            ("delimiter", request.delimiter.as_str()),
        ] {
            if !value.is_empty() {
                query.push((name, value));
            }
        }
        let response = self
            .send(self.request(Method::GET, "", &query, HeaderMap::new())?)
            .await?;
        parse_list(&response.text().await?)
    }

    fn sign_url(&self, key: &str, expires_in: Duration, process: Option<&str>) -> Result<String, OssError> {
        let expires = i64::try_from(expires_in.as_secs())
            .ok()
            .and_then(|secs| Utc::now().timestamp().checked_add(secs))
            .ok_or_else(|| OssError::Request(format!("expiry out of range: {:?}", expires_in)))?
            .to_string();
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(process) = process {
            query.push(("x-oss-process", process));
        }
        let signature = self.credentials.sign(
            &SignedRequest {
                verb: Method::GET.as_str(),
                date: &expires,
                bucket: &self.name,
                key,
                query: &query,
                ..Default::default()
            },
            &HeaderMap::new(),
        )?;
        query.push(("Expires", expires.as_str()));
        query.push(("OSSAccessKeyId", self.credentials.access_key_id.as_str()));
        query.push(("Signature", signature.as_str()));
        Ok(self.url(key, &query))
    }
}

impl BucketHandle for HttpOssBucket {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Debug for HttpOssBucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "HttpOssBucket(name={}, url={})", self.name, self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(endpoint: &str, ssl: bool) -> HttpOssBucket {
        let options = StorageOptions::oss("content")
            .with_credentials("ak", "sk")
            .with_endpoint(endpoint)
            .with_ssl(ssl);
        HttpOssBucket::from_options(&options, "content-abc").unwrap()
    }

    #[test]
    fn test_endpoint_gets_bucket_host() {
        let internal = bucket("oss-cn-hangzhou-internal.aliyuncs.com", true);
        assert_eq!(internal.name(), "content-abc");
        assert_eq!(
            internal.url("a/b c.txt", &[]),
            "https://content-abc.oss-cn-hangzhou-internal.aliyuncs.com/a/b%20c.txt"
        );

        let local = bucket("http://127.0.0.1:9000", true);
        assert_eq!(local.url("k", &[]), "http://content-abc.127.0.0.1:9000/k");
    }

    #[test]
    fn test_missing_endpoint_is_config_error() {
        let options = StorageOptions::oss("content");
        assert!(matches!(
            HttpOssBucket::from_options(&options, "content-abc"),
            Err(StorageError::ConfigError(_))
        ));
    }

    #[test]
    fn test_sign_url_carries_signature_and_process() {
        let bucket = bucket("oss-cn-hangzhou.aliyuncs.com", false);
        let url = bucket
            .sign_url("img/cat.png", Duration::from_secs(60), Some("image/resize,w_100"))
            .unwrap();

        assert!(url.starts_with("http://content-abc.oss-cn-hangzhou.aliyuncs.com/img/cat.png?"));
        assert!(url.contains("x-oss-process=image%2Fresize%2Cw_100"));
        assert!(url.contains("&Expires="));
        assert!(url.contains("&OSSAccessKeyId=ak"));
        assert!(url.contains("&Signature="));

        let parsed = Url::parse(&url).unwrap();
        let expires: i64 = parsed
            .query_pairs()
            .find(|(k, _)| k == "Expires")
            .map(|(_, v)| v.parse().unwrap())
            .unwrap();
        let now = Utc::now().timestamp();
        assert!(expires > now && expires <= now + 61);
    }

    #[test]
    fn test_sign_url_rejects_unrepresentable_expiry() {
        let bucket = bucket("oss-cn-hangzhou.aliyuncs.com", false);
        assert!(matches!(
            bucket.sign_url("k", Duration::from_secs(u64::MAX), None),
            Err(OssError::Request(_))
        ));
        assert!(matches!(
            bucket.sign_url("k", Duration::from_secs(i64::MAX as u64), None),
            Err(OssError::Request(_))
        ));
    }

    #[test]
    fn test_put_headers() {
        let request = OssPutRequest {
            content_type: "text/plain".to_string(),
            content_encoding: Some("gzip".to_string()),
            metadata: HashMap::from([("Compressor".to_string(), "snappy".to_string())]),
            ..Default::default()
        };
        let headers = HttpOssBucket::put_headers(&request).unwrap();
        assert_eq!(header_str(&headers, "content-type"), Some("text/plain"));
        assert_eq!(header_str(&headers, "content-encoding"), Some("gzip"));
        assert_eq!(header_str(&headers, "x-oss-meta-compressor"), Some("snappy"));
        assert!(headers.get("cache-control").is_none());
    }

    #[test]
    fn test_put_headers_rejects_invalid_metadata() {
        let request = OssPutRequest {
            content_type: "text/plain".to_string(),
            metadata: HashMap::from([("ok".to_string(), "line\nbreak".to_string())]),
            ..Default::default()
        };
        assert!(matches!(
            HttpOssBucket::put_headers(&request),
            Err(OssError::Request(_))
        ));
    }

    #[test]
    fn test_parse_list() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult>
  <Name>content-abc</Name>
  <Prefix>logs/</Prefix>
  <Marker></Marker>
  <MaxKeys>1000</MaxKeys>
  <Delimiter>/</Delimiter>
  <IsTruncated>false</IsTruncated>
  <Contents><Key>logs/a</Key><Size>1</Size></Contents>
  <Contents><Key>logs/b</Key><Size>2</Size></Contents>
  <CommonPrefixes><Prefix>logs/nested/</Prefix></CommonPrefixes>
</ListBucketResult>"#;
        assert_eq!(parse_list(xml).unwrap(), vec!["logs/a", "logs/b"]);

        let empty = "<ListBucketResult><Name>b</Name></ListBucketResult>";
        assert!(parse_list(empty).unwrap().is_empty());
    }

    #[test]
    fn test_error_document() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error>
  <Code>NoSuchKey</Code>
  <Message>The specified key does not exist.</Message>
  <RequestId>5C3D9175B6FC201293AD4890</RequestId>
  <HostId>content-abc.oss-cn-hangzhou.aliyuncs.com</HostId>
</Error>"#;
        let document: ErrorDocument = quick_xml::de::from_str(xml).unwrap();
        assert_eq!(document.code, "NoSuchKey");
        assert_eq!(document.request_id, "5C3D9175B6FC201293AD4890");
    }

    #[test]
    fn test_delete_document_escapes_keys() {
        let xml = delete_document(&["a&b".to_string(), "c".to_string()]);
        assert!(xml.contains("<Quiet>true</Quiet>"));
        assert!(xml.contains("<Object><Key>a&amp;b</Key></Object>"));
        assert!(xml.ends_with("<Object><Key>c</Key></Object></Delete>"));
    }
}
