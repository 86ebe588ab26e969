//! Wire-level adjustments applied to every request sent to the store.
//!
//! Uploads carry a `public-read` ACL. Stores that reject the client's default
//! CRC checksum headers get them stripped, and batch deletes (`POST ?delete`)
//! get a `Content-MD5` of the exact body instead.
//!
//! OpenDAL signs a request before it reaches the fetcher, so any header added
//! here would be outside the signature. Requests are signed again after the
//! adjustments.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::{HeaderValue, Method, Request, Response, header::AUTHORIZATION};
use md5::{Digest, Md5};
use opendal::raw::{HttpBody, HttpClient, HttpFetch};
use opendal::{Buffer, ErrorKind};
use reqsign::{AwsCredential, AwsV4Signer};

use super::config::StorageConfig;

const CHECKSUM_HEADERS: [&str; 2] = ["x-amz-checksum-crc32", "x-amz-checksum-crc32c"];
const SDK_CHECKSUM_HEADER: &str = "x-amz-sdk-checksum-algorithm";
const X_AMZ_DATE: &str = "x-amz-date";

/// SigV4 signer for the configured store.
struct RequestSigner {
    signer: AwsV4Signer,
    credential: AwsCredential,
}

impl RequestSigner {
    fn new(config: &StorageConfig) -> Self {
        Self {
            signer: AwsV4Signer::new("s3", &config.region),
            credential: AwsCredential {
                access_key_id: config.access_key_id.clone(),
                secret_access_key: config.secret_access_key.clone(),
                session_token: None,
                expires_in: None,
            },
        }
    }

    /// Replaces any existing signature with one covering the current headers.
    /// The signing time is stamped fresh so it matches the credential scope.
    fn sign(&self, req: &mut Request<Buffer>) -> opendal::Result<()> {
        req.headers_mut().remove(AUTHORIZATION);
        req.headers_mut().remove(X_AMZ_DATE);
        self.signer.sign(req, &self.credential).map_err(|e| {
            opendal::Error::new(ErrorKind::Unexpected, "failed to sign store request")
                .set_source(e)
        })
    }
}

/// HTTP fetcher wrapping OpenDAL's default client.
#[derive(Clone)]
pub struct CompatFetcher {
    inner: HttpClient,
    checksums: bool,
    signer: Arc<RequestSigner>,
}

impl CompatFetcher {
    /// Wraps `inner` for the store in `config`. With `config.checksums` false
    /// the checksum shim is active.
    #[must_use]
    pub fn new(inner: HttpClient, config: &StorageConfig) -> Self {
        Self {
            inner,
            checksums: config.checksums,
            signer: Arc::new(RequestSigner::new(config)),
        }
    }

    /// Applies the wire adjustments and signs the result.
    fn prepare(&self, mut req: Request<Buffer>) -> opendal::Result<Request<Buffer>> {
        apply_public_read(&mut req);
        if !self.checksums {
            apply_checksum_compat(&mut req);
        }
        self.signer.sign(&mut req)?;
        Ok(req)
    }
}

impl HttpFetch for CompatFetcher {
    async fn fetch(&self, req: Request<Buffer>) -> opendal::Result<Response<HttpBody>> {
        let req = self.prepare(req)?;
        self.inner.fetch(req).await
    }
}

fn has_query_param<B>(req: &Request<B>, name: &str) -> bool {
    req.uri().query().is_some_and(|query| {
        query.split('&').any(|param| {
            param == name
                || param
                    .strip_prefix(name)
                    .is_some_and(|rest| rest.starts_with('='))
        })
    })
}

/// Adds the `public-read` canned ACL to requests that create an object: a
/// single `PUT` or the start of a multipart upload (`POST ?uploads`). Part
/// uploads carry no ACL.
pub fn apply_public_read(req: &mut Request<Buffer>) {
    let method = req.method();
    let creates_object = (method == Method::PUT && !has_query_param(req, "partNumber"))
        || (method == Method::POST && has_query_param(req, "uploads"));
    if creates_object {
        req.headers_mut()
            .insert("x-amz-acl", HeaderValue::from_static("public-read"));
    }
}

/// Returns true for a multi-object delete (`POST /{bucket}?delete`).
#[must_use]
pub fn is_batch_delete<B>(req: &Request<B>) -> bool {
    req.method() == Method::POST && has_query_param(req, "delete")
}

/// Strips CRC checksum headers and, on batch deletes, sets `Content-MD5`.
pub fn apply_checksum_compat(req: &mut Request<Buffer>) {
    let headers = req.headers_mut();
    for name in CHECKSUM_HEADERS {
        headers.remove(name);
    }
    headers.remove(SDK_CHECKSUM_HEADER);

    if is_batch_delete(req) {
        let digest = Md5::digest(req.body().to_bytes());
        let encoded = STANDARD.encode(digest);
        match HeaderValue::from_str(&encoded) {
            Ok(value) => {
                req.headers_mut().insert("content-md5", value);
            }
            Err(e) => tracing::warn!(error = %e, "failed to encode Content-MD5 header"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: Method, uri: &str, body: &str) -> Request<Buffer> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("x-amz-checksum-crc32", "AAAAAA==")
            .header("x-amz-checksum-crc32c", "AAAAAA==")
            .header("x-amz-date", "20241101T000000Z")
            .body(Buffer::from(body.as_bytes().to_vec()))
            .expect("valid request")
    }

    #[test]
    fn test_batch_delete_gets_content_md5() {
        let mut req = request(Method::POST, "https://store.example.com/assets?delete", "hello");
        apply_checksum_compat(&mut req);

        assert!(req.headers().get("x-amz-checksum-crc32").is_none());
        assert!(req.headers().get("x-amz-checksum-crc32c").is_none());
        assert_eq!(
            req.headers().get("content-md5").map(HeaderValue::as_bytes),
            Some("XUFAKrxLKna5cZ2REBfFkg==".as_bytes())
        );
        assert!(req.headers().get("x-amz-date").is_some());
    }

    #[test]
    fn test_other_requests_only_lose_checksums() {
        let mut req = request(Method::GET, "https://store.example.com/assets?versions", "");
        apply_checksum_compat(&mut req);

        assert!(req.headers().get("x-amz-checksum-crc32").is_none());
        assert!(req.headers().get("content-md5").is_none());
    }

    #[test]
    fn test_is_batch_delete() {
        let post = |uri: &str| {
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .body(())
                .expect("valid request")
        };
        assert!(is_batch_delete(&post("https://s/b?delete")));
        assert!(is_batch_delete(&post("https://s/b?delete=")));
        assert!(!is_batch_delete(&post("https://s/b?uploads")));
        assert!(!is_batch_delete(&post("https://s/b/deleted.jpg")));
    }

    #[test]
    fn test_public_read_on_object_creation() {
        let acl = |method: Method, uri: &str| {
            let mut req = request(method, uri, "x");
            apply_public_read(&mut req);
            req.headers().get("x-amz-acl").cloned()
        };

        assert_eq!(
            acl(Method::PUT, "https://s/b/uploads/a.jpg"),
            Some(HeaderValue::from_static("public-read"))
        );
        assert!(acl(Method::POST, "https://s/b/uploads/a.jpg?uploads").is_some());
        assert!(acl(Method::PUT, "https://s/b/uploads/a.jpg?partNumber=2&uploadId=u").is_none());
        assert!(acl(Method::POST, "https://s/b/uploads/a.jpg?uploadId=u").is_none());
        assert!(acl(Method::GET, "https://s/b/uploads/a.jpg").is_none());
    }

    fn fetcher(checksums: bool) -> CompatFetcher {
        let config = StorageConfig::new("https://store.example.com", "assets", "AKID", "secret")
            .with_checksums(checksums);
        CompatFetcher::new(HttpClient::new().expect("http client"), &config)
    }

    fn signed_headers(req: &Request<Buffer>) -> Vec<String> {
        let auth = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .expect("authorization header");
        let signed = auth
            .split(", ")
            .find_map(|part| part.strip_prefix("SignedHeaders="))
            .expect("signed headers");
        signed.split(';').map(str::to_string).collect()
    }

    #[test]
    fn test_acl_is_covered_by_signature() {
        let req = Request::builder()
            .method(Method::PUT)
            .uri("https://store.example.com/assets/uploads/a.jpg")
            .header(
                AUTHORIZATION,
                "AWS4-HMAC-SHA256 Credential=AKID/20241101/us-west-000/s3/aws4_request, \
                 SignedHeaders=host;x-amz-date, Signature=stale",
            )
            .header("x-amz-date", "20241101T000000Z")
            .body(Buffer::from(b"jpeg".to_vec()))
            .expect("valid request");

        let req = fetcher(true).prepare(req).expect("signed");

        let signed = signed_headers(&req);
        assert!(signed.contains(&"x-amz-acl".to_string()));
        assert!(signed.contains(&"host".to_string()));
        assert!(!signed.contains(&"authorization".to_string()));
        let auth = req.headers()[AUTHORIZATION].to_str().expect("ascii");
        assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKID/"));
        assert!(auth.contains("/us-west-000/s3/aws4_request"));
        assert!(!auth.contains("Signature=stale"));
        let date = req.headers()["x-amz-date"].to_str().expect("ascii");
        assert_ne!(date, "20241101T000000Z");
    }

    #[test]
    fn test_content_md5_is_covered_by_signature() {
        let req = request(Method::POST, "https://store.example.com/assets?delete", "hello");

        let req = fetcher(false).prepare(req).expect("signed");

        let signed = signed_headers(&req);
        assert!(signed.contains(&"content-md5".to_string()));
        assert!(!signed.iter().any(|h| h.starts_with("x-amz-checksum")));
        assert!(!signed.contains(&"x-amz-acl".to_string()));
    }
}
