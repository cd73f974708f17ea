//! AWS SigV4 presigned URL generation.
//!
//! Generates pre-signed GET and PUT URLs for S3-compatible object storage.
//! The generated URLs are verified by [`crate::sigv4::SigV4Verifier`]'s
//! query-string verification path.
//!
//! Reference: <https://docs.aws.amazon.com/AmazonS3/latest/API/sigv4-query-string-auth.html>

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

fn uri_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            _ => {
                out.push('%');
                out.push(char::from_digit(u32::from(b >> 4), 16).unwrap().to_ascii_uppercase());
                out.push(char::from_digit(u32::from(b & 0xf), 16).unwrap().to_ascii_uppercase());
            }
        }
    }
    out
}

/// Generate a presigned S3 GET URL.
///
/// # Arguments
/// - `endpoint` — base URL of the gateway (e.g. `http://localhost:9000`)
/// - `region` — AWS region string used in the credential scope
/// - `access_key_id` / `secret_access_key` — credential used to sign
/// - `bucket` / `key` — object location
/// - `expires_in` — how long the URL should be valid
///
/// The returned URL can be fetched with a plain HTTP GET without any
/// additional headers.
#[must_use]
pub fn presign_get(
    endpoint: &str,
    region: &str,
    access_key_id: &str,
    secret_access_key: &str,
    bucket: &str,
    key: &str,
    expires_in: Duration,
) -> String {
    presign("GET", endpoint, region, access_key_id, secret_access_key, bucket, key, expires_in)
}

/// Generate a presigned S3 PUT URL. Identical to [`presign_get`] except
/// the method in the canonical request is `PUT`; the caller uploads the
/// body with a plain HTTP PUT to the returned URL.
#[must_use]
pub fn presign_put(
    endpoint: &str,
    region: &str,
    access_key_id: &str,
    secret_access_key: &str,
    bucket: &str,
    key: &str,
    expires_in: Duration,
) -> String {
    presign("PUT", endpoint, region, access_key_id, secret_access_key, bucket, key, expires_in)
}

#[allow(clippy::too_many_arguments)]
fn presign(
    method: &str,
    endpoint: &str,
    region: &str,
    access_key_id: &str,
    secret_access_key: &str,
    bucket: &str,
    key: &str,
    expires_in: Duration,
) -> String {
    let now = Utc::now();
    let date_str = now.format("%Y%m%d").to_string();
    let datetime_str = now.format("%Y%m%dT%H%M%SZ").to_string();
    let expires_secs = expires_in.as_secs();

    let service = "s3";
    let credential_scope = format!("{date_str}/{region}/{service}/aws4_request");
    let credential = format!("{access_key_id}/{credential_scope}");

    let host = endpoint.trim_start_matches("https://").trim_start_matches("http://");

    let canonical_qs = format!(
        "X-Amz-Algorithm=AWS4-HMAC-SHA256\
         &X-Amz-Credential={cred}\
         &X-Amz-Date={dt}\
         &X-Amz-Expires={exp}\
         &X-Amz-SignedHeaders=host",
        cred = uri_encode(&credential),
        dt = datetime_str,
        exp = expires_secs,
    );

    let canonical_uri = format!(
        "/{}/{}",
        uri_encode(bucket),
        key.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
    );

    let canonical_headers = format!("host:{host}\n");
    let signed_headers = "host";

    let canonical_request = format!(
        "{method}\n{canonical_uri}\n{canonical_qs}\n{canonical_headers}\n{signed_headers}\nUNSIGNED-PAYLOAD"
    );

    let cr_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
    let string_to_sign = format!("AWS4-HMAC-SHA256\n{datetime_str}\n{credential_scope}\n{cr_hash}");

    let signing_key = derive_signing_key(secret_access_key, &date_str, region, service);
    let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

    format!(
        "{}{canonical_uri}?{canonical_qs}&X-Amz-Signature={signature}",
        endpoint.trim_end_matches('/'),
    )
}

fn derive_signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presign_get_produces_valid_url() {
        let url = presign_get(
            "http://localhost:9000",
            "us-east-1",
            "AKID",
            "secret",
            "my-bucket",
            "path/to/file.parquet",
            Duration::from_secs(3600),
        );
        assert!(url.starts_with("http://localhost:9000/my-bucket/path/to/file.parquet"));
        assert!(url.contains("X-Amz-Algorithm=AWS4-HMAC-SHA256"));
        assert!(url.contains("X-Amz-Signature="));
        assert!(url.contains("X-Amz-Expires=3600"));
    }

    #[test]
    fn test_presign_put_produces_valid_url() {
        let url = presign_put(
            "http://localhost:9000",
            "us-east-1",
            "AKID",
            "secret",
            "my-bucket",
            "upload.bin",
            Duration::from_secs(60),
        );
        assert!(url.starts_with("http://localhost:9000/my-bucket/upload.bin"));
        assert!(url.contains("X-Amz-Expires=60"));
    }
}
