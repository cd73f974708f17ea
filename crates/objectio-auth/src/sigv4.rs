//! AWS Signature V4 verification (component D).
//!
//! Implements AWS Signature Version 4 for authenticating S3 API requests,
//! both the header-signed form (`Authorization: AWS4-HMAC-SHA256 ...`) and
//! the query-string-signed form used by presigned URLs
//! (`X-Amz-Algorithm=AWS4-HMAC-SHA256&...&X-Amz-Signature=...`).
//!
//! Reference: <https://docs.aws.amazon.com/AmazonS3/latest/API/sig-v4-authenticating-requests.html>

use crate::store::UserStore;
use crate::user::AuthResult;
use chrono::{DateTime, NaiveDateTime, Utc};
use hmac::{Hmac, Mac};
use http::Request;
use objectio_common::{Error, Result};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

/// AWS Signature V4 verifier, shared across S3 API handlers.
#[derive(Clone)]
pub struct SigV4Verifier {
    user_store: UserStore,
    service: String,
    region: String,
}

impl SigV4Verifier {
    #[must_use]
    pub fn new(user_store: UserStore, region: impl Into<String>) -> Self {
        Self {
            user_store,
            service: "s3".to_string(),
            region: region.into(),
        }
    }

    /// Verify an incoming HTTP request, trying a header-signed
    /// `Authorization` value first and falling back to a query-string
    /// signed (presigned URL) request.
    pub fn verify<B>(&self, request: &Request<B>) -> Result<AuthResult> {
        if request.headers().contains_key("authorization") {
            self.verify_header(request)
        } else if request
            .uri()
            .query()
            .is_some_and(|q| q.contains("X-Amz-Signature="))
        {
            self.verify_query(request)
        } else {
            Err(Error::AccessDenied)
        }
    }

    fn verify_header<B>(&self, request: &Request<B>) -> Result<AuthResult> {
        let auth_header = request
            .headers()
            .get("authorization")
            .ok_or(Error::AccessDenied)?
            .to_str()
            .map_err(|_| Error::AccessDenied)?;

        let parsed = parse_authorization_header(auth_header)?;
        let date_str = get_request_date(request)?;
        let date = parse_date(&date_str)?;
        check_not_expired(date, 15)?;

        let (access_key, user) = self
            .user_store
            .lookup_for_auth(&parsed.access_key_id, Utc::now().timestamp())?;

        let canonical_request = build_canonical_request(request, &parsed.signed_headers)?;
        let date_stamp = date.format("%Y%m%d").to_string();
        let credential_scope = format!("{date_stamp}/{}/{}/aws4_request", self.region, self.service);
        let string_to_sign = build_string_to_sign(&canonical_request, &date_str, &credential_scope);

        let signing_key =
            derive_signing_key(&access_key.secret_access_key, &date_stamp, &self.region, &self.service);
        let calculated = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

        if !constant_time_eq(&calculated, &parsed.signature) {
            tracing::debug!(
                "signature mismatch: canonical_request={canonical_request}, string_to_sign={string_to_sign}"
            );
            return Err(Error::SignatureDoesNotMatch);
        }

        Ok(AuthResult {
            user_id: user.user_id,
            tenant_id: user.tenant_id,
            access_key_id: access_key.access_key_id,
            roles: user.roles,
        })
    }

    fn verify_query<B>(&self, request: &Request<B>) -> Result<AuthResult> {
        let query = request.uri().query().unwrap_or("");
        let params = parse_query_params(query);

        let algorithm = params.get("X-Amz-Algorithm").ok_or(Error::AccessDenied)?;
        if algorithm != "AWS4-HMAC-SHA256" {
            return Err(Error::AccessDenied);
        }
        let credential = params.get("X-Amz-Credential").ok_or(Error::AccessDenied)?;
        let date_str = params.get("X-Amz-Date").ok_or(Error::AccessDenied)?.clone();
        let expires_secs: i64 = params
            .get("X-Amz-Expires")
            .ok_or(Error::AccessDenied)?
            .parse()
            .map_err(|_| Error::AccessDenied)?;
        let signed_headers: Vec<String> = params
            .get("X-Amz-SignedHeaders")
            .ok_or(Error::AccessDenied)?
            .split(';')
            .map(str::to_lowercase)
            .collect();
        let signature = params.get("X-Amz-Signature").ok_or(Error::AccessDenied)?.clone();

        let mut cred_parts = credential.splitn(2, '/');
        let access_key_id = cred_parts.next().ok_or(Error::AccessDenied)?.to_string();

        let date = parse_date(&date_str)?;
        let now = Utc::now();
        if now.signed_duration_since(date).num_seconds() > expires_secs {
            return Err(Error::AccessDenied);
        }

        let (access_key, user) = self
            .user_store
            .lookup_for_auth(&access_key_id, now.timestamp())?;

        let canonical_request = build_canonical_request_for_query(request, &signed_headers, &query_without_signature(query))?;
        let date_stamp = date.format("%Y%m%d").to_string();
        let credential_scope = format!("{date_stamp}/{}/{}/aws4_request", self.region, self.service);
        let string_to_sign = build_string_to_sign(&canonical_request, &date_str, &credential_scope);

        let signing_key =
            derive_signing_key(&access_key.secret_access_key, &date_stamp, &self.region, &self.service);
        let calculated = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

        if !constant_time_eq(&calculated, &signature) {
            return Err(Error::SignatureDoesNotMatch);
        }

        Ok(AuthResult {
            user_id: user.user_id,
            tenant_id: user.tenant_id,
            access_key_id: access_key.access_key_id,
            roles: user.roles,
        })
    }
}

fn check_not_expired(date: DateTime<Utc>, max_minutes: i64) -> Result<()> {
    let diff = Utc::now().signed_duration_since(date);
    if diff.num_minutes().abs() > max_minutes {
        return Err(Error::AccessDenied);
    }
    Ok(())
}

struct ParsedAuth {
    access_key_id: String,
    signed_headers: Vec<String>,
    signature: String,
}

fn parse_authorization_header(header: &str) -> Result<ParsedAuth> {
    if !header.starts_with("AWS4-HMAC-SHA256") {
        return Err(Error::AccessDenied);
    }

    let re = Regex::new(
        r"AWS4-HMAC-SHA256\s+Credential=([^/]+)/[^,]+,\s*SignedHeaders=([^,]+),\s*Signature=(\w+)",
    )
    .expect("static regex is valid");

    let captures = re.captures(header).ok_or(Error::AccessDenied)?;

    Ok(ParsedAuth {
        access_key_id: captures.get(1).expect("group 1 present").as_str().to_string(),
        signed_headers: captures
            .get(2)
            .expect("group 2 present")
            .as_str()
            .split(';')
            .map(str::to_lowercase)
            .collect(),
        signature: captures.get(3).expect("group 3 present").as_str().to_string(),
    })
}

fn get_request_date<B>(request: &Request<B>) -> Result<String> {
    if let Some(date) = request.headers().get("x-amz-date") {
        return date.to_str().map(str::to_string).map_err(|_| Error::AccessDenied);
    }
    if let Some(date) = request.headers().get("date") {
        return date.to_str().map(str::to_string).map_err(|_| Error::AccessDenied);
    }
    Err(Error::AccessDenied)
}

fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(date_str, "%Y%m%dT%H%M%SZ")
        .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
        .map_err(|_| Error::AccessDenied)
}

fn build_canonical_request<B>(request: &Request<B>, signed_headers: &[String]) -> Result<String> {
    let canonical_query = build_canonical_query_string(request.uri().query().unwrap_or(""));
    build_canonical_request_for_query(request, signed_headers, &canonical_query)
}

fn build_canonical_request_for_query<B>(
    request: &Request<B>,
    signed_headers: &[String],
    canonical_query: &str,
) -> Result<String> {
    let method = request.method().as_str();
    let path = request.uri().path();
    let canonical_uri = if path.is_empty() { "/" } else { path };

    let mut headers_map: BTreeMap<String, String> = BTreeMap::new();
    for header_name in signed_headers {
        let value = request
            .headers()
            .get(header_name.as_str())
            .ok_or(Error::AccessDenied)?
            .to_str()
            .map_err(|_| Error::AccessDenied)?
            .trim()
            .to_string();
        headers_map.insert(header_name.clone(), value);
    }

    let canonical_headers: String = headers_map.iter().map(|(k, v)| format!("{k}:{v}\n")).collect();
    let signed_headers_str = signed_headers.join(";");

    let payload_hash = request
        .headers()
        .get("x-amz-content-sha256")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("UNSIGNED-PAYLOAD")
        .to_string();

    Ok(format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n{signed_headers_str}\n{payload_hash}"
    ))
}

fn build_canonical_query_string(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }

    let mut params: Vec<(String, String)> = query
        .split('&')
        .filter_map(|param| {
            let mut parts = param.splitn(2, '=');
            let key = parts.next()?;
            let value = parts.next().unwrap_or("");
            let decoded_key = url_decode(key);
            let decoded_value = url_decode(value);
            Some((url_encode(&decoded_key), url_encode(&decoded_value)))
        })
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Strip `X-Amz-Signature=...` from a presigned URL's query string before
/// feeding it back through the same canonicalization used at sign time.
fn query_without_signature(query: &str) -> String {
    let filtered: Vec<&str> = query
        .split('&')
        .filter(|p| !p.starts_with("X-Amz-Signature="))
        .collect();
    build_canonical_query_string(&filtered.join("&"))
}

fn parse_query_params(query: &str) -> BTreeMap<String, String> {
    query
        .split('&')
        .filter_map(|param| {
            let mut parts = param.splitn(2, '=');
            let key = url_decode(parts.next()?);
            let value = url_decode(parts.next().unwrap_or(""));
            Some((key, value))
        })
        .collect()
}

fn build_string_to_sign(canonical_request: &str, date_str: &str, credential_scope: &str) -> String {
    let canonical_request_hash = hex_sha256(canonical_request.as_bytes());
    format!("AWS4-HMAC-SHA256\n{date_str}\n{credential_scope}\n{canonical_request_hash}")
}

fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_secret = format!("AWS4{secret_key}");
    let k_date = hmac_sha256(k_secret.as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn url_encode(s: &str) -> String {
    let mut result = String::new();
    for c in s.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => result.push(c),
            _ => {
                for byte in c.to_string().as_bytes() {
                    result.push_str(&format!("%{byte:02X}"));
                }
            }
        }
    }
    result
}

fn url_decode(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '%' {
            let hex: String = chars.by_ref().take(2).collect();
            if hex.len() == 2 {
                if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                    result.push(byte as char);
                    continue;
                }
            }
            result.push('%');
            result.push_str(&hex);
        } else if c == '+' {
            result.push(' ');
        } else {
            result.push(c);
        }
    }
    result
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_encode() {
        assert_eq!(url_encode("hello"), "hello");
        assert_eq!(url_encode("hello world"), "hello%20world");
        assert_eq!(url_encode("a/b"), "a%2Fb");
    }

    #[test]
    fn test_hex_sha256() {
        let hash = hex_sha256(b"hello");
        assert_eq!(
            hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("hello", "hello"));
        assert!(!constant_time_eq("hello", "world"));
        assert!(!constant_time_eq("hello", "hello!"));
    }

    #[test]
    fn test_derive_signing_key_length() {
        let key = derive_signing_key(
            "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY",
            "20130524",
            "us-east-1",
            "s3",
        );
        assert_eq!(key.len(), 32);
    }

    #[test]
    fn test_parse_authorization_header() {
        let header = "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20130524/us-east-1/s3/aws4_request, SignedHeaders=host;x-amz-date, Signature=abcd1234";
        let parsed = parse_authorization_header(header).unwrap();
        assert_eq!(parsed.access_key_id, "AKIDEXAMPLE");
        assert_eq!(parsed.signed_headers, vec!["host", "x-amz-date"]);
        assert_eq!(parsed.signature, "abcd1234");
    }
}
