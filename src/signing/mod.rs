//! AWS Signature V4 signing.
//!
//! Requests are signed in headers; presigned URLs carry the signature in the
//! query string. The credential is a static access key pair.

mod canonical;
mod signer;

pub use canonical::{uri_encode_path, uri_encode_query};
pub use signer::{Payload, RequestSigner, SigV4Signer, MAX_PRESIGN_EXPIRY};

use crate::credentials::AccessKeyPair;
use crate::error::BackendError;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Signature algorithm identifier.
pub const AWS_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Service name for S3.
pub const S3_SERVICE: &str = "s3";

/// Payload hash placeholder for unsigned bodies.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Calculate the hex SHA-256 of data.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Calculate HMAC-SHA256.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, BackendError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| BackendError::Signing {
        message: e.to_string(),
    })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Derive the signing key.
///
/// kDate = HMAC("AWS4" + SecretKey, Date)
/// kRegion = HMAC(kDate, Region)
/// kService = HMAC(kRegion, Service)
/// kSigning = HMAC(kService, "aws4_request")
pub fn derive_signing_key(
    secret_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, BackendError> {
    let k_secret = format!("AWS4{}", secret_key);
    let k_date = hmac_sha256(k_secret.as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

/// `{date}/{region}/{service}/aws4_request`
pub fn build_credential_scope(date_stamp: &str, region: &str, service: &str) -> String {
    format!("{}/{}/{}/aws4_request", date_stamp, region, service)
}

/// Format a timestamp as `YYYYMMDD'T'HHMMSS'Z'`.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Format a date stamp as `YYYYMMDD`.
pub fn format_date_stamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%d").to_string()
}

/// Check if a header takes part in the signature.
pub fn should_sign_header(header_name: &str) -> bool {
    let name_lower = header_name.to_lowercase();

    if name_lower == "host" || name_lower.starts_with("x-amz-") {
        return true;
    }

    matches!(
        name_lower.as_str(),
        "content-type" | "content-md5" | "content-length" | "range"
    )
}

/// Compute the hex signature of a canonical request.
pub(crate) fn signature(
    canonical_request: &str,
    credentials: &AccessKeyPair,
    region: &str,
    timestamp: &DateTime<Utc>,
) -> Result<String, BackendError> {
    let date_stamp = format_date_stamp(timestamp);
    let credential_scope = build_credential_scope(&date_stamp, region, S3_SERVICE);

    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        AWS_ALGORITHM,
        format_datetime(timestamp),
        credential_scope,
        sha256_hex(canonical_request.as_bytes())
    );

    let signing_key =
        derive_signing_key(credentials.secret_key(), &date_stamp, region, S3_SERVICE)?;
    Ok(hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?))
}

/// Sign a request and return the `Authorization` header value.
#[allow(clippy::too_many_arguments)]
pub fn sign_request(
    method: &str,
    uri: &str,
    canonical_query: &str,
    headers: &[(String, String)],
    payload_hash: &str,
    credentials: &AccessKeyPair,
    region: &str,
    timestamp: &DateTime<Utc>,
) -> Result<String, BackendError> {
    let canonical_request =
        canonical::build_canonical_request(method, uri, canonical_query, headers, payload_hash);
    let signature = signature(&canonical_request, credentials, region, timestamp)?;

    let credential_scope =
        build_credential_scope(&format_date_stamp(timestamp), region, S3_SERVICE);

    Ok(format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        AWS_ALGORITHM,
        credentials.access_key(),
        credential_scope,
        canonical::build_signed_headers(headers),
        signature
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            sha256_hex(b"test"),
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_derive_signing_key() {
        let key = derive_signing_key("secret", "20231215", "us-east-1", "s3").unwrap();
        assert_eq!(key.len(), 32);
        let other = derive_signing_key("secret", "20231216", "us-east-1", "s3").unwrap();
        assert_ne!(key, other);
    }

    #[test]
    fn test_build_credential_scope() {
        let scope = build_credential_scope("20231215", "us-east-1", "s3");
        assert_eq!(scope, "20231215/us-east-1/s3/aws4_request");
    }

    #[test]
    fn test_format_timestamps() {
        let dt = Utc.with_ymd_and_hms(2023, 12, 15, 10, 30, 45).unwrap();
        assert_eq!(format_datetime(&dt), "20231215T103045Z");
        assert_eq!(format_date_stamp(&dt), "20231215");
    }

    #[test]
    fn test_should_sign_header() {
        assert!(should_sign_header("Host"));
        assert!(should_sign_header("x-amz-date"));
        assert!(should_sign_header("X-Amz-Content-Sha256"));
        assert!(should_sign_header("Content-Type"));
        assert!(should_sign_header("Content-MD5"));
        assert!(should_sign_header("Range"));
        assert!(!should_sign_header("User-Agent"));
        assert!(!should_sign_header("Accept"));
    }

    #[test]
    fn test_authorization_header_shape() {
        let credentials = AccessKeyPair::new("AKID", "SECRET");
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let headers = vec![
            ("host".to_string(), "store.example.com".to_string()),
            ("x-amz-date".to_string(), format_datetime(&timestamp)),
        ];

        let auth = sign_request(
            "GET",
            "/b/k",
            "",
            &headers,
            UNSIGNED_PAYLOAD,
            &credentials,
            "us-east-1",
            &timestamp,
        )
        .unwrap();

        assert!(auth.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKID/20240102/us-east-1/s3/aws4_request, SignedHeaders=host;x-amz-date, Signature="
        ));
        let signature = auth.rsplit('=').next().unwrap();
        assert_eq!(signature.len(), 64);
    }
}
