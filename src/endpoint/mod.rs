//! Public object URL resolution.
//!
//! Produces the externally visible, unsigned URL of an object. A configured
//! custom domain wins over everything else; otherwise the endpoint is used in
//! path-style (`endpoint/bucket/key`) or virtual-host style
//! (`scheme://bucket.authority/key`) form. No network access happens here.

use crate::config::StoreConfig;
use crate::error::{ArgumentError, StoreError};
use crate::key::ObjectKey;
use url::Url;

/// Maximum length of a DNS label.
const MAX_LABEL_LEN: usize = 63;

/// Resolve the public URL of `key` in `bucket`.
///
/// With a custom domain the bucket is ignored: multi-bucket deployments
/// behind one domain must not rely on this helper.
pub fn resolve(config: &StoreConfig, bucket: &str, key: &ObjectKey) -> Result<String, StoreError> {
    if let Some(domain) = config.custom_domain() {
        return Ok(format!("{}/{}", domain, key));
    }

    let base = if config.path_style_access {
        format!("{}/{}", config.endpoint.trim_end_matches('/'), bucket)
    } else {
        let endpoint = config.endpoint_url()?;
        virtual_host_base(&endpoint, bucket)?
    };

    Ok(format!("{}/{}", base, key))
}

/// Rewrite an endpoint into `scheme://bucket.authority`, without a trailing slash.
pub fn virtual_host_base(endpoint: &Url, bucket: &str) -> Result<String, ArgumentError> {
    validate_dns_bucket(bucket)?;

    let host = endpoint
        .host_str()
        .ok_or_else(|| ArgumentError::InvalidBucketName {
            bucket: bucket.to_string(),
            reason: format!("endpoint '{}' has no host to prefix", endpoint),
        })?;
    let authority = match endpoint.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    let base = format!("{}://{}.{}", endpoint.scheme(), bucket, authority);
    Url::parse(&base).map_err(|e| ArgumentError::InvalidBucketName {
        bucket: bucket.to_string(),
        reason: e.to_string(),
    })?;

    Ok(base)
}

/// Check that a bucket name can be used as a DNS label.
pub fn validate_dns_bucket(bucket: &str) -> Result<(), ArgumentError> {
    let invalid = |reason: &str| ArgumentError::InvalidBucketName {
        bucket: bucket.to_string(),
        reason: reason.to_string(),
    };

    if bucket.is_empty() {
        return Err(invalid("bucket name is empty"));
    }
    if bucket.len() > MAX_LABEL_LEN {
        return Err(invalid("bucket name is longer than 63 characters"));
    }
    if let Some(c) = bucket
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '.'))
    {
        return Err(invalid(&format!("character '{}' is not allowed in a host name", c)));
    }
    if bucket.starts_with(['-', '.']) || bucket.ends_with(['-', '.']) {
        return Err(invalid("bucket name must start and end with a letter or digit"));
    }
    if bucket.contains("..") {
        return Err(invalid("bucket name contains an empty label"));
    }

    Ok(())
}
