//! Configuration for the object store facade.
//!
//! `StoreConfig` carries the connection settings every component reads:
//! endpoint, region, key pair, default bucket, addressing style, custom
//! domain and the enabled flag, plus the HTTP transport settings.

use crate::credentials::AccessKeyPair;
use crate::error::{ConfigurationError, StoreError};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Default region when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Configuration for the facade.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Endpoint URL of the store (e.g. `http://127.0.0.1:9000`).
    pub endpoint: String,

    /// Region used in request signatures.
    #[serde(default = "default_region")]
    pub region: String,

    /// Access key.
    pub access_key: String,

    /// Secret key.
    pub secret_key: SecretString,

    /// Default bucket used when an operation does not name one.
    #[serde(default)]
    pub bucket: Option<String>,

    /// Use path-style addressing instead of virtual-hosted style.
    ///
    /// Path-style: `http://endpoint/bucket/key`
    /// Virtual-hosted: `http://bucket.endpoint/key`
    #[serde(default = "default_true")]
    pub path_style_access: bool,

    /// Custom domain used for public object URLs.
    #[serde(default)]
    pub custom_domain: Option<String>,

    /// Whether the facade may be constructed at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Connection timeout.
    #[serde(skip, default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// Socket read timeout.
    #[serde(skip, default = "default_read_timeout")]
    pub read_timeout: Duration,

    /// Maximum idle connections kept per host.
    #[serde(default = "default_max_idle_connections")]
    pub max_idle_connections: usize,

    /// Verify TLS certificates.
    #[serde(default = "default_true")]
    pub verify_ssl: bool,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_max_idle_connections() -> usize {
    100
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("bucket", &self.bucket)
            .field("path_style_access", &self.path_style_access)
            .field("custom_domain", &self.custom_domain)
            .field("enabled", &self.enabled)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("verify_ssl", &self.verify_ssl)
            // Intentionally omit secret_key
            .finish_non_exhaustive()
    }
}

impl StoreConfig {
    /// Create a new configuration builder.
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }

    /// The configured default bucket.
    pub fn default_bucket(&self) -> Result<&str, ConfigurationError> {
        match self.bucket.as_deref() {
            Some(bucket) if !bucket.trim().is_empty() => Ok(bucket),
            _ => Err(ConfigurationError::MissingDefaultBucket),
        }
    }

    /// Pick the explicit bucket, falling back to the default.
    pub fn bucket_or_default<'a>(
        &'a self,
        bucket: Option<&'a str>,
    ) -> Result<&'a str, ConfigurationError> {
        match bucket {
            Some(b) if !b.is_empty() => Ok(b),
            _ => self.default_bucket(),
        }
    }

    /// The custom domain, if one is set and non-empty.
    pub fn custom_domain(&self) -> Option<&str> {
        self.custom_domain
            .as_deref()
            .filter(|domain| !domain.trim().is_empty())
    }

    /// Parse the endpoint URL.
    pub fn endpoint_url(&self) -> Result<Url, ConfigurationError> {
        Url::parse(&self.endpoint).map_err(|e| ConfigurationError::InvalidEndpoint {
            url: self.endpoint.clone(),
            details: e.to_string(),
        })
    }

    /// The signing key pair.
    pub fn key_pair(&self) -> AccessKeyPair {
        AccessKeyPair::from_secret(self.access_key.clone(), self.secret_key.clone())
    }

    /// Check the invariants a usable configuration must hold.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigurationError::MissingEndpoint);
        }

        let url = self.endpoint_url()?;
        if url.host_str().is_none() {
            return Err(ConfigurationError::InvalidEndpoint {
                url: self.endpoint.clone(),
                details: "endpoint has no host".to_string(),
            });
        }
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigurationError::InvalidEndpoint {
                url: self.endpoint.clone(),
                details: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        if self.access_key.is_empty() || self.secret_key.expose_secret().is_empty() {
            return Err(ConfigurationError::MissingCredentials);
        }

        if self.region.trim().is_empty() {
            return Err(ConfigurationError::InvalidValue {
                field: "region".to_string(),
                message: "region must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Builder for store configuration.
#[derive(Default)]
pub struct StoreConfigBuilder {
    endpoint: Option<String>,
    region: Option<String>,
    access_key: Option<String>,
    secret_key: Option<SecretString>,
    bucket: Option<String>,
    path_style_access: Option<bool>,
    custom_domain: Option<String>,
    enabled: Option<bool>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    max_idle_connections: Option<usize>,
    verify_ssl: Option<bool>,
}

impl StoreConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the region.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the access key pair.
    pub fn credentials(mut self, access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(SecretString::new(secret_key.into()));
        self
    }

    /// Set the default bucket.
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Enable or disable path-style addressing.
    pub fn path_style_access(mut self, enabled: bool) -> Self {
        self.path_style_access = Some(enabled);
        self
    }

    /// Set a custom domain for public object URLs.
    pub fn custom_domain(mut self, domain: impl Into<String>) -> Self {
        self.custom_domain = Some(domain.into());
        self
    }

    /// Enable or disable the facade.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    pub fn max_idle_connections(mut self, max: usize) -> Self {
        self.max_idle_connections = Some(max);
        self
    }

    /// Enable or disable TLS certificate verification.
    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = Some(verify);
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Reads `S3_STORE_ENDPOINT`, `S3_STORE_REGION`, `S3_STORE_ACCESS_KEY`,
    /// `S3_STORE_SECRET_KEY`, `S3_STORE_BUCKET`, `S3_STORE_PATH_STYLE`,
    /// `S3_STORE_CUSTOM_DOMAIN` and `S3_STORE_ENABLED`. Values already set on
    /// the builder are overwritten by variables that are present.
    pub fn from_env(mut self) -> Self {
        if let Ok(endpoint) = std::env::var("S3_STORE_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }
        if let Ok(region) = std::env::var("S3_STORE_REGION") {
            self.region = Some(region);
        }
        if let Ok(access_key) = std::env::var("S3_STORE_ACCESS_KEY") {
            self.access_key = Some(access_key);
        }
        if let Ok(secret_key) = std::env::var("S3_STORE_SECRET_KEY") {
            self.secret_key = Some(SecretString::new(secret_key));
        }
        if let Ok(bucket) = std::env::var("S3_STORE_BUCKET") {
            self.bucket = Some(bucket);
        }
        if let Ok(val) = std::env::var("S3_STORE_PATH_STYLE") {
            self.path_style_access = Some(val.to_lowercase() == "true");
        }
        if let Ok(domain) = std::env::var("S3_STORE_CUSTOM_DOMAIN") {
            self.custom_domain = Some(domain);
        }
        if let Ok(val) = std::env::var("S3_STORE_ENABLED") {
            self.enabled = Some(val.to_lowercase() != "false");
        }

        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<StoreConfig, StoreError> {
        let config = StoreConfig {
            endpoint: self.endpoint.ok_or(ConfigurationError::MissingEndpoint)?,
            region: self.region.unwrap_or_else(default_region),
            access_key: self.access_key.unwrap_or_default(),
            secret_key: self
                .secret_key
                .unwrap_or_else(|| SecretString::new(String::new())),
            bucket: self.bucket.filter(|b| !b.is_empty()),
            path_style_access: self.path_style_access.unwrap_or(true),
            custom_domain: self.custom_domain.filter(|d| !d.is_empty()),
            enabled: self.enabled.unwrap_or(true),
            connect_timeout: self.connect_timeout.unwrap_or_else(default_connect_timeout),
            read_timeout: self.read_timeout.unwrap_or_else(default_read_timeout),
            max_idle_connections: self
                .max_idle_connections
                .unwrap_or_else(default_max_idle_connections),
            verify_ssl: self.verify_ssl.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> StoreConfigBuilder {
        StoreConfig::builder()
            .endpoint("http://127.0.0.1:9000")
            .credentials("minioadmin", "minioadmin")
    }

    #[test]
    fn test_defaults() {
        let config = builder().build().unwrap();
        assert_eq!(config.region, "us-east-1");
        assert!(config.path_style_access);
        assert!(config.enabled);
        assert!(config.bucket.is_none());
        assert!(config.custom_domain().is_none());
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.read_timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_missing_endpoint() {
        let result = StoreConfig::builder().credentials("a", "b").build();
        assert!(matches!(
            result,
            Err(StoreError::Configuration(ConfigurationError::MissingEndpoint))
        ));
    }

    #[test]
    fn test_invalid_endpoint() {
        let result = builder().endpoint("not a url").build();
        assert!(matches!(
            result,
            Err(StoreError::Configuration(ConfigurationError::InvalidEndpoint { .. }))
        ));

        let result = builder().endpoint("ftp://store.example.com").build();
        assert!(matches!(
            result,
            Err(StoreError::Configuration(ConfigurationError::InvalidEndpoint { .. }))
        ));
    }

    #[test]
    fn test_missing_credentials() {
        let result = StoreConfig::builder()
            .endpoint("http://127.0.0.1:9000")
            .build();
        assert!(matches!(
            result,
            Err(StoreError::Configuration(ConfigurationError::MissingCredentials))
        ));
    }

    #[test]
    fn test_default_bucket() {
        let config = builder().build().unwrap();
        assert!(matches!(
            config.default_bucket(),
            Err(ConfigurationError::MissingDefaultBucket)
        ));
        assert_eq!(config.bucket_or_default(Some("explicit")).unwrap(), "explicit");

        let config = builder().bucket("assets").build().unwrap();
        assert_eq!(config.default_bucket().unwrap(), "assets");
        assert_eq!(config.bucket_or_default(None).unwrap(), "assets");
        assert_eq!(config.bucket_or_default(Some("")).unwrap(), "assets");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = StoreConfig::builder()
            .endpoint("http://127.0.0.1:9000")
            .credentials("AKID", "TOPSECRET")
            .build()
            .unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("AKID"));
        assert!(!debug.contains("TOPSECRET"));
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let json = r#"{
            "endpoint": "http://store.example.com",
            "accessKey": "AKID",
            "secretKey": "SECRET",
            "bucket": "assets"
        }"#;
        let config: StoreConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.region, DEFAULT_REGION);
        assert!(config.path_style_access);
        assert!(config.enabled);
        assert_eq!(config.bucket.as_deref(), Some("assets"));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }
}
