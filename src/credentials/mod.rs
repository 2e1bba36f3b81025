//! Static access key pair used to sign requests.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// A static access key / secret key pair.
#[derive(Clone)]
pub struct AccessKeyPair {
    access_key: String,
    secret_key: SecretString,
}

impl AccessKeyPair {
    /// Create a key pair.
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: SecretString::new(secret_key.into()),
        }
    }

    /// Create a key pair from an already wrapped secret.
    pub fn from_secret(access_key: impl Into<String>, secret_key: SecretString) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key,
        }
    }

    /// Get the access key.
    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// Get the secret key.
    ///
    /// Note: This exposes the secret. Use carefully and avoid logging.
    pub fn secret_key(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

impl fmt::Debug for AccessKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessKeyPair")
            .field("access_key", &self.access_key)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}
