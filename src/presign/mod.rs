//! Presigned request descriptors.
//!
//! A [`PresignedRequest`] states *what* a temporary URL authorizes: bucket,
//! key, HTTP method, content type, expiration instant and any extra signed
//! query parameters. Turning the descriptor into a URL string is the
//! backend's job (see [`crate::backend::ObjectStoreBackend::presign`]), since
//! that is where the secret key and the signing algorithm live.

use crate::error::ArgumentError;
use crate::key::ObjectKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Content type used when the caller does not supply one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Expiry used by the convenience wrappers when the caller does not supply one.
pub const DEFAULT_EXPIRY: ExpireIn = ExpireIn {
    amount: 10,
    unit: TimeUnit::Minutes,
};

/// Units accepted for presign expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Days.
    Days,
    /// Hours.
    Hours,
    /// Minutes.
    Minutes,
    /// Seconds.
    Seconds,
    /// Milliseconds.
    Milliseconds,
    /// Nanoseconds.
    Nanoseconds,
}

impl TimeUnit {
    /// Lowercase name of the unit.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Days => "days",
            TimeUnit::Hours => "hours",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Seconds => "seconds",
            TimeUnit::Milliseconds => "milliseconds",
            TimeUnit::Nanoseconds => "nanoseconds",
        }
    }

    /// Length of `amount` units.
    pub fn duration(&self, amount: u64) -> Result<Duration, ArgumentError> {
        let seconds = |per_unit: u64| {
            amount
                .checked_mul(per_unit)
                .map(Duration::from_secs)
                .ok_or_else(|| ArgumentError::ExpirationOutOfRange {
                    message: format!("{} {} overflows", amount, self.as_str()),
                })
        };

        match self {
            TimeUnit::Days => seconds(24 * 60 * 60),
            TimeUnit::Hours => seconds(60 * 60),
            TimeUnit::Minutes => seconds(60),
            TimeUnit::Seconds => Ok(Duration::from_secs(amount)),
            TimeUnit::Milliseconds => Ok(Duration::from_millis(amount)),
            TimeUnit::Nanoseconds => Ok(Duration::from_nanos(amount)),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = ArgumentError;

    /// Parse a unit name, case-insensitively, singular or plural.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "days" | "day" => Ok(TimeUnit::Days),
            "hours" | "hour" => Ok(TimeUnit::Hours),
            "minutes" | "minute" => Ok(TimeUnit::Minutes),
            "seconds" | "second" => Ok(TimeUnit::Seconds),
            "milliseconds" | "millisecond" => Ok(TimeUnit::Milliseconds),
            "nanoseconds" | "nanosecond" => Ok(TimeUnit::Nanoseconds),
            _ => Err(ArgumentError::UnsupportedTimeUnit {
                unit: s.to_string(),
            }),
        }
    }
}

/// A relative expiry: `amount` of `unit` from now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpireIn {
    /// Number of units.
    pub amount: u64,
    /// The unit.
    pub unit: TimeUnit,
}

impl ExpireIn {
    /// Create an expiry.
    pub const fn new(amount: u64, unit: TimeUnit) -> Self {
        Self { amount, unit }
    }

    /// Create an expiry from a unit name.
    pub fn parse(amount: u64, unit: &str) -> Result<Self, ArgumentError> {
        Ok(Self {
            amount,
            unit: unit.parse()?,
        })
    }

    /// Length of the expiry.
    pub fn duration(&self) -> Result<Duration, ArgumentError> {
        self.unit.duration(self.amount)
    }

    /// The instant this expiry ends when counted from `now`.
    pub fn expiration_from(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, ArgumentError> {
        let duration = self.duration()?;
        chrono::Duration::from_std(duration)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .ok_or_else(|| ArgumentError::ExpirationOutOfRange {
                message: format!("{} {} from now", self.amount, self.unit),
            })
    }
}

impl Default for ExpireIn {
    fn default() -> Self {
        DEFAULT_EXPIRY
    }
}

/// HTTP methods a presigned URL can authorize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET.
    #[default]
    Get,
    /// PUT.
    Put,
    /// POST.
    Post,
    /// DELETE.
    Delete,
    /// HEAD.
    Head,
}

impl HttpMethod {
    /// Method name as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Whether requests with this method carry a body.
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Put | HttpMethod::Post)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully specified description of a temporary access grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresignedRequest {
    /// Bucket.
    pub bucket: String,
    /// Normalized object key.
    pub key: ObjectKey,
    /// Authorized method.
    pub method: HttpMethod,
    /// Content type the request is scoped to.
    pub content_type: String,
    /// Instant after which the grant is invalid.
    pub expiration: DateTime<Utc>,
    /// Additional signed query parameters, ordered by name.
    pub extra_params: BTreeMap<String, String>,
}

impl PresignedRequest {
    /// Start building a request for `bucket`/`key`.
    pub fn builder(bucket: impl Into<String>, key: impl Into<ObjectKey>) -> PresignedRequestBuilder {
        PresignedRequestBuilder::new(bucket, key)
    }

    /// Returns true once the expiration has passed.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expiration
    }
}

/// Build a presigned request descriptor.
///
/// `expire_in` is `(amount, unit name)`; an unrecognized unit fails with
/// [`ArgumentError::UnsupportedTimeUnit`].
pub fn build<I, K, V>(
    bucket: &str,
    key: &str,
    content_type: Option<&str>,
    expire_in: (u64, &str),
    method: HttpMethod,
    extra_params: Option<I>,
) -> Result<PresignedRequest, ArgumentError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut builder = PresignedRequest::builder(bucket, key)
        .method(method)
        .expire_in(ExpireIn::parse(expire_in.0, expire_in.1)?);
    if let Some(content_type) = content_type {
        builder = builder.content_type(content_type);
    }
    if let Some(params) = extra_params {
        builder = builder.extra_params(params);
    }
    builder.build()
}

/// Builder for [`PresignedRequest`].
#[derive(Debug, Clone)]
pub struct PresignedRequestBuilder {
    bucket: String,
    key: ObjectKey,
    method: HttpMethod,
    content_type: Option<String>,
    expire_in: ExpireIn,
    extra_params: BTreeMap<String, String>,
}

impl PresignedRequestBuilder {
    /// Create a builder with GET, the default content type and a 10 minute expiry.
    pub fn new(bucket: impl Into<String>, key: impl Into<ObjectKey>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            method: HttpMethod::Get,
            content_type: None,
            expire_in: DEFAULT_EXPIRY,
            extra_params: BTreeMap::new(),
        }
    }

    /// Set the HTTP method.
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the content type; an empty value keeps the default.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the expiry.
    pub fn expire_in(mut self, expire_in: ExpireIn) -> Self {
        self.expire_in = expire_in;
        self
    }

    /// Add one extra query parameter. A repeated name replaces the earlier value.
    pub fn extra_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_params.insert(name.into(), value.into());
        self
    }

    /// Add several extra query parameters.
    pub fn extra_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.extra_params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Compute the expiration and produce the descriptor.
    pub fn build(self) -> Result<PresignedRequest, ArgumentError> {
        let expiration = self.expire_in.expiration_from(Utc::now())?;
        let content_type = self
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        Ok(PresignedRequest {
            bucket: self.bucket,
            key: self.key,
            method: self.method,
            content_type,
            expiration,
            extra_params: self.extra_params,
        })
    }
}
