//! Error types for the object store facade.
//!
//! Failures fall into four categories. Configuration and argument errors are
//! detected locally before any request is made. `IncompletePartSet` is the one
//! contract violation only the multipart coordinator can see. Everything the
//! store itself reports travels unmodified inside [`StoreError::Backend`],
//! annotated with the operation and the bucket/key it addressed.

mod mapping;

pub use mapping::{map_error_code, map_http_status, S3ErrorResponse};

use thiserror::Error;

/// Top-level error type for the facade.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A caller-supplied argument was rejected before reaching the backend.
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] ArgumentError),

    /// Completion was attempted against a part listing with an untagged part.
    #[error(
        "Incomplete part set for upload '{upload_id}' on '{bucket}/{key}': part {part_number} has no content tag"
    )]
    IncompletePartSet {
        /// Bucket of the upload.
        bucket: String,
        /// Object key of the upload.
        key: String,
        /// Upload id.
        upload_id: String,
        /// First part number found without a tag.
        part_number: u32,
    },

    /// Failure reported by the backend, passed through unmodified.
    #[error("Backend failure during {operation} on '{target}': {source}")]
    Backend {
        /// Operation that was being performed.
        operation: &'static str,
        /// `bucket/key[#upload-id]` the operation addressed.
        target: String,
        /// The backend error.
        #[source]
        source: BackendError,
    },

    /// Local file I/O failed during a transfer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Wrap a backend error with the operation context.
    pub fn backend(
        operation: &'static str,
        target: impl Into<String>,
        source: BackendError,
    ) -> Self {
        StoreError::Backend {
            operation,
            target: target.into(),
            source,
        }
    }

    /// The underlying backend error, if this is a backend failure.
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            StoreError::Backend { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns true if the backend reported a missing bucket, key or upload.
    pub fn is_not_found(&self) -> bool {
        self.backend_error()
            .map(BackendError::is_not_found)
            .unwrap_or(false)
    }

    /// Returns the store error code if available.
    pub fn code(&self) -> Option<&str> {
        self.backend_error().and_then(BackendError::code)
    }

    /// Returns the store request ID if available.
    pub fn request_id(&self) -> Option<&str> {
        self.backend_error().and_then(BackendError::request_id)
    }
}

impl From<BackendError> for StoreError {
    fn from(source: BackendError) -> Self {
        StoreError::Backend {
            operation: "request",
            target: String::new(),
            source,
        }
    }
}

/// Attach operation context to backend results.
pub(crate) trait BackendResultExt<T> {
    /// Convert a backend failure into [`StoreError::Backend`].
    fn during<F>(self, operation: &'static str, target: F) -> Result<T, StoreError>
    where
        F: FnOnce() -> String;
}

impl<T> BackendResultExt<T> for Result<T, BackendError> {
    fn during<F>(self, operation: &'static str, target: F) -> Result<T, StoreError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|source| StoreError::backend(operation, target(), source))
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// An operation needed the default bucket and none is configured.
    #[error("No default bucket configured")]
    MissingDefaultBucket,

    /// No endpoint was configured.
    #[error("Missing endpoint: an endpoint URL must be configured")]
    MissingEndpoint,

    /// Missing access key or secret key.
    #[error("Missing credentials: access key and secret key must both be configured")]
    MissingCredentials,

    /// Invalid endpoint URL.
    #[error("Invalid endpoint URL '{url}': {details}")]
    InvalidEndpoint {
        /// The invalid URL.
        url: String,
        /// Details about the validation error.
        details: String,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue {
        /// The configuration field name.
        field: String,
        /// Error message.
        message: String,
    },

    /// The facade is disabled by configuration.
    #[error("Object store facade is disabled by configuration")]
    Disabled,
}

/// Caller argument errors.
#[derive(Debug, Error)]
pub enum ArgumentError {
    /// A duration unit outside the supported set.
    #[error("Unsupported time unit '{unit}'")]
    UnsupportedTimeUnit {
        /// The rejected unit.
        unit: String,
    },

    /// A bucket name that cannot be used as a DNS label.
    #[error("Invalid bucket name '{bucket}': {reason}")]
    InvalidBucketName {
        /// The invalid bucket name.
        bucket: String,
        /// Reason why the name is invalid.
        reason: String,
    },

    /// An empty object key where an object is required.
    #[error("Invalid object key '{key}': {reason}")]
    InvalidKey {
        /// The rejected key.
        key: String,
        /// Reason why the key is invalid.
        reason: String,
    },

    /// A streamed body declared a zero length.
    #[error("Content length must be greater than zero, got {length}")]
    NonPositiveContentLength {
        /// The declared length.
        length: u64,
    },

    /// A declared length that does not match the in-memory body.
    #[error("Declared content length {declared} does not match body length {actual}")]
    ContentLengthMismatch {
        /// Length the caller declared.
        declared: u64,
        /// Actual length of the body.
        actual: u64,
    },

    /// Part number outside 1..=10000.
    #[error("Part number {part_number} is outside 1..=10000")]
    InvalidPartNumber {
        /// The rejected part number.
        part_number: u32,
    },

    /// An inverted byte range.
    #[error("Invalid byte range {start}-{end}")]
    InvalidRange {
        /// First byte.
        start: u64,
        /// Last byte, inclusive.
        end: u64,
    },

    /// A presign expiration that cannot be represented or signed.
    #[error("Expiration out of range: {message}")]
    ExpirationOutOfRange {
        /// Details.
        message: String,
    },
}

/// Errors reported by the object store backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Bucket, key, upload or configuration does not exist.
    #[error("Not found ({code}): {message}")]
    NotFound {
        /// Store error code (e.g. `NoSuchKey`).
        code: String,
        /// Message from the store.
        message: String,
        /// Store request ID.
        request_id: Option<String>,
    },

    /// The credentials are not allowed to perform the operation.
    #[error("Access denied ({code}): {message}")]
    AccessDenied {
        /// Store error code.
        code: String,
        /// Message from the store.
        message: String,
        /// Store request ID.
        request_id: Option<String>,
    },

    /// The resource is in a conflicting state.
    #[error("Conflict ({code}): {message}")]
    Conflict {
        /// Store error code.
        code: String,
        /// Message from the store.
        message: String,
        /// Store request ID.
        request_id: Option<String>,
    },

    /// The store rejected a content digest.
    #[error("Checksum mismatch ({code}): {message}")]
    ChecksumMismatch {
        /// Store error code.
        code: String,
        /// Message from the store.
        message: String,
        /// Store request ID.
        request_id: Option<String>,
    },

    /// The store rejected the request as malformed.
    #[error("Invalid request ({code}): {message}")]
    InvalidRequest {
        /// Store error code.
        code: String,
        /// Message from the store.
        message: String,
        /// Store request ID.
        request_id: Option<String>,
    },

    /// The store failed internally.
    #[error("Server error ({code}, status {status}): {message}")]
    Server {
        /// Store error code.
        code: String,
        /// Message from the store.
        message: String,
        /// HTTP status.
        status: u16,
        /// Store request ID.
        request_id: Option<String>,
    },

    /// Transport-level failure.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// The request could not be signed.
    #[error("Signing error: {message}")]
    Signing {
        /// Details.
        message: String,
    },

    /// The store replied with something that could not be understood.
    #[error("Unexpected response: {message}")]
    Response {
        /// Details.
        message: String,
    },
}

impl BackendError {
    /// Returns the store error code if available.
    pub fn code(&self) -> Option<&str> {
        match self {
            BackendError::NotFound { code, .. }
            | BackendError::AccessDenied { code, .. }
            | BackendError::Conflict { code, .. }
            | BackendError::ChecksumMismatch { code, .. }
            | BackendError::InvalidRequest { code, .. }
            | BackendError::Server { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    /// Returns the store request ID if available.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            BackendError::NotFound { request_id, .. }
            | BackendError::AccessDenied { request_id, .. }
            | BackendError::Conflict { request_id, .. }
            | BackendError::ChecksumMismatch { request_id, .. }
            | BackendError::InvalidRequest { request_id, .. }
            | BackendError::Server { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }

    /// Returns true for missing buckets, keys and uploads.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound { .. })
    }

    /// Returns true if retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Network(e) => e.is_retryable(),
            BackendError::Server { status, .. } => matches!(status, 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}

/// Network and transport errors.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Connection could not be established.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Details.
        message: String,
    },

    /// The request timed out.
    #[error("Request timed out: {message}")]
    Timeout {
        /// Details.
        message: String,
    },

    /// Reading or writing a body failed mid-transfer.
    #[error("Body transfer failed: {message}")]
    Body {
        /// Details.
        message: String,
    },

    /// The HTTP client could not be constructed.
    #[error("Client setup failed: {message}")]
    Setup {
        /// Details.
        message: String,
    },
}

impl NetworkError {
    /// Returns true if the error is transient.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NetworkError::ConnectionFailed { .. }
                | NetworkError::Timeout { .. }
                | NetworkError::Body { .. }
        )
    }
}
