//! Mapping from S3 error replies to typed backend errors.

use super::BackendError;

/// Parsed S3 error response body.
#[derive(Debug, Clone, Default)]
pub struct S3ErrorResponse {
    /// S3 error code (e.g., "NoSuchKey").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Affected resource (bucket name, key or upload id), if reported.
    pub resource: Option<String>,
    /// Request ID.
    pub request_id: Option<String>,
}

/// Map an S3 error code to a typed error.
///
/// Known codes decide the category; unknown codes fall back to the HTTP status.
pub fn map_error_code(status: u16, response: S3ErrorResponse) -> BackendError {
    let S3ErrorResponse {
        code,
        message,
        request_id,
        ..
    } = response;

    match code.as_str() {
        "NoSuchBucket"
        | "NoSuchKey"
        | "NoSuchUpload"
        | "NoSuchVersion"
        | "NoSuchBucketPolicy"
        | "NoSuchLifecycleConfiguration" => BackendError::NotFound {
            code,
            message,
            request_id,
        },

        "AccessDenied"
        | "AllAccessDisabled"
        | "InvalidAccessKeyId"
        | "SignatureDoesNotMatch"
        | "ExpiredToken"
        | "AccountProblem" => BackendError::AccessDenied {
            code,
            message,
            request_id,
        },

        "BucketAlreadyExists" | "BucketAlreadyOwnedByYou" | "BucketNotEmpty"
        | "OperationAborted" => BackendError::Conflict {
            code,
            message,
            request_id,
        },

        "BadDigest" | "InvalidDigest" | "XAmzContentSHA256Mismatch" => {
            BackendError::ChecksumMismatch {
                code,
                message,
                request_id,
            }
        }

        "InvalidPart" | "InvalidPartOrder" | "EntityTooSmall" | "EntityTooLarge"
        | "MalformedXML" | "MalformedPolicy" | "InvalidArgument" | "InvalidBucketName"
        | "InvalidRequest" | "InvalidRange" | "KeyTooLongError" | "TooManyParts" => {
            BackendError::InvalidRequest {
                code,
                message,
                request_id,
            }
        }

        "InternalError" | "ServiceUnavailable" | "SlowDown" => BackendError::Server {
            code,
            message,
            status,
            request_id,
        },

        _ => by_status(status, code, message, request_id),
    }
}

/// Map an HTTP status to an error when the reply carried no error body.
///
/// HEAD requests never have one, so a bare 404 is the usual case here.
pub fn map_http_status(status: u16, request_id: Option<String>) -> BackendError {
    let code = match status {
        400 => "BadRequest",
        403 => "Forbidden",
        404 => "NotFound",
        409 => "Conflict",
        412 => "PreconditionFailed",
        416 => "InvalidRange",
        _ if status >= 500 => "ServerError",
        _ => "UnexpectedStatus",
    };
    by_status(status, code.to_string(), format!("HTTP {}", status), request_id)
}

fn by_status(
    status: u16,
    code: String,
    message: String,
    request_id: Option<String>,
) -> BackendError {
    match status {
        404 => BackendError::NotFound {
            code,
            message,
            request_id,
        },
        401 | 403 => BackendError::AccessDenied {
            code,
            message,
            request_id,
        },
        409 => BackendError::Conflict {
            code,
            message,
            request_id,
        },
        500..=599 => BackendError::Server {
            code,
            message,
            status,
            request_id,
        },
        _ => BackendError::InvalidRequest {
            code,
            message,
            request_id,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn response(code: &str) -> S3ErrorResponse {
        S3ErrorResponse {
            code: code.to_string(),
            message: "message".to_string(),
            resource: None,
            request_id: Some("REQ".to_string()),
        }
    }

    #[test_case("NoSuchUpload", 404 ; "missing upload")]
    #[test_case("NoSuchKey", 404 ; "missing key")]
    #[test_case("NoSuchBucket", 404 ; "missing bucket")]
    fn test_not_found_codes(code: &str, status: u16) {
        let err = map_error_code(status, response(code));
        assert!(err.is_not_found());
        assert_eq!(err.code(), Some(code));
        assert_eq!(err.request_id(), Some("REQ"));
    }

    #[test]
    fn test_checksum_codes() {
        assert!(matches!(
            map_error_code(400, response("BadDigest")),
            BackendError::ChecksumMismatch { .. }
        ));
        assert!(matches!(
            map_error_code(400, response("InvalidDigest")),
            BackendError::ChecksumMismatch { .. }
        ));
    }

    #[test]
    fn test_unknown_code_uses_status() {
        assert!(matches!(
            map_error_code(503, response("Weird")),
            BackendError::Server { status: 503, .. }
        ));
        assert!(matches!(
            map_error_code(403, response("Weird")),
            BackendError::AccessDenied { .. }
        ));
        assert!(matches!(
            map_error_code(400, response("Weird")),
            BackendError::InvalidRequest { .. }
        ));
    }

    #[test]
    fn test_bare_status() {
        let err = map_http_status(404, None);
        assert!(err.is_not_found());
        assert_eq!(err.code(), Some("NotFound"));

        assert!(matches!(
            map_http_status(500, Some("R".to_string())),
            BackendError::Server { status: 500, .. }
        ));
    }
}
