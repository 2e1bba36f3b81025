//! Mock HTTP transport for testing.

use crate::error::{BackendError, NetworkError};
use crate::transfer::ByteStream;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::TryStreamExt;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Canned HTTP response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Bytes,
}

impl MockResponse {
    /// A response with `status` and `body`.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Empty 200 response.
    pub fn ok() -> Self {
        Self::new(200, Bytes::new())
    }

    /// 200 response with body.
    pub fn ok_with_body(body: impl Into<Bytes>) -> Self {
        Self::new(200, body)
    }

    /// Error response carrying an `<Error>` document.
    pub fn error(status: u16, code: &str, message: &str) -> Self {
        Self::new(
            status,
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Error><Code>{}</Code><Message>{}</Message><RequestId>mock-request-id</RequestId></Error>",
                code, message
            ),
        )
    }

    /// Add a header to the response.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

impl From<MockResponse> for HttpResponse {
    fn from(mock: MockResponse) -> Self {
        HttpResponse {
            status: mock.status,
            headers: mock.headers,
            body: mock.body,
        }
    }
}

/// Transport that replays queued responses and records every request.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
    streamed: Mutex<Vec<Bytes>>,
    default_response: Option<MockResponse>,
}

impl MockTransport {
    /// Transport with no responses; every request fails until one is queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport with queued responses.
    pub fn with_responses(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    /// Transport answering with `response` whenever the queue is empty.
    pub fn with_default(response: MockResponse) -> Self {
        Self {
            default_response: Some(response),
            ..Self::default()
        }
    }

    /// Queue a response.
    pub fn queue_response(&self, response: MockResponse) {
        self.responses.lock().push_back(response);
    }

    /// Queue a response with `status` and `body`.
    pub fn push_response(&self, status: u16, body: impl Into<Bytes>) {
        self.queue_response(MockResponse::new(status, body));
    }

    /// Queue a response with `status`, `body` and headers.
    pub fn push_response_with_headers(
        &self,
        status: u16,
        body: impl Into<Bytes>,
        headers: &[(&str, &str)],
    ) {
        let response = headers
            .iter()
            .fold(MockResponse::new(status, body), |response, (name, value)| {
                response.with_header(*name, *value)
            });
        self.queue_response(response);
    }

    /// All recorded requests.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests made.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// The last request made.
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().last().cloned()
    }

    /// Bodies received through `send_streaming`, in order.
    pub fn streamed_bodies(&self) -> Vec<Bytes> {
        self.streamed.lock().clone()
    }

    fn respond(&self, request: HttpRequest) -> Result<HttpResponse, BackendError> {
        self.requests.lock().push(request);

        let response = self
            .responses
            .lock()
            .pop_front()
            .or_else(|| self.default_response.clone());

        response.map(HttpResponse::from).ok_or_else(|| {
            BackendError::Network(NetworkError::ConnectionFailed {
                message: "No mock response available".to_string(),
            })
        })
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BackendError> {
        self.respond(request)
    }

    async fn send_streaming(
        &self,
        request: HttpRequest,
        body: ByteStream,
    ) -> Result<HttpResponse, BackendError> {
        let collected = body
            .try_fold(BytesMut::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
            .map_err(|e| {
                BackendError::Network(NetworkError::Body {
                    message: e.to_string(),
                })
            })?;
        self.streamed.lock().push(collected.freeze());
        self.respond(request)
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("queued_responses", &self.responses.lock().len())
            .field("recorded_requests", &self.requests.lock().len())
            .finish()
    }
}
