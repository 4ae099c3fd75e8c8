//! Scripted in-memory transport for tests.
//!
//! Enabled inside this crate's own tests and, for downstream crates, through
//! the `testing` feature.

use async_trait::async_trait;
use http::{Method, StatusCode};
use parking_lot::Mutex;
use serde_json::Value;

use crate::transport::{HttpTransport, TransportError, TransportRequest};

/// Canned answer of a [`MockTransport`] route.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// 200 with the JSON-serialized value as body
    Json(Value),
    /// 200 with a raw body (useful for non-JSON payloads)
    Body(String),
    /// Non-2xx status with the given body
    Status(StatusCode, String),
}

struct Route {
    host: Option<String>,
    method: Method,
    path: String,
    response: MockResponse,
}

impl Route {
    fn matches(&self, request: &TransportRequest) -> bool {
        self.method == request.method
            && self.path == request.path_only()
            && self.host.as_deref().is_none_or(|h| h == request.host)
    }
}

/// [`HttpTransport`] answering from a route table and recording every request.
///
/// Routes are matched on method and path (query string excluded), optionally
/// on host. The most recently registered matching route wins. Unmatched
/// requests fail with a 404 [`TransportError::Status`].
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method path` on any host.
    pub fn on(&self, method: Method, path: &str, response: MockResponse) {
        self.routes.lock().push(Route {
            host: None,
            method,
            path: path.to_owned(),
            response,
        });
    }

    /// Answer `method path` on `host` only.
    pub fn on_host(&self, host: &str, method: Method, path: &str, response: MockResponse) {
        self.routes.lock().push(Route {
            host: Some(host.to_owned()),
            method,
            path: path.to_owned(),
            response,
        });
    }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<TransportRequest> {
        self.calls.lock().clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Requests received for `method path` (query string excluded).
    #[must_use]
    pub fn calls_to(&self, method: &Method, path: &str) -> Vec<TransportRequest> {
        self.calls
            .lock()
            .iter()
            .filter(|r| r.method == *method && r.path_only() == path)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn request(&self, request: TransportRequest) -> Result<String, TransportError> {
        let response = self
            .routes
            .lock()
            .iter()
            .rev()
            .find(|route| route.matches(&request))
            .map(|route| route.response.clone());
        self.calls.lock().push(request);

        match response {
            Some(MockResponse::Json(value)) => Ok(value.to_string()),
            Some(MockResponse::Body(body)) => Ok(body),
            Some(MockResponse::Status(status, body)) => {
                Err(TransportError::Status { status, body })
            }
            None => Err(TransportError::Status {
                status: StatusCode::NOT_FOUND,
                body: String::new(),
            }),
        }
    }
}
