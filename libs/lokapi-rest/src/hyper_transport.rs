use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderValue;
use http::header::USER_AGENT;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};

use crate::config::TransportConfig;
use crate::transport::{HttpTransport, TransportError, TransportRequest};

type HyperClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Default [`HttpTransport`] built on hyper-util's pooled client with rustls.
///
/// HTTPS only unless [`TransportConfig::allow_insecure_http`] is set. Each
/// request (including reading the body) is bounded by the configured timeout
/// and the body by `max_body_size`. Non-2xx responses become
/// [`TransportError::Status`] with the body text attached. No retries.
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient,
    timeout: Duration,
    max_body_size: usize,
    allow_insecure_http: bool,
    user_agent: HeaderValue,
}

impl HyperTransport {
    /// Build the transport.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if TLS initialization fails or the
    /// configured user agent is not a valid header value.
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        if config.allow_insecure_http {
            tracing::warn!("insecure HTTP enabled on transport; use only with local mock servers");
        }

        let builder = hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(crypto_provider())
            .map_err(|e| TransportError::Io(Box::new(e)))?;
        let https = if config.allow_insecure_http {
            builder.https_or_http().enable_all_versions().build()
        } else {
            builder.https_only().enable_all_versions().build()
        };

        let mut client_builder = Client::builder(TokioExecutor::new());
        client_builder.pool_timer(TokioTimer::new());
        let client = client_builder.build::<_, Full<Bytes>>(https);

        let user_agent = HeaderValue::try_from(config.user_agent.as_str())
            .map_err(|e| TransportError::Io(Box::new(e)))?;

        Ok(Self {
            client,
            timeout: config.timeout(),
            max_body_size: config.max_body_size,
            allow_insecure_http: config.allow_insecure_http,
            user_agent,
        })
    }

    fn check_scheme(&self, protocol: &str) -> Result<(), TransportError> {
        match protocol {
            "https" => Ok(()),
            "http" if self.allow_insecure_http => Ok(()),
            other => Err(TransportError::Io(
                format!("URL scheme '{other}' not allowed by transport configuration").into(),
            )),
        }
    }

    async fn send(&self, request: TransportRequest) -> Result<String, TransportError> {
        let body = match &request.body {
            Some(value) => {
                Bytes::from(serde_json::to_vec(value).map_err(|e| TransportError::Io(Box::new(e)))?)
            }
            None => Bytes::new(),
        };

        let mut builder = http::Request::builder()
            .method(request.method.clone())
            .uri(request.url());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(request.headers);
            headers
                .entry(USER_AGENT)
                .or_insert_with(|| self.user_agent.clone());
        }
        let http_request = builder
            .body(Full::new(body))
            .map_err(|e| TransportError::Io(Box::new(e)))?;

        let response = self
            .client
            .request(http_request)
            .await
            .map_err(|e| TransportError::Io(Box::new(e)))?;
        let status = response.status();

        let collected = Limited::new(response.into_body(), self.max_body_size)
            .collect()
            .await
            .map_err(|e| {
                if e.is::<LengthLimitError>() {
                    TransportError::BodyTooLarge {
                        limit: self.max_body_size,
                    }
                } else {
                    TransportError::Io(e)
                }
            })?;
        let text = String::from_utf8_lossy(&collected.to_bytes()).into_owned();

        if status.is_success() {
            Ok(text)
        } else {
            Err(TransportError::Status { status, body: text })
        }
    }
}

#[async_trait]
impl HttpTransport for HyperTransport {
    async fn request(&self, request: TransportRequest) -> Result<String, TransportError> {
        self.check_scheme(&request.protocol)?;
        tokio::time::timeout(self.timeout, self.send(request))
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
    }
}

/// Use the process-wide rustls provider when one is installed, aws-lc-rs
/// otherwise (without installing it globally).
fn crypto_provider() -> Arc<rustls::crypto::CryptoProvider> {
    rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use http::{HeaderMap, Method, StatusCode};
    use httpmock::prelude::*;
    use serde_json::json;

    fn request_to(server: &MockServer, method: Method, path: &str) -> TransportRequest {
        TransportRequest {
            protocol: "http".to_owned(),
            host: server.address().to_string(),
            path: path.to_owned(),
            method,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn get_returns_raw_text() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/accounts").query_param("page", "2");
            then.status(200).body(r#"[{"id":"1"}]"#);
        });

        let transport = HyperTransport::new(&TransportConfig::for_testing()).unwrap();
        let text = transport
            .request(request_to(&server, Method::GET, "/api/accounts?page=2"))
            .await
            .unwrap();

        assert_eq!(text, r#"[{"id":"1"}]"#);
        mock.assert();
    }

    #[tokio::test]
    async fn post_sends_json_body_and_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/payments")
                .header("session-token", "tok")
                .json_body(json!({"amount": "10"}));
            then.status(200).body("{}");
        });

        let transport = HyperTransport::new(&TransportConfig::for_testing()).unwrap();
        let mut req = request_to(&server, Method::POST, "/payments");
        req.headers
            .insert("session-token", HeaderValue::from_static("tok"));
        req.body = Some(json!({"amount": "10"}));

        transport.request(req).await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn non_success_status_keeps_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/private");
            then.status(401).body(r#"{"error":"denied"}"#);
        });

        let transport = HyperTransport::new(&TransportConfig::for_testing()).unwrap();
        let err = transport
            .request(request_to(&server, Method::GET, "/private"))
            .await
            .unwrap_err();

        match err {
            TransportError::Status { status, body } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(body, r#"{"error":"denied"}"#);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn body_limit_is_enforced() {
        let server = MockServer::start();
        let large = "x".repeat(4096);
        server.mock(|when, then| {
            when.method(GET).path("/large");
            then.status(200).body(&large);
        });

        let config = TransportConfig {
            max_body_size: 1024,
            ..TransportConfig::for_testing()
        };
        let transport = HyperTransport::new(&config).unwrap();
        let err = transport
            .request(request_to(&server, Method::GET, "/large"))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::BodyTooLarge { limit: 1024 }));
    }

    #[tokio::test]
    async fn plain_http_rejected_by_default() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200).body("{}");
        });

        let transport = HyperTransport::new(&TransportConfig::default()).unwrap();
        let err = transport
            .request(request_to(&server, Method::GET, "/"))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Io(_)));
        mock.assert_calls(0);
    }
}
