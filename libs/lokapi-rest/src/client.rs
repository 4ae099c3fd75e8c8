use std::sync::Arc;

use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::connection::Connection;
use crate::error::{RestError, json_preview};
use crate::transport::{HttpTransport, TransportRequest};

/// Headers sent with every request, overridable per call.
pub const COMMON_HEADERS: [(HeaderName, &str); 2] = [
    (CONTENT_TYPE, "application/json"),
    (ACCEPT, "application/json"),
];

/// Generates the `get`/`post`/`put`/`delete` family on top of a dispatch
/// method taking `(path, RequestOptions)`.
macro_rules! verbs {
    ($dispatch:ident: $($(#[$meta:meta])* $name:ident => $method:ident;)+) => {
        $(
            $(#[$meta])*
            ///
            /// # Errors
            ///
            /// See [`RestError`](crate::RestError) for the failure kinds.
            pub async fn $name(
                &self,
                path: &str,
                data: Option<serde_json::Value>,
                headers: Option<http::HeaderMap>,
            ) -> Result<serde_json::Value, $crate::RestError> {
                self.$dispatch(
                    path,
                    $crate::RequestOptions {
                        method: http::Method::$method,
                        headers: headers.unwrap_or_default(),
                        data,
                    },
                )
                .await
            }
        )+
    };
}
pub(crate) use verbs;

/// Per-call request options.
///
/// For `GET`, a non-empty `data` object is URL-query-encoded and no body is
/// sent. Other methods send `data` as the JSON body (`{}` when absent).
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub data: Option<Value>,
}

impl RequestOptions {
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            data: None,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

/// Stateless JSON-over-HTTP client bound to one [`Connection`].
///
/// Only the authentication header map is mutable, and only through
/// [`RestClient::set_auth_header`]. The transport is shared by reference so
/// every client built from the same capability uses the same pool.
pub struct RestClient {
    connection: Connection,
    transport: Arc<dyn HttpTransport>,
    auth_headers: RwLock<HeaderMap>,
}

impl RestClient {
    /// Build a client for `host`, `host/path` or `proto://host/path`.
    ///
    /// The host is not validated here; an invalid host fails on the first
    /// request with [`RestError::InvalidConnectionDetails`].
    #[must_use]
    pub fn new(host_or_url: &str, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            connection: Connection::parse(host_or_url),
            transport,
            auth_headers: RwLock::new(HeaderMap::new()),
        }
    }

    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    /// Set or remove a header sent with every authenticated call.
    ///
    /// `None` or an empty value removes the header.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::InvalidHeader`] if the name or value is not a
    /// valid HTTP header.
    pub fn set_auth_header(&self, name: &str, value: Option<&str>) -> Result<(), RestError> {
        let header = HeaderName::try_from(name)
            .map_err(|e| RestError::InvalidHeader(format!("{name}: {e}")))?;
        self.set_auth_header_value(header, value)
    }

    pub(crate) fn set_auth_header_value(
        &self,
        name: HeaderName,
        value: Option<&str>,
    ) -> Result<(), RestError> {
        match value.filter(|v| !v.is_empty()) {
            Some(v) => {
                let mut value = HeaderValue::try_from(v)
                    .map_err(|_| RestError::InvalidHeader(format!("invalid value for {name}")))?;
                value.set_sensitive(true);
                self.auth_headers.write().insert(name, value);
            }
            None => {
                self.auth_headers.write().remove(&name);
            }
        }
        Ok(())
    }

    /// Snapshot of the authentication headers.
    #[must_use]
    pub fn auth_headers(&self) -> HeaderMap {
        self.auth_headers.read().clone()
    }

    /// Unauthenticated request.
    ///
    /// # Errors
    ///
    /// - [`RestError::InvalidConnectionDetails`] when the host is invalid
    ///   (the transport is not called)
    /// - [`RestError::InvalidParameters`] when `GET` data is not an object
    /// - [`RestError::Transport`] when the transport fails
    /// - [`RestError::InvalidJson`] when the response is not JSON
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Value, RestError> {
        self.send(path, options, None).await
    }

    /// Request carrying the authentication headers, applied last so per-call
    /// headers cannot override them.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::AuthenticationRequired`] without calling the
    /// transport when no authentication header is set, otherwise the same
    /// errors as [`RestClient::request`].
    pub async fn auth_request(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Value, RestError> {
        let auth = self.auth_headers();
        if auth.is_empty() {
            return Err(RestError::authentication_required());
        }
        self.send(path, options, Some(auth)).await
    }

    verbs! { request:
        /// Unauthenticated `GET`.
        get => GET;
        /// Unauthenticated `POST`.
        post => POST;
        /// Unauthenticated `PUT`.
        put => PUT;
        /// Unauthenticated `DELETE`.
        delete => DELETE;
    }

    async fn send(
        &self,
        path: &str,
        options: RequestOptions,
        auth: Option<HeaderMap>,
    ) -> Result<Value, RestError> {
        self.connection.validate()?;

        let RequestOptions {
            method,
            headers: call_headers,
            data,
        } = options;

        let mut headers = common_headers();
        headers.extend(call_headers);
        if let Some(auth) = auth {
            headers.extend(auth);
        }

        let mut full_path = self.connection.join(path);
        let body = if method == Method::GET {
            if let Some(query) = encode_query(data.as_ref())? {
                full_path.push('?');
                full_path.push_str(&query);
            }
            None
        } else {
            Some(data.unwrap_or_else(|| Value::Object(Map::new())))
        };

        tracing::debug!(
            method = %method,
            path = %full_path,
            host = %self.connection.host(),
            "sending request"
        );

        let request = TransportRequest {
            protocol: self.connection.protocol().to_owned(),
            host: self.connection.host().to_owned(),
            path: full_path,
            method: method.clone(),
            headers,
            body,
        };

        let raw = match self.transport.request(request).await {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(
                    method = %method,
                    path = %path,
                    host = %self.connection.host(),
                    error = %err,
                    "request failed"
                );
                return Err(err.into());
            }
        };

        serde_json::from_str(&raw).map_err(|_| RestError::InvalidJson {
            preview: json_preview(&raw),
        })
    }
}

fn common_headers() -> HeaderMap {
    COMMON_HEADERS
        .into_iter()
        .map(|(name, value)| (name, HeaderValue::from_static(value)))
        .collect()
}

/// Encode `GET` data as a query string.
///
/// `None`, `null` and `{}` produce no query. Strings are sent raw, arrays as
/// comma-separated items, nested objects as JSON text; `null` members are
/// skipped.
fn encode_query(data: Option<&Value>) -> Result<Option<String>, RestError> {
    let fields = match data {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(fields)) if fields.is_empty() => return Ok(None),
        Some(Value::Object(fields)) => fields,
        Some(other) => {
            return Err(RestError::InvalidParameters(format!(
                "GET data must be a JSON object, got {}",
                json_kind(other)
            )));
        }
    };

    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        if value.is_null() {
            continue;
        }
        query.append_pair(key, &query_value(value));
    }
    Ok(Some(query.finish()))
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(query_value)
            .collect::<Vec<_>>()
            .join(","),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
