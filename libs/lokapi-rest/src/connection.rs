use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::RestError;

/// `label(.label)+`: labels of 1-63 alphanumerics/hyphens that neither start
/// nor end with a hyphen, and an alphabetic top-level label of 2+ characters.
static HOSTNAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$")
        .expect("static regex should not panic")
});

const DEFAULT_PROTOCOL: &str = "https";

/// Returns `true` when `host` has a DNS hostname shape.
#[must_use]
pub fn is_valid_host(host: &str) -> bool {
    HOSTNAME_REGEX.is_match(host)
}

/// Target of a REST client: `(protocol, host, base path)`.
///
/// Built from `host`, `host/base/path` or `proto://host/base/path`. The
/// protocol defaults to `https` and trailing slashes are dropped. The host is
/// validated lazily by [`Connection::validate`] so that an invalid target
/// fails on the first request, before the transport is reached.
#[derive(Clone, PartialEq, Eq)]
pub struct Connection {
    protocol: String,
    host: String,
    path: String,
}

impl Connection {
    #[must_use]
    pub fn parse(host_or_url: &str) -> Self {
        let (protocol, rest) = match host_or_url.split_once("://") {
            Some((protocol, rest)) => (protocol.to_owned(), rest),
            None => (DEFAULT_PROTOCOL.to_owned(), host_or_url),
        };
        let rest = rest.trim_end_matches('/');

        let (host, path) = match rest.split_once('/') {
            Some((host, path)) => (host.to_owned(), format!("/{path}")),
            None => (rest.to_owned(), String::new()),
        };

        Self {
            protocol,
            host,
            path,
        }
    }

    #[must_use]
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Base path prepended to every request path (empty or `/segment...`).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Check the host shape.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::InvalidConnectionDetails`] when the host is not a
    /// valid hostname.
    pub fn validate(&self) -> Result<(), RestError> {
        if is_valid_host(&self.host) {
            Ok(())
        } else {
            Err(RestError::InvalidConnectionDetails {
                host: self.host.clone(),
            })
        }
    }

    /// Join a request path onto the base path.
    #[must_use]
    pub fn join(&self, path: &str) -> String {
        format!("{}/{}", self.path, path.trim_start_matches('/'))
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.protocol, self.host, self.path)
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
