use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::nonce::generate_nonce;

/// Extra headers forwarded upstream by the proxy.
pub type Headers = BTreeMap<String, String>;

/// HTTP methods the proxy forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    /// Read-only request; never carries a body.
    #[serde(rename = "GET")]
    Get,
    /// Request with an optional JSON body.
    #[serde(rename = "POST")]
    Post,
}

impl HttpMethod {
    /// Wire name of the method, as used in the canonical string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing a method other than GET or POST.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported HTTP method: {0}")]
pub struct UnsupportedMethod(pub String);

impl FromStr for HttpMethod {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            _ => Err(UnsupportedMethod(s.to_string())),
        }
    }
}

/// Builds the string the request signature is computed over.
///
/// Fields are joined with a literal `:` and are not escaped, so an alias or
/// path containing `:` can make two different requests share a canonical
/// string. Neither may be attacker-controlled.
///
/// Body and headers are not part of the signed string.
///
/// # Examples
///
/// ```
/// use keyvault_common::{HttpMethod, canonical_string};
///
/// let canonical = canonical_string(
///     "openweather",
///     HttpMethod::Get,
///     "/data/2.5/weather?q=Tokyo",
///     1_700_000_000_000,
///     "abc123",
/// );
/// assert_eq!(canonical, "openweather:GET:/data/2.5/weather?q=Tokyo:1700000000000:abc123");
/// ```
pub fn canonical_string(
    alias: &str,
    method: HttpMethod,
    path: &str,
    timestamp: i64,
    nonce: &str,
) -> String {
    format!("{alias}:{method}:{path}:{timestamp}:{nonce}")
}

/// The JSON document sent to the proxy for a single call.
///
/// Built fresh for every request and never reused: the proxy rejects a
/// repeated `(timestamp, nonce)` pair as a replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPayload {
    /// Credential alias the proxy resolves to a real key.
    pub alias: String,
    /// Upstream API path, including any query string.
    pub path: String,
    /// HTTP method to use upstream.
    pub method: HttpMethod,
    /// Milliseconds since the Unix epoch, captured at signing time.
    pub timestamp: i64,
    /// Single-use anti-replay token.
    pub nonce: String,
    /// JSON body forwarded upstream. Never present for GET.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    /// Extra headers forwarded upstream. Omitted when empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Headers>,
}

impl RequestPayload {
    /// Starts a payload for `alias`, `method` and `path`.
    pub fn builder(
        alias: impl Into<String>,
        method: HttpMethod,
        path: impl Into<String>,
    ) -> RequestPayloadBuilder {
        RequestPayloadBuilder {
            alias: alias.into(),
            method,
            path: path.into(),
            timestamp: None,
            nonce: None,
            body: None,
            headers: None,
        }
    }

    /// The string this payload's signature covers.
    pub fn canonical_string(&self) -> String {
        canonical_string(
            &self.alias,
            self.method,
            &self.path,
            self.timestamp,
            &self.nonce,
        )
    }
}

/// Builder for [`RequestPayload`].
///
/// Timestamp and nonce are captured at [`build`](Self::build) time unless set
/// explicitly, which is only useful for reproducing a known signature.
#[derive(Debug, Clone)]
#[must_use]
pub struct RequestPayloadBuilder {
    alias: String,
    method: HttpMethod,
    path: String,
    timestamp: Option<i64>,
    nonce: Option<String>,
    body: Option<serde_json::Value>,
    headers: Option<Headers>,
}

impl RequestPayloadBuilder {
    /// Pins the timestamp (milliseconds since the Unix epoch).
    pub const fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Pins the nonce.
    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Sets the JSON body. Ignored for GET.
    pub fn body(mut self, body: Option<serde_json::Value>) -> Self {
        self.body = body;
        self
    }

    /// Sets the forwarded headers. Dropped when empty.
    pub fn headers<I, K, V>(mut self, headers: Option<I>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers = headers.map(|h| {
            h.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect()
        });
        self
    }

    /// Produces the payload, capturing a fresh timestamp and nonce when unset.
    pub fn build(self) -> RequestPayload {
        let body = match self.method {
            HttpMethod::Get => None,
            HttpMethod::Post => self.body.filter(|b| !b.is_null()),
        };

        RequestPayload {
            alias: self.alias,
            path: self.path,
            method: self.method,
            timestamp: self
                .timestamp
                .unwrap_or_else(|| Utc::now().timestamp_millis()),
            nonce: self.nonce.unwrap_or_else(generate_nonce),
            body,
            headers: self.headers.filter(|h| !h.is_empty()),
        }
    }
}
