//! Error types for the proxy client.

use keyvault_common::ConfigError;
use thiserror::Error;

/// Status reported for a proxy error that does not carry one.
pub const DEFAULT_PROXY_ERROR_STATUS: u16 = 500;

/// Boxed source for transport failures raised by any transport.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by [`SecureApi`](crate::SecureApi).
///
/// Every failed call yields exactly one of these kinds. Nothing is retried by
/// the client itself.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KeyVaultError {
    /// The proxy reported an application-level failure.
    ///
    /// Unknown alias, rate limiting, or an upstream API error. The status is
    /// taken from the response, defaulting to 500.
    #[error("Proxy error ({status}): {message}")]
    Proxy {
        /// Human-readable message from the proxy.
        message: String,
        /// Status reported by the proxy.
        status: u16,
    },

    /// The response body was not valid JSON.
    ///
    /// Indicates a protocol mismatch between client and proxy.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Network-level failure: timeout, connection or DNS failure, an HTTP
    /// error without a proxy error body, or a failed host fetch.
    #[error("Transport error: {message}")]
    Transport {
        /// What went wrong.
        message: String,
        /// Underlying error, when one exists.
        #[source]
        source: Option<BoxError>,
    },

    /// The client configuration was rejected at construction.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl KeyVaultError {
    /// Builds a transport error with no underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a transport error wrapping `source`.
    pub fn transport_with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Check if the proxy itself reported this error.
    pub const fn is_proxy_error(&self) -> bool {
        matches!(self, Self::Proxy { .. })
    }

    /// Check if this is a transport-level failure.
    pub const fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Status carried by a proxy error.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Proxy { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if a caller could reasonably retry this call.
    ///
    /// True for transport failures and for proxy errors with status 429 or
    /// 5xx. The client never retries on its own; retry policy belongs to the
    /// caller.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Proxy { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for KeyVaultError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request to proxy timed out".to_string()
        } else if err.is_connect() {
            "could not connect to proxy".to_string()
        } else {
            "HTTP request to proxy failed".to_string()
        };
        Self::transport_with_source(message, err)
    }
}
