//! Transports that deliver a signed request to the proxy.
//!
//! Two execution environments are supported:
//!
//! - **Host fetch**: inside a sandbox that only offers a GET-only "fetch this
//!   URL as text" capability. The signed request is encoded into the query
//!   string (see [`host_fetch`]).
//! - **Direct HTTP**: anywhere a real HTTP client is available (tests,
//!   tooling). The payload is POSTed as JSON with an
//!   `Authorization: Signature <hex>` header (see [`direct`]).
//!
//! [`SecureApi`](crate::SecureApi) picks the host fetch transport whenever a
//! [`HostFetch`] capability was injected, and direct HTTP otherwise.

use std::fmt;

use async_trait::async_trait;

use crate::error::KeyVaultError;
use crate::signed::SignedRequest;

pub mod direct;
pub mod host_fetch;

pub use direct::DirectHttpTransport;
pub use host_fetch::{FETCH_PROTOCOL_VERSION, HostFetchTransport, encode_fetch_url};

/// Which path a request takes to the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Host-provided, GET-only text fetch.
    HostFetch,
    /// Real HTTP POST from this process.
    DirectHttp,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostFetch => write!(f, "host-fetch"),
            Self::DirectHttp => write!(f, "direct-http"),
        }
    }
}

/// Delivers one signed request and returns the raw response text.
///
/// Implementations perform exactly one outbound call per `send` and never
/// retry.
#[async_trait]
pub trait Transport: Send + Sync {
    /// The execution mode this transport implements.
    fn mode(&self) -> TransportMode;

    /// Sends `request` to the proxy.
    ///
    /// # Errors
    ///
    /// Returns [`KeyVaultError::Transport`] on network failure. A proxy error
    /// body is returned as text so the caller can decode it.
    async fn send(&self, request: &SignedRequest) -> Result<String, KeyVaultError>;
}

/// A sandbox host's restricted network capability.
///
/// The host exposes a single GET-only operation returning the response body
/// as text. Its timeout, if any, is the host's concern.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use keyvault_client::HostFetch;
///
/// struct CannedFetch;
///
/// #[async_trait]
/// impl HostFetch for CannedFetch {
///     async fn fetch_text(&self, _url: &str) -> anyhow::Result<String> {
///         Ok(r#"{"data": {"temp": 20}}"#.to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait HostFetch: Send + Sync {
    /// Fetches `url` with GET and returns the body as text.
    ///
    /// # Errors
    ///
    /// Any error is surfaced to the caller as a transport error.
    async fn fetch_text(&self, url: &str) -> anyhow::Result<String>;
}
