//! Host fetch transport.
//!
//! A sandbox host typically offers only a GET-only text fetch, so the signed
//! request cannot be sent as a JSON POST. Instead it is encoded into the query
//! string of the proxy endpoint:
//!
//! ```text
//! GET {proxy_url}/api/proxy?v=1&payload=<base64url(json)>&signature=<hex>
//! ```
//!
//! - `v` is the encoding version ([`FETCH_PROTOCOL_VERSION`]); any change to
//!   this layout bumps it.
//! - `payload` is the JSON transport payload, base64url-encoded without padding.
//! - `signature` is the same hex HMAC sent as `Authorization: Signature` in
//!   direct mode.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use log::debug;

use super::{HostFetch, Transport, TransportMode};
use crate::error::KeyVaultError;
use crate::signed::SignedRequest;

/// Version of the query-string encoding understood by the proxy.
pub const FETCH_PROTOCOL_VERSION: &str = "1";

/// Builds the GET URL carrying `request` for a host fetch.
///
/// # Errors
///
/// Returns [`KeyVaultError::Transport`] if the payload cannot be serialized or
/// the endpoint is not a valid URL.
pub fn encode_fetch_url(request: &SignedRequest) -> Result<String, KeyVaultError> {
    let json = serde_json::to_vec(&request.payload)
        .map_err(|e| KeyVaultError::transport_with_source("failed to encode request payload", e))?;

    let mut url = url::Url::parse(&request.endpoint).map_err(|e| {
        KeyVaultError::transport_with_source(
            format!("invalid proxy endpoint '{}'", request.endpoint),
            e,
        )
    })?;

    url.query_pairs_mut()
        .append_pair("v", FETCH_PROTOCOL_VERSION)
        .append_pair("payload", &URL_SAFE_NO_PAD.encode(json))
        .append_pair("signature", request.signature.as_str());

    Ok(url.into())
}

/// Sends requests through a host-provided [`HostFetch`] capability.
#[derive(Clone)]
pub struct HostFetchTransport {
    fetch: Arc<dyn HostFetch>,
}

impl HostFetchTransport {
    /// Wraps the host's fetch capability.
    pub fn new(fetch: Arc<dyn HostFetch>) -> Self {
        Self { fetch }
    }
}

impl fmt::Debug for HostFetchTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostFetchTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for HostFetchTransport {
    fn mode(&self) -> TransportMode {
        TransportMode::HostFetch
    }

    async fn send(&self, request: &SignedRequest) -> Result<String, KeyVaultError> {
        let url = encode_fetch_url(request)?;
        debug!(
            "Host fetch {} {} via {}",
            request.payload.method, request.payload.path, request.endpoint
        );

        self.fetch
            .fetch_text(&url)
            .await
            .map_err(|e| KeyVaultError::transport_with_source("host fetch failed", e))
    }
}
