//! # keyvault-client
//!
//! Authenticated access to third-party APIs from sandboxed code, without the
//! code ever holding the real API keys.
//!
//! Requests are routed through the gl-keyvault proxy, which resolves a
//! credential alias to the real key, forwards the call, and returns a
//! sanitized response. This crate builds and signs those proxy requests:
//!
//! 1. canonicalize `alias:method:path:timestamp:nonce`
//! 2. sign it with HMAC-SHA256 using the shared secret
//! 3. send it through a host fetch capability, or directly over HTTP
//! 4. unwrap `{"data": ...}` or fail with a typed [`KeyVaultError`]
//!
//! ## Example
//!
//! ```no_run
//! use keyvault_client::SecureApi;
//!
//! # async fn example() -> anyhow::Result<()> {
//! // Proxy URL and secret come from GLVAULT_PROXY_URL / GLVAULT_HMAC_SECRET
//! let api = SecureApi::from_env("openweather")?;
//!
//! let data = api.get("/data/2.5/weather?q=Tokyo&units=metric", None).await?;
//! println!("Temperature: {}", data["main"]["temp"]);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod response;
pub mod signed;
pub mod transport;

pub use client::SecureApi;
pub use error::KeyVaultError;
pub use response::decode_response;
pub use signed::SignedRequest;
pub use transport::{
    DirectHttpTransport, HostFetch, HostFetchTransport, Transport, TransportMode,
};

pub use keyvault_common::{
    ClientConfig, ConfigError, Headers, HttpMethod, RequestPayload, Signature,
};
