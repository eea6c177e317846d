//! # keyvault-common
//!
//! Protocol building blocks shared by every gl-keyvault client.
//!
//! A request to the gl-keyvault proxy never carries a real API key. Instead it
//! names a credential *alias* and proves possession of a shared secret by
//! signing a canonical description of the request:
//!
//! ```text
//! alias:method:path:timestamp:nonce
//! ```
//!
//! This crate provides the pieces needed to build that proof:
//! - [`ClientConfig`]: alias, proxy base URL and shared secret
//! - [`RequestPayload`] and [`canonical_string`]: the transport payload and its signing string
//! - [`generate_nonce`]: single-use anti-replay tokens
//! - [`sign`] / [`verify`]: HMAC-SHA256 over the canonical string
//!
//! ## Example
//!
//! ```
//! use keyvault_common::{HttpMethod, RequestPayload, sign};
//!
//! let payload = RequestPayload::builder("openweather", HttpMethod::Get, "/data/2.5/weather?q=Tokyo")
//!     .timestamp(1_700_000_000_000)
//!     .nonce("abc123")
//!     .build();
//!
//! assert_eq!(
//!     payload.canonical_string(),
//!     "openweather:GET:/data/2.5/weather?q=Tokyo:1700000000000:abc123"
//! );
//!
//! let signature = sign("shared-secret", &payload.canonical_string());
//! assert_eq!(signature.as_str().len(), 64);
//! ```

/// Client configuration and environment defaults.
pub mod config;
/// Single-use nonce generation.
pub mod nonce;
/// Request payloads and canonical signing strings.
pub mod request;
/// HMAC-SHA256 request signatures.
pub mod signer;

pub use config::{
    ClientConfig, ConfigError, DEFAULT_PROXY_URL, DEFAULT_TIMEOUT, HMAC_SECRET_ENV,
    PROXY_URL_ENV,
};
pub use nonce::{NONCE_LEN, generate_nonce};
pub use request::{
    Headers, HttpMethod, RequestPayload, RequestPayloadBuilder, UnsupportedMethod,
    canonical_string,
};
pub use signer::{Signature, sign, verify};
