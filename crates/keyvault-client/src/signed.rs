use keyvault_common::{ClientConfig, RequestPayload, Signature, sign};
use secrecy::ExposeSecret;

/// A payload together with the proof that it came from a holder of the
/// shared secret.
///
/// Produced by [`SecureApi::sign_payload`](crate::SecureApi::sign_payload)
/// and consumed by exactly one [`Transport::send`](crate::Transport::send).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Full proxy endpoint URL (`{proxy_url}/api/proxy`).
    pub endpoint: String,
    /// The transport payload.
    pub payload: RequestPayload,
    /// The string the signature covers.
    pub canonical: String,
    /// HMAC-SHA256 of `canonical`.
    pub signature: Signature,
}

impl SignedRequest {
    /// Signs `payload` with the secret from `config`.
    pub fn new(config: &ClientConfig, payload: RequestPayload) -> Self {
        let canonical = payload.canonical_string();
        let signature = sign(config.hmac_secret.expose_secret(), &canonical);

        Self {
            endpoint: config.proxy_endpoint(),
            payload,
            canonical,
            signature,
        }
    }
}
