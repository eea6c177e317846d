use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Prefix of the `Authorization` header value carrying a signature.
const AUTHORIZATION_SCHEME: &str = "Signature";

/// Lowercase hex HMAC-SHA256 over a canonical request string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(String);

impl Signature {
    /// The hex digest (64 characters).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header: `Signature <hex>`.
    pub fn authorization_header(&self) -> String {
        format!("{AUTHORIZATION_SCHEME} {}", self.0)
    }

    /// Consumes the signature, returning the hex digest.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Signature {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn keyed_mac(secret: &str) -> HmacSha256 {
    // HMAC accepts keys of any length, including empty ones.
    HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts keys of any length"))
}

/// Signs `canonical` with `secret` using HMAC-SHA256.
///
/// An empty secret still produces a signature; production configurations are
/// expected to supply a non-empty one.
///
/// # Examples
///
/// ```
/// use keyvault_common::sign;
///
/// let signature = sign("secret", "message");
/// assert_eq!(
///     signature.as_str(),
///     "8b5f48702995c1598c573db1e21866a9b825d4a794d169d7060a03605796360b"
/// );
/// ```
pub fn sign(secret: &str, canonical: &str) -> Signature {
    let mut mac = keyed_mac(secret);
    mac.update(canonical.as_bytes());
    Signature(hex::encode(mac.finalize().into_bytes()))
}

/// Checks a hex signature against `canonical` in constant time.
///
/// Verifiers (the proxy, or tests standing in for it) must compare signatures
/// this way rather than with `==` on the hex strings. Malformed hex is
/// rejected.
pub fn verify(secret: &str, canonical: &str, signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };

    let mut mac = keyed_mac(secret);
    mac.update(canonical.as_bytes());
    mac.verify_slice(&expected).is_ok()
}
