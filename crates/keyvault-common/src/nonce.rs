use chrono::Utc;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Length of a generated nonce in hex characters (128 bits).
pub const NONCE_LEN: usize = 32;

/// Number of random bytes mixed into each nonce.
const RANDOM_BYTES: usize = 16;

/// Generates a single-use nonce for replay protection.
///
/// The nonce is the SHA-256 of the current wall-clock time in nanoseconds
/// concatenated with 16 bytes from the operating system's secure RNG,
/// truncated to [`NONCE_LEN`] lowercase hex characters.
///
/// # Panics
///
/// Panics if the operating system RNG is unavailable. A predictable nonce
/// would silently disable replay protection, so there is no fallback.
///
/// # Examples
///
/// ```
/// use keyvault_common::{NONCE_LEN, generate_nonce};
///
/// let nonce = generate_nonce();
/// assert_eq!(nonce.len(), NONCE_LEN);
/// assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
/// ```
pub fn generate_nonce() -> String {
    let mut random = [0_u8; RANDOM_BYTES];
    OsRng.fill_bytes(&mut random);

    let now = Utc::now();
    let clock = now
        .timestamp_nanos_opt()
        .map_or_else(|| now.timestamp_micros().to_string(), |n| n.to_string());

    let mut hasher = Sha256::new();
    hasher.update(clock.as_bytes());
    hasher.update(hex::encode(random).as_bytes());

    let mut nonce = hex::encode(hasher.finalize());
    nonce.truncate(NONCE_LEN);
    nonce
}
