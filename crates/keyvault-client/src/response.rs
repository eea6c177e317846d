//! Decoding of proxy responses.
//!
//! The proxy answers with one of:
//!
//! ```json
//! {"data": {"main": {"temp": 21.4}}}
//! {"error": "Unknown alias", "status": 404}
//! ```
//!
//! Proxies that omit the `data` envelope are tolerated: a body with neither
//! `error` nor `data` is returned as-is.

use serde_json::Value;

use crate::error::{DEFAULT_PROXY_ERROR_STATUS, KeyVaultError};

/// Parses raw response text and unwraps the proxy envelope.
///
/// # Errors
///
/// - [`KeyVaultError::Decode`] if `raw` is not valid JSON
/// - [`KeyVaultError::Proxy`] if the body is an object with an `error` field
pub fn decode_response(raw: &str) -> Result<Value, KeyVaultError> {
    let parsed: Value = serde_json::from_str(raw)?;
    unwrap_envelope(parsed)
}

/// Unwraps an already parsed proxy response.
///
/// # Errors
///
/// Returns [`KeyVaultError::Proxy`] if the body is an object with an `error` field.
pub fn unwrap_envelope(response: Value) -> Result<Value, KeyVaultError> {
    let Value::Object(mut fields) = response else {
        return Ok(response);
    };

    if let Some(error) = fields.get("error") {
        let message = match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let status = fields
            .get("status")
            .and_then(Value::as_u64)
            .and_then(|s| u16::try_from(s).ok())
            .unwrap_or(DEFAULT_PROXY_ERROR_STATUS);

        return Err(KeyVaultError::Proxy { message, status });
    }

    match fields.remove("data") {
        Some(data) => Ok(data),
        None => Ok(Value::Object(fields)),
    }
}

/// Returns `true` if `raw` parses to an object carrying an `error` field.
pub(crate) fn is_error_body(raw: &str) -> bool {
    serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|v| v.as_object().map(|o| o.contains_key("error")))
        .unwrap_or(false)
}
