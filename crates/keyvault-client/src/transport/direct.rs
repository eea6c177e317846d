//! Direct HTTP transport.
//!
//! Used outside the sandbox. Each request is a JSON POST to the proxy
//! endpoint signed through the `Authorization` header.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use super::{Transport, TransportMode};
use crate::error::KeyVaultError;
use crate::response::is_error_body;
use crate::signed::SignedRequest;

/// Sends requests with a real HTTP client.
///
/// Idle connections are not kept between calls, so a finished request holds
/// no resources.
#[derive(Debug, Clone)]
pub struct DirectHttpTransport {
    client: Client,
}

impl DirectHttpTransport {
    /// Creates a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client fails to build.
    pub fn new(timeout: Duration) -> Result<Self, KeyVaultError> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for DirectHttpTransport {
    fn mode(&self) -> TransportMode {
        TransportMode::DirectHttp
    }

    async fn send(&self, request: &SignedRequest) -> Result<String, KeyVaultError> {
        debug!(
            "POST {} for {} {}",
            request.endpoint, request.payload.method, request.payload.path
        );

        let response = self
            .client
            .post(&request.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, request.signature.authorization_header())
            .json(&request.payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        if is_error_body(&body) {
            debug!("Proxy answered {status} with an error body");
            return Ok(with_default_status(body, status.as_u16()));
        }

        warn!("Proxy answered {status} without an error body");
        Err(KeyVaultError::transport(format!(
            "proxy returned HTTP {status}"
        )))
    }
}

/// Fills in the HTTP status on an error body that does not report a usable one.
fn with_default_status(body: String, status: u16) -> String {
    match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(mut fields)) if !has_valid_status(&fields) => {
            fields.insert("status".to_string(), Value::from(status));
            Value::Object(fields).to_string()
        }
        _ => body,
    }
}

fn has_valid_status(fields: &serde_json::Map<String, Value>) -> bool {
    fields
        .get("status")
        .and_then(Value::as_u64)
        .is_some_and(|s| u16::try_from(s).is_ok())
}
