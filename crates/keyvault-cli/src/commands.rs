//! Command implementations for the CLI.

use anyhow::{Context, Result};
use log::debug;
use serde_json::Value;

use keyvault_client::{Headers, HttpMethod, RequestPayload, SecureApi};

use crate::display::{display_data, display_signed};

/// Sends one request through the proxy and prints the unwrapped data.
pub async fn send(
    api: &SecureApi,
    method: HttpMethod,
    path: &str,
    body: Option<Value>,
    headers: Option<Headers>,
) -> Result<()> {
    debug!("Sending {method} {path} via {}", api.transport_mode());

    let data = api
        .request(method, path, body, headers)
        .await
        .with_context(|| format!("{method} {path} through alias '{}' failed", api.config().alias))?;

    display_data(&data)
}

/// Signs `payload` and prints the signing material without sending it.
pub fn sign(api: &SecureApi, payload: RequestPayload) -> Result<()> {
    let signed = api.sign_payload(payload);
    display_signed(&signed)
}

/// Prints the URL a host fetch would request for `payload`.
pub fn fetch_url(api: &SecureApi, payload: RequestPayload) -> Result<()> {
    let url = api.host_fetch_url(payload)?;
    println!("{url}");
    Ok(())
}
