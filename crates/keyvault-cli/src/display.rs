//! Display utilities for CLI output formatting

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;

use keyvault_client::{RequestPayload, SignedRequest};

/// Signing material printed by `keyvault sign`.
#[derive(Debug, Serialize)]
struct SignReport<'a> {
    endpoint: &'a str,
    canonical: &'a str,
    signature: &'a str,
    authorization: String,
    payload: &'a RequestPayload,
}

impl<'a> From<&'a SignedRequest> for SignReport<'a> {
    fn from(signed: &'a SignedRequest) -> Self {
        Self {
            endpoint: &signed.endpoint,
            canonical: &signed.canonical,
            signature: signed.signature.as_str(),
            authorization: signed.signature.authorization_header(),
            payload: &signed.payload,
        }
    }
}

/// Print response data as pretty JSON
pub fn display_data(data: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Print the signing material for a request
pub fn display_signed(signed: &SignedRequest) -> Result<()> {
    let report = SignReport::from(signed);

    eprintln!("{} {}", "canonical:".bright_blue(), report.canonical);
    eprintln!("{} {}", "signature:".bright_blue(), report.signature);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use keyvault_client::{ClientConfig, HttpMethod};

    #[test]
    fn test_sign_report_shape() {
        let config = ClientConfig::new("openweather")
            .with_proxy_url("https://proxy.example.com")
            .with_hmac_secret("secret");
        let payload = RequestPayload::builder("openweather", HttpMethod::Get, "/weather")
            .timestamp(1)
            .nonce("n")
            .build();
        let signed = SignedRequest::new(&config, payload);

        let report = serde_json::to_value(SignReport::from(&signed)).unwrap();
        assert_eq!(report["canonical"], "openweather:GET:/weather:1:n");
        assert_eq!(report["endpoint"], "https://proxy.example.com/api/proxy");
        assert_eq!(
            report["authorization"],
            format!("Signature {}", signed.signature)
        );
        assert_eq!(report["payload"]["nonce"], "n");
    }
}
