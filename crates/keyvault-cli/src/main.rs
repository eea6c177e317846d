//! keyvault - sign and send gl-keyvault proxy requests from the command line
//!
//! Always uses direct HTTP. Proxy URL and secret default to
//! `GLVAULT_PROXY_URL` / `GLVAULT_HMAC_SECRET` and can be overridden per call.
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use keyvault_client::{ClientConfig, Headers, HttpMethod, SecureApi};

mod commands;
mod display;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the gl-keyvault proxy (or set GLVAULT_PROXY_URL)
    #[arg(long, global = true)]
    proxy_url: Option<String>,

    /// Shared HMAC signing secret (or set GLVAULT_HMAC_SECRET)
    #[arg(long, global = true)]
    hmac_secret: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = 10)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send an authenticated GET through the proxy
    Get {
        /// Credential alias registered with the proxy
        alias: String,
        /// Upstream API path, including any query string
        path: String,
        /// Header forwarded upstream, as `name=value` (repeatable)
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },

    /// Send an authenticated POST through the proxy
    Post {
        /// Credential alias registered with the proxy
        alias: String,
        /// Upstream API path
        path: String,
        /// JSON request body
        #[arg(long)]
        body: Option<String>,
        /// Header forwarded upstream, as `name=value` (repeatable)
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },

    /// Print the canonical string, signature and payload without sending
    Sign {
        /// Credential alias registered with the proxy
        alias: String,
        /// GET or POST
        method: HttpMethod,
        /// Upstream API path
        path: String,
        /// JSON request body (POST only)
        #[arg(long)]
        body: Option<String>,
        /// Header forwarded upstream, as `name=value` (repeatable)
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
        /// Pin the timestamp (milliseconds since the Unix epoch)
        #[arg(long)]
        timestamp: Option<i64>,
        /// Pin the nonce
        #[arg(long)]
        nonce: Option<String>,
    },

    /// Print the URL a sandbox host fetch would request
    FetchUrl {
        /// Credential alias registered with the proxy
        alias: String,
        /// GET or POST
        method: HttpMethod,
        /// Upstream API path
        path: String,
        /// JSON request body (POST only)
        #[arg(long)]
        body: Option<String>,
        /// Header forwarded upstream, as `name=value` (repeatable)
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },
}

/// Parses `name=value` or `name: value`, splitting at the first separator.
fn parse_header(raw: &str) -> Result<(String, String), String> {
    let split = raw
        .find([':', '='])
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let (name, value) = (&raw[..split], &raw[split + 1..]);

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header name is empty in '{raw}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn parse_body(body: Option<&str>) -> Result<Option<serde_json::Value>> {
    body.map(|raw| serde_json::from_str(raw).context("--body must be valid JSON"))
        .transpose()
}

fn into_headers(headers: Vec<(String, String)>) -> Option<Headers> {
    if headers.is_empty() {
        None
    } else {
        Some(headers.into_iter().collect())
    }
}

impl Args {
    fn client(&self, alias: &str) -> Result<SecureApi> {
        let mut config =
            ClientConfig::from_env(alias).with_timeout(Duration::from_secs(self.timeout));
        if let Some(url) = &self.proxy_url {
            config = config.with_proxy_url(url);
        }
        if let Some(secret) = &self.hmac_secret {
            config = config.with_hmac_secret(secret);
        }

        SecureApi::new(config).with_context(|| format!("invalid configuration for alias '{alias}'"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    match &args.command {
        Command::Get {
            alias,
            path,
            headers,
        } => {
            let api = args.client(alias)?;
            commands::send(&api, HttpMethod::Get, path, None, into_headers(headers.clone()))
                .await
        }
        Command::Post {
            alias,
            path,
            body,
            headers,
        } => {
            let api = args.client(alias)?;
            let body = parse_body(body.as_deref())?;
            commands::send(&api, HttpMethod::Post, path, body, into_headers(headers.clone()))
                .await
        }
        Command::Sign {
            alias,
            method,
            path,
            body,
            headers,
            timestamp,
            nonce,
        } => {
            let api = args.client(alias)?;
            let mut builder = api
                .payload(*method, path.as_str())
                .body(parse_body(body.as_deref())?)
                .headers(into_headers(headers.clone()));
            if let Some(timestamp) = timestamp {
                builder = builder.timestamp(*timestamp);
            }
            if let Some(nonce) = nonce {
                builder = builder.nonce(nonce.as_str());
            }
            commands::sign(&api, builder.build())
        }
        Command::FetchUrl {
            alias,
            method,
            path,
            body,
            headers,
        } => {
            let api = args.client(alias)?;
            let payload = api
                .payload(*method, path.as_str())
                .body(parse_body(body.as_deref())?)
                .headers(into_headers(headers.clone()))
                .build();
            commands::fetch_url(&api, payload)
        }
    }
}
