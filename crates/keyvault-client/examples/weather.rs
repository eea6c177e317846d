//! Current weather through the gl-keyvault proxy.
//!
//! The OpenWeather key never leaves the proxy; this program only knows the
//! `openweather` alias and the shared signing secret.
//!
//! ```sh
//! GLVAULT_PROXY_URL=http://localhost:3000 \
//! GLVAULT_HMAC_SECRET=dev-secret \
//! RUST_LOG=debug \
//! cargo run -p keyvault-client --example weather -- Tokyo
//! ```

use anyhow::Result;
use keyvault_client::SecureApi;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let city = std::env::args().nth(1).unwrap_or_else(|| "Tokyo".to_string());
    let api = SecureApi::from_env("openweather")?;

    let data = api
        .get(&format!("/data/2.5/weather?q={city}&units=metric"), None)
        .await?;

    println!("City: {city}");
    println!("Temperature: {}", data["main"]["temp"]);
    println!("Conditions: {}", data["weather"][0]["description"]);

    Ok(())
}
