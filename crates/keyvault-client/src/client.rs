//! The gl-keyvault proxy client.
//!
//! [`SecureApi`] turns a `get`/`post` call into a signed proxy request,
//! dispatches it through the transport suited to the execution environment,
//! and unwraps the proxy's response.
//!
//! # Security
//!
//! The client never sees a real API key. It holds a credential alias and a
//! shared secret, stored as a `SecretString`, and proves possession of the
//! secret by signing `alias:method:path:timestamp:nonce` with HMAC-SHA256.
//! Body and headers are not covered by the signature; only routing metadata
//! is protected against tampering and replay.

use std::sync::Arc;

use log::debug;
use serde_json::Value;

use keyvault_common::{ClientConfig, Headers, HttpMethod, RequestPayload, RequestPayloadBuilder};

use crate::error::KeyVaultError;
use crate::response::decode_response;
use crate::signed::SignedRequest;
use crate::transport::{
    DirectHttpTransport, HostFetch, HostFetchTransport, Transport, TransportMode,
    encode_fetch_url,
};

/// Authenticated access to third-party APIs through the gl-keyvault proxy.
///
/// The client is cheaply cloneable and holds no per-call state, so one
/// instance can serve concurrent calls from many tasks.
///
/// # Examples
///
/// ```no_run
/// use keyvault_client::{ClientConfig, SecureApi};
///
/// # async fn example() -> Result<(), keyvault_client::KeyVaultError> {
/// let api = SecureApi::new(
///     ClientConfig::new("openweather")
///         .with_proxy_url("https://gl-keyvault.vercel.app")
///         .with_hmac_secret("shared-secret"),
/// )?;
///
/// let data = api.get("/data/2.5/weather?q=London&units=metric", None).await?;
/// println!("{}", data["main"]["temp"]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SecureApi {
    config: Arc<ClientConfig>,
    direct: DirectHttpTransport,
    host: Option<HostFetchTransport>,
}

impl std::fmt::Debug for SecureApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureApi")
            .field("config", &self.config)
            .field("transport", &self.transport_mode())
            .finish_non_exhaustive()
    }
}

impl SecureApi {
    /// Creates a client from `config`.
    ///
    /// The configuration is validated here so that a bad alias or proxy URL
    /// fails before the first call.
    ///
    /// # Errors
    ///
    /// Returns [`KeyVaultError::Configuration`] if the alias is empty or the
    /// proxy URL is invalid, or [`KeyVaultError::Transport`] if the HTTP client
    /// cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, KeyVaultError> {
        let config = config.validated()?;
        let direct = DirectHttpTransport::new(config.timeout)?;

        Ok(Self {
            config: Arc::new(config),
            direct,
            host: None,
        })
    }

    /// Creates a client for `alias` with proxy URL and secret taken from
    /// `GLVAULT_PROXY_URL` and `GLVAULT_HMAC_SECRET`.
    ///
    /// # Errors
    ///
    /// See [`SecureApi::new`].
    pub fn from_env(alias: impl Into<String>) -> Result<Self, KeyVaultError> {
        Self::new(ClientConfig::from_env(alias))
    }

    /// Routes every request through the host's fetch capability.
    ///
    /// Use this inside a sandbox that offers a GET-only fetch instead of a
    /// general HTTP client.
    #[must_use]
    pub fn with_host_fetch(mut self, fetch: Arc<dyn HostFetch>) -> Self {
        self.host = Some(HostFetchTransport::new(fetch));
        self
    }

    /// The validated configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The transport the next call will use.
    pub fn transport_mode(&self) -> TransportMode {
        self.transport().mode()
    }

    /// Makes an authenticated GET request through the proxy.
    ///
    /// # Arguments
    ///
    /// * `path` - Upstream API path (e.g. "/data/2.5/weather?q=Tokyo")
    /// * `headers` - Optional headers forwarded upstream
    ///
    /// # Errors
    ///
    /// See [`SecureApi::request`].
    pub async fn get(&self, path: &str, headers: Option<Headers>) -> Result<Value, KeyVaultError> {
        self.request(HttpMethod::Get, path, None, headers).await
    }

    /// Makes an authenticated POST request through the proxy.
    ///
    /// # Arguments
    ///
    /// * `path` - Upstream API path
    /// * `body` - Optional JSON body
    /// * `headers` - Optional headers forwarded upstream
    ///
    /// # Errors
    ///
    /// See [`SecureApi::request`].
    pub async fn post(
        &self,
        path: &str,
        body: Option<Value>,
        headers: Option<Headers>,
    ) -> Result<Value, KeyVaultError> {
        self.request(HttpMethod::Post, path, body, headers).await
    }

    /// Signs and sends one request, returning the unwrapped `data` value.
    ///
    /// A fresh timestamp and nonce are captured for every call. Exactly one
    /// outbound call is made and nothing is retried.
    ///
    /// # Errors
    ///
    /// - [`KeyVaultError::Proxy`] if the proxy reported an error
    /// - [`KeyVaultError::Decode`] if the response is not valid JSON
    /// - [`KeyVaultError::Transport`] on network failure or timeout
    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        headers: Option<Headers>,
    ) -> Result<Value, KeyVaultError> {
        let payload = self.payload(method, path).body(body).headers(headers).build();
        let request = self.sign_payload(payload);
        self.send_signed(&request).await
    }

    /// Starts a payload for this client's alias.
    ///
    /// Timestamp and nonce are captured at build time unless pinned.
    pub fn payload(&self, method: HttpMethod, path: impl Into<String>) -> RequestPayloadBuilder {
        RequestPayload::builder(self.config.alias.clone(), method, path)
    }

    /// Signs `payload` with this client's secret.
    ///
    /// Signing is a pure function of the configuration and the payload: two
    /// clients with identical configurations produce identical signatures for
    /// the same payload.
    pub fn sign_payload(&self, payload: RequestPayload) -> SignedRequest {
        SignedRequest::new(&self.config, payload)
    }

    /// Builds and signs a request with a caller-supplied timestamp and nonce.
    ///
    /// Nothing is sent. The result depends only on the configuration and the
    /// arguments, so it can be compared against a proxy-side signature.
    pub fn prepare(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        headers: Option<Headers>,
        timestamp: i64,
        nonce: &str,
    ) -> SignedRequest {
        let payload = self
            .payload(method, path)
            .body(body)
            .headers(headers)
            .timestamp(timestamp)
            .nonce(nonce)
            .build();
        self.sign_payload(payload)
    }

    /// Signs `payload` and returns the URL a host fetch would request for it.
    ///
    /// # Errors
    ///
    /// Returns [`KeyVaultError::Transport`] if the request cannot be encoded.
    pub fn host_fetch_url(&self, payload: RequestPayload) -> Result<String, KeyVaultError> {
        encode_fetch_url(&self.sign_payload(payload))
    }

    /// Sends an already signed request and decodes the response.
    ///
    /// # Errors
    ///
    /// See [`SecureApi::request`].
    pub async fn send_signed(&self, request: &SignedRequest) -> Result<Value, KeyVaultError> {
        let transport = self.transport();
        debug!(
            "Dispatching {} {} for alias '{}' via {}",
            request.payload.method,
            request.payload.path,
            request.payload.alias,
            transport.mode()
        );

        let raw = transport.send(request).await?;
        decode_response(&raw)
    }

    fn transport(&self) -> &dyn Transport {
        if let Some(host) = &self.host {
            return host;
        }
        &self.direct
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]

    use super::*;
    use async_trait::async_trait;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use keyvault_common::{sign, verify};
    use serde_json::json;
    use std::sync::Mutex;
    use wiremock::matchers::{header_regex, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    const SECRET: &str = "test-secret";

    fn create_test_config(base_url: &str) -> ClientConfig {
        ClientConfig::new("openweather")
            .with_proxy_url(base_url)
            .with_hmac_secret(SECRET)
    }

    struct CannedFetch {
        urls: Mutex<Vec<String>>,
        body: String,
    }

    impl CannedFetch {
        fn new(body: &str) -> Arc<Self> {
            Arc::new(Self {
                urls: Mutex::new(Vec::new()),
                body: body.to_string(),
            })
        }
    }

    #[async_trait]
    impl HostFetch for CannedFetch {
        async fn fetch_text(&self, url: &str) -> anyhow::Result<String> {
            self.urls.lock().unwrap().push(url.to_string());
            Ok(self.body.clone())
        }
    }

    #[test]
    fn test_empty_alias_fails_at_construction() {
        let err = SecureApi::new(ClientConfig::new("")).unwrap_err();
        assert!(matches!(err, KeyVaultError::Configuration(_)));
    }

    #[test]
    fn test_invalid_proxy_url_fails_at_construction() {
        let err = SecureApi::new(ClientConfig::new("openweather").with_proxy_url("gopher://x"))
            .unwrap_err();
        assert!(matches!(err, KeyVaultError::Configuration(_)));
    }

    #[test]
    fn test_config_is_normalized() {
        let api = SecureApi::new(create_test_config("http://localhost:8080/")).unwrap();
        assert_eq!(api.config().proxy_url, "http://localhost:8080");
        assert_eq!(api.transport_mode(), TransportMode::DirectHttp);
    }

    #[test]
    fn test_debug_hides_secret() {
        let api = SecureApi::new(create_test_config("http://localhost:8080")).unwrap();
        let debug = format!("{api:?}");
        assert!(!debug.contains(SECRET));
    }

    #[test]
    fn test_identical_configs_sign_identically() {
        let first = SecureApi::new(create_test_config("http://localhost:8080")).unwrap();
        let second = SecureApi::new(create_test_config("http://localhost:8080")).unwrap();

        let pinned = |api: &SecureApi| {
            api.sign_payload(
                api.payload(HttpMethod::Get, "/data/2.5/weather?q=Tokyo")
                    .timestamp(1_700_000_000_000)
                    .nonce("abc123")
                    .build(),
            )
        };

        let a = pinned(&first);
        let b = pinned(&second);
        assert_eq!(
            a.canonical,
            "openweather:GET:/data/2.5/weather?q=Tokyo:1700000000000:abc123"
        );
        assert_eq!(a.canonical, b.canonical);
        assert_eq!(a.signature, b.signature);
    }

    #[tokio::test]
    async fn test_get_unwraps_data_envelope() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/proxy"))
            .and(header_regex("authorization", "^Signature [0-9a-f]{64}$"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"temp": 20}})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let api = SecureApi::new(create_test_config(&mock_server.uri())).unwrap();
        let data = api.get("/data/2.5/weather?q=Tokyo", None).await.unwrap();
        assert_eq!(data, json!({"temp": 20}));
    }

    #[tokio::test]
    async fn test_get_accepts_missing_envelope() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/proxy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"temp": 20})))
            .mount(&mock_server)
            .await;

        let api = SecureApi::new(create_test_config(&mock_server.uri())).unwrap();
        let data = api.get("/weather", None).await.unwrap();
        assert_eq!(data, json!({"temp": 20}));
    }

    #[tokio::test]
    async fn test_post_sends_signed_payload_matching_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/proxy"))
            .and(header_regex("authorization", "^Signature [0-9a-f]{64}$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": "ok"})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let api = SecureApi::new(create_test_config(&mock_server.uri())).unwrap();
        let headers = Headers::from([("X-Client".to_string(), "contract".to_string())]);
        let data = api
            .post("/v1/items", Some(json!({"name": "widget"})), Some(headers))
            .await
            .unwrap();
        assert_eq!(data, json!("ok"));

        let received: Vec<Request> = mock_server.received_requests().await.unwrap();
        assert_eq!(received.len(), 1);

        let payload: RequestPayload = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(payload.alias, "openweather");
        assert_eq!(payload.method, HttpMethod::Post);
        assert_eq!(payload.path, "/v1/items");
        assert_eq!(payload.body, Some(json!({"name": "widget"})));
        assert_eq!(
            payload.headers.unwrap().get("X-Client").map(String::as_str),
            Some("contract")
        );

        let authorization = received[0]
            .headers
            .get("authorization")
            .unwrap()
            .to_str()
            .unwrap();
        let signature = authorization.strip_prefix("Signature ").unwrap();
        let canonical = format!(
            "openweather:POST:/v1/items:{}:{}",
            payload.timestamp, payload.nonce
        );
        assert!(verify(SECRET, &canonical, signature));
    }

    #[tokio::test]
    async fn test_get_never_sends_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/proxy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": 1})))
            .mount(&mock_server)
            .await;

        let api = SecureApi::new(create_test_config(&mock_server.uri())).unwrap();
        api.request(HttpMethod::Get, "/weather", Some(json!({"x": 1})), None)
            .await
            .unwrap();

        let received = mock_server.received_requests().await.unwrap();
        let wire: Value = serde_json::from_slice(&received[0].body).unwrap();
        assert!(wire.get("body").is_none());
        assert!(wire.get("headers").is_none());
    }

    #[tokio::test]
    async fn test_proxy_error_carries_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/proxy"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"error": "bad alias", "status": 404})),
            )
            .mount(&mock_server)
            .await;

        let api = SecureApi::new(create_test_config(&mock_server.uri())).unwrap();
        match api.get("/weather", None).await.unwrap_err() {
            KeyVaultError::Proxy { message, status } => {
                assert_eq!(message, "bad alias");
                assert_eq!(status, 404);
            }
            other => panic!("expected proxy error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_response_is_decode_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/proxy"))
            .respond_with(ResponseTemplate::new(200).set_body_string("definitely not json"))
            .mount(&mock_server)
            .await;

        let api = SecureApi::new(create_test_config(&mock_server.uri())).unwrap();
        let err = api.get("/weather", None).await.unwrap_err();
        assert!(matches!(err, KeyVaultError::Decode(_)));
    }

    #[tokio::test]
    async fn test_each_call_uses_fresh_nonce() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/proxy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": 1})))
            .expect(2)
            .mount(&mock_server)
            .await;

        let api = SecureApi::new(create_test_config(&mock_server.uri())).unwrap();
        api.get("/weather", None).await.unwrap();
        api.get("/weather", None).await.unwrap();

        let received = mock_server.received_requests().await.unwrap();
        let first: RequestPayload = serde_json::from_slice(&received[0].body).unwrap();
        let second: RequestPayload = serde_json::from_slice(&received[1].body).unwrap();
        assert_ne!(first.nonce, second.nonce);
    }

    #[tokio::test]
    async fn test_host_fetch_bypasses_direct_http() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/proxy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": "direct"})))
            .expect(0)
            .mount(&mock_server)
            .await;

        let fetch = CannedFetch::new(r#"{"data": {"id": 7}}"#);
        let api = SecureApi::new(create_test_config(&mock_server.uri()))
            .unwrap()
            .with_host_fetch(fetch.clone());
        assert_eq!(api.transport_mode(), TransportMode::HostFetch);

        let data = api
            .post("/v1/items", Some(json!({"name": "widget"})), None)
            .await
            .unwrap();
        assert_eq!(data, json!({"id": 7}));

        let urls = fetch.urls.lock().unwrap();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].starts_with(&format!("{}/api/proxy?v=1&", mock_server.uri())));
    }

    #[tokio::test]
    async fn test_host_fetch_proxy_error() {
        let fetch = CannedFetch::new(r#"{"error": "rate limited", "status": 429}"#);
        let api = SecureApi::new(create_test_config("http://localhost:9"))
            .unwrap()
            .with_host_fetch(fetch);

        let err = api.get("/weather", None).await.unwrap_err();
        assert_eq!(err.status(), Some(429));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_prepare_is_deterministic_and_verifiable() {
        let api = SecureApi::new(create_test_config("http://localhost:8080")).unwrap();
        let headers = Headers::from([("X-Client".to_string(), "contract".to_string())]);

        let first = api.prepare(
            HttpMethod::Post,
            "/v1/items",
            Some(json!({"name": "widget"})),
            Some(headers.clone()),
            1_700_000_000_000,
            "abc123",
        );
        let second = api.prepare(
            HttpMethod::Post,
            "/v1/items",
            Some(json!({"name": "widget"})),
            Some(headers),
            1_700_000_000_000,
            "abc123",
        );

        assert_eq!(first.canonical, "openweather:POST:/v1/items:1700000000000:abc123");
        assert_eq!(first.signature, second.signature);
        assert_eq!(first.payload, second.payload);
        assert_eq!(first.payload.body, Some(json!({"name": "widget"})));
        assert!(verify(SECRET, &first.canonical, first.signature.as_str()));
    }

    #[test]
    fn test_host_fetch_url_uses_client_endpoint() {
        let api = SecureApi::new(create_test_config("http://localhost:8080/")).unwrap();
        let payload = api
            .payload(HttpMethod::Get, "/weather")
            .timestamp(1)
            .nonce("n")
            .build();

        let url = api.host_fetch_url(payload).unwrap();
        assert!(url.starts_with("http://localhost:8080/api/proxy?v=1&payload="));
        let expected = sign(SECRET, "openweather:GET:/weather:1:n");
        assert!(url.ends_with(&format!("&signature={expected}")));
    }

    #[tokio::test]
    async fn test_host_fetch_get_sends_no_body() {
        let fetch = CannedFetch::new(r#"{"data": {"temp": 20}}"#);
        let api = SecureApi::new(create_test_config("http://localhost:9"))
            .unwrap()
            .with_host_fetch(fetch.clone());

        let headers = Headers::from([("Accept".to_string(), "application/json".to_string())]);
        let data = api.get("/weather?q=Tokyo", Some(headers)).await.unwrap();
        assert_eq!(data, json!({"temp": 20}));

        let urls = fetch.urls.lock().unwrap();
        assert_eq!(urls.len(), 1);
        let url = url::Url::parse(&urls[0]).unwrap();
        let encoded = url
            .query_pairs()
            .find(|(key, _)| key == "payload")
            .map(|(_, value)| value.into_owned())
            .unwrap();
        let wire: Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(encoded).unwrap()).unwrap();

        assert_eq!(wire["method"], "GET");
        assert_eq!(wire["path"], "/weather?q=Tokyo");
        assert_eq!(wire["headers"]["Accept"], "application/json");
        assert!(wire.get("body").is_none());

        let signature = url
            .query_pairs()
            .find(|(key, _)| key == "signature")
            .map(|(_, value)| value.into_owned())
            .unwrap();
        let canonical = format!(
            "openweather:GET:/weather?q=Tokyo:{}:{}",
            wire["timestamp"], wire["nonce"].as_str().unwrap()
        );
        assert!(verify(SECRET, &canonical, &signature));
    }

    #[tokio::test]
    async fn test_concurrent_calls_share_one_client() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/proxy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": "ok"})))
            .expect(8)
            .mount(&mock_server)
            .await;

        let api = SecureApi::new(create_test_config(&mock_server.uri())).unwrap();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let api = api.clone();
                tokio::spawn(async move { api.get(&format!("/items/{i}"), None).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), json!("ok"));
        }
    }
}
