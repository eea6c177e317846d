use std::fmt;
use std::time::Duration;

use log::warn;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Environment variable holding the proxy base URL.
pub const PROXY_URL_ENV: &str = "GLVAULT_PROXY_URL";

/// Environment variable holding the shared HMAC secret.
pub const HMAC_SECRET_ENV: &str = "GLVAULT_HMAC_SECRET";

/// Proxy used when neither an override nor the environment provides one.
pub const DEFAULT_PROXY_URL: &str = "https://gl-keyvault.vercel.app";

/// Direct-HTTP request timeout (10 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Path of the proxy endpoint relative to the base URL.
const PROXY_ENDPOINT_PATH: &str = "/api/proxy";

/// Reasons a [`ClientConfig`] is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The credential alias is empty or whitespace.
    #[error("alias must not be empty")]
    EmptyAlias,

    /// The proxy base URL failed validation.
    #[error("invalid proxy URL '{url}': {reason}")]
    InvalidProxyUrl {
        /// The rejected URL, as supplied.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A zero timeout would fail every direct-HTTP call.
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
}

/// Configuration for a single gl-keyvault client.
///
/// Holds the credential alias the proxy resolves, the proxy base URL and the
/// shared secret used to sign requests. The secret is stored as a
/// [`SecretString`] and is redacted from `Debug` output.
///
/// Environment defaults are never read implicitly. The composition root
/// calls [`ClientConfig::from_env`] once and passes the result on.
///
/// # Examples
///
/// ```
/// use keyvault_common::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::new("openweather")
///     .with_proxy_url("https://proxy.example.com/")
///     .with_hmac_secret("shared-secret")
///     .with_timeout(Duration::from_secs(5))
///     .validated()?;
///
/// assert_eq!(config.proxy_url, "https://proxy.example.com");
/// assert_eq!(config.proxy_endpoint(), "https://proxy.example.com/api/proxy");
/// # Ok::<(), keyvault_common::ConfigError>(())
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Registered credential alias (e.g. "openweather", "newsapi").
    pub alias: String,
    /// Base URL of the gl-keyvault proxy.
    pub proxy_url: String,
    /// Shared secret for request signing.
    ///
    /// May be empty only in test configurations.
    pub hmac_secret: SecretString,
    /// Timeout for direct-HTTP calls. Host fetches use the host's own timeout.
    pub timeout: Duration,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("alias", &self.alias)
            .field("proxy_url", &self.proxy_url)
            .field("hmac_secret", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Creates a configuration for `alias` with the built-in defaults.
    ///
    /// The proxy URL defaults to [`DEFAULT_PROXY_URL`] and the secret is empty.
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            hmac_secret: SecretString::new(String::new().into()),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Creates a configuration for `alias` using `GLVAULT_PROXY_URL` and
    /// `GLVAULT_HMAC_SECRET` from the process environment.
    ///
    /// Unset variables fall back to the built-in defaults.
    pub fn from_env(alias: impl Into<String>) -> Self {
        Self::from_lookup(alias, |key| std::env::var(key).ok())
    }

    /// Creates a configuration for `alias`, resolving defaults through `lookup`.
    ///
    /// `lookup` receives [`PROXY_URL_ENV`] and [`HMAC_SECRET_ENV`].
    pub fn from_lookup<F>(alias: impl Into<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(alias);
        if let Some(url) = lookup(PROXY_URL_ENV) {
            config.proxy_url = url;
        }
        if let Some(secret) = lookup(HMAC_SECRET_ENV) {
            config.hmac_secret = SecretString::new(secret.into());
        }
        config
    }

    /// Sets the proxy base URL.
    #[must_use]
    pub fn with_proxy_url(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = proxy_url.into();
        self
    }

    /// Sets the shared signing secret.
    #[must_use]
    pub fn with_hmac_secret(mut self, hmac_secret: impl Into<String>) -> Self {
        self.hmac_secret = SecretString::new(hmac_secret.into().into());
        self
    }

    /// Sets the direct-HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full URL of the proxy endpoint (`{proxy_url}/api/proxy`).
    pub fn proxy_endpoint(&self) -> String {
        format!(
            "{}{PROXY_ENDPOINT_PATH}",
            self.proxy_url.trim_end_matches('/')
        )
    }

    /// Returns `true` when no signing secret is configured.
    pub fn has_empty_secret(&self) -> bool {
        self.hmac_secret.expose_secret().is_empty()
    }

    /// Checks the alias, proxy URL and timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the alias is empty or whitespace
    /// - the proxy URL does not parse, is not http(s), or has no host
    /// - the timeout is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.alias.trim().is_empty() {
            return Err(ConfigError::EmptyAlias);
        }

        let invalid = |reason: String| ConfigError::InvalidProxyUrl {
            url: self.proxy_url.clone(),
            reason,
        };

        let parsed = url::Url::parse(self.proxy_url.trim_end_matches('/'))
            .map_err(|e| invalid(e.to_string()))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
        }

        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }

        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(invalid("base URL must not carry a query or fragment".to_string()));
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(())
    }

    /// Validates the configuration and strips trailing slashes from the proxy URL.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found by [`ClientConfig::validate`].
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        self.validate()?;
        self.proxy_url = self.proxy_url.trim_end_matches('/').to_string();

        if self.has_empty_secret() {
            warn!(
                "gl-keyvault alias '{}' is configured with an empty signing secret",
                self.alias
            );
        }

        Ok(self)
    }
}
