use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.backpack.exchange";
pub const DEFAULT_WS_URL: &str = "wss://ws.backpack.exchange";
/// Default signature validity window in milliseconds
pub const DEFAULT_WINDOW_MS: u64 = 5000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct BackpackConfig {
    pub api_key: Secret<String>,
    pub secret_key: Secret<String>,
    pub base_url: Option<String>,
    pub ws_url: Option<String>,
    pub window: u64,
    pub timeout: Duration,
    pub auto_reconnect: bool,
}

// Custom Serialize implementation - never expose secrets in serialization
impl Serialize for BackpackConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("BackpackConfig", 7)?;
        state.serialize_field("api_key", "[REDACTED]")?;
        state.serialize_field("secret_key", "[REDACTED]")?;
        state.serialize_field("base_url", &self.base_url)?;
        state.serialize_field("ws_url", &self.ws_url)?;
        state.serialize_field("window", &self.window)?;
        state.serialize_field("timeout_ms", &(self.timeout.as_millis() as u64))?;
        state.serialize_field("auto_reconnect", &self.auto_reconnect)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for BackpackConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct BackpackConfigHelper {
            api_key: String,
            secret_key: String,
            base_url: Option<String>,
            ws_url: Option<String>,
            window: Option<u64>,
            timeout_ms: Option<u64>,
            auto_reconnect: Option<bool>,
        }

        let helper = BackpackConfigHelper::deserialize(deserializer)?;
        Ok(Self {
            api_key: Secret::new(helper.api_key),
            secret_key: Secret::new(helper.secret_key),
            base_url: helper.base_url,
            ws_url: helper.ws_url,
            window: helper.window.unwrap_or(DEFAULT_WINDOW_MS),
            timeout: helper
                .timeout_ms
                .map_or(DEFAULT_TIMEOUT, Duration::from_millis),
            auto_reconnect: helper.auto_reconnect.unwrap_or(true),
        })
    }
}

impl BackpackConfig {
    /// Create a new configuration with API credentials
    ///
    /// `api_key` is the base64 public key shown by the exchange,
    /// `secret_key` the base64 Ed25519 secret (32-byte seed or 64-byte key pair).
    #[must_use]
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            base_url: None,
            ws_url: None,
            window: DEFAULT_WINDOW_MS,
            timeout: DEFAULT_TIMEOUT,
            auto_reconnect: true,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{PREFIX}_API_KEY` (e.g., `BACKPACK_API_KEY`)
    /// - `{PREFIX}_SECRET_KEY`
    /// - `{PREFIX}_BASE_URL` (optional)
    /// - `{PREFIX}_WS_URL` (optional)
    /// - `{PREFIX}_WINDOW` (optional, milliseconds)
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        let api_key_var = format!("{}_API_KEY", prefix);
        let secret_key_var = format!("{}_SECRET_KEY", prefix);
        let window_var = format!("{}_WINDOW", prefix);

        let api_key = env::var(&api_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(api_key_var))?;

        let secret_key = env::var(&secret_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(secret_key_var))?;

        let window = match env::var(&window_var) {
            Ok(raw) => raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidConfiguration(format!("{} must be an integer: {}", window_var, e))
            })?,
            Err(_) => DEFAULT_WINDOW_MS,
        };

        let mut config = Self::new(api_key, secret_key).window(window);
        config.base_url = env::var(format!("{}_BASE_URL", prefix)).ok();
        config.ws_url = env::var(format!("{}_WS_URL", prefix)).ok();
        Ok(config)
    }

    /// Create configuration from .env file and environment variables
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(prefix, ".env")
    }

    /// Create configuration from a specific .env file path
    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(prefix: &str, env_file_path: &str) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(()) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                // .env file doesn't exist, fall back to the process environment
            }
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(prefix)
    }

    /// Configuration for public endpoints and streams only
    #[must_use]
    pub fn read_only() -> Self {
        Self::new(String::new(), String::new())
    }

    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.api_key.expose_secret().is_empty() && !self.secret_key.expose_secret().is_empty()
    }

    #[must_use]
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    #[must_use]
    pub fn ws_url(mut self, ws_url: String) -> Self {
        self.ws_url = Some(ws_url);
        self
    }

    /// Set the signature validity window in milliseconds
    #[must_use]
    pub const fn window(mut self, window: u64) -> Self {
        self.window = window;
        self
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    pub fn rest_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn stream_url(&self) -> &str {
        self.ws_url.as_deref().unwrap_or(DEFAULT_WS_URL)
    }

    /// Get API key (use carefully - exposes secret)
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Get secret key (use carefully - exposes secret)
    pub fn secret_key(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_redacts_secrets() {
        let config = BackpackConfig::new("public".to_string(), "very-secret".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("[REDACTED]"));
        assert!(!json.contains("very-secret"));
        assert!(!json.contains("public"));
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let config: BackpackConfig =
            serde_json::from_str(r#"{"api_key":"a","secret_key":"b"}"#).unwrap();
        assert_eq!(config.window, DEFAULT_WINDOW_MS);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.auto_reconnect);
        assert_eq!(config.rest_url(), DEFAULT_BASE_URL);
        assert_eq!(config.stream_url(), DEFAULT_WS_URL);
    }

    #[test]
    fn test_read_only_has_no_credentials() {
        assert!(!BackpackConfig::read_only().has_credentials());
        assert!(BackpackConfig::new("a".into(), "b".into()).has_credentials());
    }

    #[test]
    fn test_from_env_missing_key() {
        let err = BackpackConfig::from_env("BACKPACK_SDK_TEST_MISSING").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvironmentVariable(var) if var == "BACKPACK_SDK_TEST_MISSING_API_KEY"));
    }

    #[test]
    fn test_from_env_reads_overrides() {
        env::set_var("BACKPACK_SDK_TEST_ENV_API_KEY", "pk");
        env::set_var("BACKPACK_SDK_TEST_ENV_SECRET_KEY", "sk");
        env::set_var("BACKPACK_SDK_TEST_ENV_WINDOW", "10000");
        env::set_var("BACKPACK_SDK_TEST_ENV_WS_URL", "ws://127.0.0.1:1");

        let config = BackpackConfig::from_env("backpack_sdk_test_env").unwrap();
        assert_eq!(config.api_key(), "pk");
        assert_eq!(config.secret_key(), "sk");
        assert_eq!(config.window, 10_000);
        assert_eq!(config.stream_url(), "ws://127.0.0.1:1");
        assert_eq!(config.rest_url(), DEFAULT_BASE_URL);
    }
}
