use crate::core::config::BackpackConfig;
use crate::core::errors::Result;
use crate::core::kernel::{
    Ed25519Signer, ReqwestRest, RestClientBuilder, RestClientConfig, WsConfig, WsSession,
};
use crate::exchanges::backpack::codec::BackpackCodec;
use crate::exchanges::backpack::rest::BackpackRestClient;
use crate::exchanges::backpack::BackpackWebSocket;
use std::sync::Arc;
use tracing::debug;

/// Entry point for the Backpack APIs
///
/// Owns the REST transport and the current signer. WebSocket sessions are
/// created on demand and capture the signer that is current at that time.
#[derive(Debug)]
pub struct BackpackClient {
    config: BackpackConfig,
    rest: BackpackRestClient<ReqwestRest>,
}

impl BackpackClient {
    pub fn new(config: BackpackConfig) -> Result<Self> {
        let rest_config = RestClientConfig::new(config.rest_url())
            .with_timeout(config.timeout)
            .with_window(config.window);

        let mut rest_builder = RestClientBuilder::new(rest_config);
        if config.has_credentials() {
            let signer = Ed25519Signer::new(config.api_key(), config.secret_key())?;
            rest_builder = rest_builder.with_signer(Arc::new(signer));
        }

        Ok(Self {
            rest: BackpackRestClient::new(rest_builder.build()?),
            config,
        })
    }

    /// Client without credentials; only public calls and streams work
    pub fn public() -> Result<Self> {
        Self::new(BackpackConfig::read_only())
    }

    pub fn config(&self) -> &BackpackConfig {
        &self.config
    }

    pub fn rest(&self) -> &BackpackRestClient<ReqwestRest> {
        &self.rest
    }

    pub fn signer(&self) -> Option<Arc<Ed25519Signer>> {
        self.rest.inner().signer()
    }

    /// Replace the credentials used for signed requests
    ///
    /// The new signer is validated before anything changes. Sessions created
    /// earlier keep their signer.
    pub fn set_credentials(&self, api_key: &str, secret_key: &str) -> Result<()> {
        let signer = Ed25519Signer::new(api_key, secret_key)?;
        self.rest.inner().set_signer(Some(Arc::new(signer)));
        debug!("Credentials replaced");
        Ok(())
    }

    /// Drop the credentials; signed calls fail with `AuthRequired` afterwards
    pub fn clear_credentials(&self) {
        self.rest.inner().set_signer(None);
    }

    /// Build an unconnected WebSocket session with default settings
    pub fn websocket(&self) -> BackpackWebSocket {
        let config = WsConfig::default()
            .with_window(self.config.window)
            .with_auto_reconnect(self.config.auto_reconnect);
        self.websocket_with(config)
    }

    /// Build an unconnected WebSocket session with `config`
    pub fn websocket_with(&self, config: WsConfig) -> BackpackWebSocket {
        let mut builder = WsSession::builder(self.config.stream_url(), BackpackCodec::new()).config(config);
        if let Some(signer) = self.signer() {
            builder = builder.signer(signer);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kernel::ConnectionState;

    const ZERO_SEED: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

    #[test]
    fn test_public_client_has_no_signer() {
        let client = BackpackClient::public().unwrap();
        assert!(client.signer().is_none());
        assert_eq!(client.config().rest_url(), "https://api.backpack.exchange");
    }

    #[test]
    fn test_set_credentials_validates_first() {
        let client = BackpackClient::public().unwrap();
        assert!(client.set_credentials("key", "bad key").is_err());
        assert!(client.signer().is_none());

        client.set_credentials("key", ZERO_SEED).unwrap();
        assert_eq!(client.signer().unwrap().public_key(), "key");

        client.clear_credentials();
        assert!(client.signer().is_none());
    }

    #[test]
    fn test_websocket_uses_config() {
        let config = BackpackConfig::new("key".to_string(), ZERO_SEED.to_string())
            .ws_url("ws://127.0.0.1:9".to_string());
        let client = BackpackClient::new(config).unwrap();
        let ws = client.websocket();
        assert_eq!(ws.url(), "ws://127.0.0.1:9");
        assert_eq!(ws.state(), ConnectionState::Disconnected);
    }
}
