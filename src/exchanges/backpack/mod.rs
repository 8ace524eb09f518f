pub mod client;
pub mod codec;
pub mod handlers;
pub mod rest;
pub mod streams;
pub mod types;

use crate::core::config::BackpackConfig;
use crate::core::errors::Result;
use crate::core::kernel::WsSession;

// Re-export main types for easier importing
pub use client::BackpackClient;
pub use codec::BackpackCodec;
pub use handlers::StreamHandler;
pub use rest::{BackpackRestClient, OrderRef};
pub use streams::{DepthInterval, KlineInterval};
pub use types::*;

/// WebSocket session speaking the Backpack wire format
pub type BackpackWebSocket = WsSession<BackpackCodec>;

/// Factory function to create a Backpack client from the environment
///
/// Reads `BACKPACK_API_KEY` / `BACKPACK_SECRET_KEY` and the optional
/// overrides; see `BackpackConfig::from_env`.
pub fn create_backpack_client_from_env() -> Result<BackpackClient> {
    let config = BackpackConfig::from_env("BACKPACK")?;
    BackpackClient::new(config)
}
