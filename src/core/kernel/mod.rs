/// Kernel - signing and transport layer for the Backpack APIs
///
/// This module holds everything that moves bytes or signs them. It knows the
/// Backpack signing scheme but nothing about individual endpoints or stream
/// payloads; those live in `exchanges::backpack`.
///
/// # Architecture
///
/// ## Authentication
/// - `Ed25519Signer`: key handling, canonical signing strings, signatures
/// - `HeaderSet`: the `X-API-Key` / `X-Signature` / `X-Timestamp` / `X-Window` set
///
/// ## Transport Layer
/// - `RestClient`: HTTP client interface, public and signed calls
/// - `WsSession`: reconnecting WebSocket pub/sub session
///
/// ## Message Handling
/// - `WsCodec`: wire format of control and stream frames
/// - `OverflowPolicy`: what a slow callback's mailbox drops when full
///
/// # Usage
///
/// ## Signed REST call
/// ```rust,no_run
/// use backpack_sdk::core::kernel::*;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let signer = Arc::new(Ed25519Signer::new("api_key", "c2VjcmV0LXNlZWQtMzItYnl0ZXMtbG9uZy4uLi4uLi4=")?);
/// let rest = RestClientBuilder::new(RestClientConfig::new("https://api.backpack.exchange"))
///     .with_signer(signer)
///     .build()?;
///
/// let body = json!({"symbol": "SOL_USDC", "side": "Bid", "orderType": "Limit",
///                   "price": "20", "quantity": "1"});
/// let order = rest.post_authenticated("api/v1/order", &body, "orderExecute").await?;
/// println!("{order}");
/// # Ok(())
/// # }
/// ```
///
/// ## WebSocket session
/// ```rust,no_run
/// use backpack_sdk::core::kernel::*;
/// use backpack_sdk::exchanges::backpack::BackpackCodec;
///
/// # async fn websocket_example() -> Result<(), Box<dyn std::error::Error>> {
/// let ws = WsSession::builder("wss://ws.backpack.exchange", BackpackCodec::new()).build();
/// ws.connect().await?;
/// ws.subscribe(&["trade.SOL_USDC"], |data| println!("{data}"), false).await?;
/// # Ok(())
/// # }
/// ```
pub mod codec;
pub mod dispatch;
pub mod headers;
pub mod rest;
pub mod signer;
pub mod ws;

// Re-export key types for convenience
pub use codec::{StreamAuth, StreamFrame, WsCodec};
pub use dispatch::{OverflowPolicy, StreamCallback};
pub use headers::HeaderSet;
pub use rest::{ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
pub use signer::{build_batch_signing_string, build_signing_string, Ed25519Signer, SignParams};
pub use ws::{ConnectionState, WsConfig, WsSession, WsSessionBuilder};
