pub mod core;
pub mod exchanges;

pub use core::{
    config::BackpackConfig,
    errors::{ApiErrorCode, BackpackError, Result},
    kernel::{ConnectionState, Ed25519Signer, OverflowPolicy, WsConfig},
};
pub use exchanges::backpack::{BackpackClient, BackpackWebSocket, StreamHandler};
