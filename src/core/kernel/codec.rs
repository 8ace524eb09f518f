use crate::core::errors::Result;
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

/// Credentials attached to a private stream subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamAuth {
    pub api_key: String,
    pub signature: String,
    pub timestamp: u64,
    pub window: u64,
}

/// A decoded data frame addressed to one stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamFrame {
    pub stream: String,
    pub data: Value,
}

/// Codec trait for the exchange's WebSocket control and data frames
///
/// The session only moves frames; the codec owns their wire format.
pub trait WsCodec: Send + Sync + 'static {
    /// Encode a subscription request, signed when `auth` is present
    fn encode_subscription(&self, streams: &[String], auth: Option<&StreamAuth>) -> Result<Message>;

    /// Encode an unsubscription request
    fn encode_unsubscription(&self, streams: &[String]) -> Result<Message>;

    /// Decode an inbound text frame
    ///
    /// Returns `None` for traffic that is not addressed to a stream
    /// (acks, errors, anything unparsable).
    fn decode_frame(&self, text: &str) -> Option<StreamFrame>;
}
