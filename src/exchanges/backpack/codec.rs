use crate::core::errors::Result;
use crate::core::kernel::codec::{StreamAuth, StreamFrame, WsCodec};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

/// Backpack WebSocket codec implementation
///
/// Control frames are `{"method", "params"[, "signature"]}` objects; data
/// frames arrive as `{"stream": <name>, "data": <payload>}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackpackCodec;

impl BackpackCodec {
    /// Create a new Backpack codec
    pub fn new() -> Self {
        Self
    }

    /// Build a subscription message in Backpack format
    fn build_subscription_message(&self, streams: &[String], auth: Option<&StreamAuth>) -> Value {
        let mut message = json!({
            "method": "SUBSCRIBE",
            "params": streams,
        });

        if let Some(auth) = auth {
            message["signature"] = json!([
                auth.api_key,
                auth.signature,
                auth.timestamp.to_string(),
                auth.window.to_string(),
            ]);
        }

        message
    }

    /// Build an unsubscription message in Backpack format
    fn build_unsubscription_message(&self, streams: &[String]) -> Value {
        json!({
            "method": "UNSUBSCRIBE",
            "params": streams,
        })
    }
}

impl WsCodec for BackpackCodec {
    fn encode_subscription(&self, streams: &[String], auth: Option<&StreamAuth>) -> Result<Message> {
        let msg = self.build_subscription_message(streams, auth);
        Ok(Message::Text(msg.to_string()))
    }

    fn encode_unsubscription(&self, streams: &[String]) -> Result<Message> {
        let msg = self.build_unsubscription_message(streams);
        Ok(Message::Text(msg.to_string()))
    }

    fn decode_frame(&self, text: &str) -> Option<StreamFrame> {
        let mut value: Value = serde_json::from_str(text).ok()?;
        let stream = value.get("stream")?.as_str()?.to_string();
        let data = value.get_mut("data").map(Value::take).unwrap_or(Value::Null);
        Some(StreamFrame { stream, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(message: Message) -> Value {
        match message {
            Message::Text(text) => serde_json::from_str(&text).unwrap(),
            _ => panic!("Expected text message"),
        }
    }

    #[test]
    fn test_encode_subscribe() {
        let codec = BackpackCodec::new();
        let streams = vec!["trade.SOL_USDC".to_string(), "depth.SOL_USDC".to_string()];

        let value = text(codec.encode_subscription(&streams, None).unwrap());
        assert_eq!(value["method"], "SUBSCRIBE");
        assert_eq!(value["params"], json!(["trade.SOL_USDC", "depth.SOL_USDC"]));
        assert!(value.get("signature").is_none());
    }

    #[test]
    fn test_encode_signed_subscribe() {
        let codec = BackpackCodec::new();
        let auth = StreamAuth {
            api_key: "key".to_string(),
            signature: "sig".to_string(),
            timestamp: 1_700_000_000_000,
            window: 5000,
        };

        let value = text(
            codec
                .encode_subscription(&["account.orderUpdate".to_string()], Some(&auth))
                .unwrap(),
        );
        assert_eq!(value["params"], json!(["account.orderUpdate"]));
        assert_eq!(value["signature"], json!(["key", "sig", "1700000000000", "5000"]));
    }

    #[test]
    fn test_encode_unsubscribe() {
        let codec = BackpackCodec::new();
        let value = text(
            codec
                .encode_unsubscription(&["ticker.BTC_USDC".to_string()])
                .unwrap(),
        );
        assert_eq!(value, json!({"method": "UNSUBSCRIBE", "params": ["ticker.BTC_USDC"]}));
    }

    #[test]
    fn test_decode_stream_frame() {
        let codec = BackpackCodec::new();
        let frame = codec
            .decode_frame(r#"{"stream":"trade.SOL_USDC","data":{"p":"20.1","q":"3"}}"#)
            .unwrap();
        assert_eq!(frame.stream, "trade.SOL_USDC");
        assert_eq!(frame.data["p"], "20.1");
    }

    #[test]
    fn test_decode_ignores_non_stream_traffic() {
        let codec = BackpackCodec::new();
        assert!(codec.decode_frame(r#"{"result":null,"id":1}"#).is_none());
        assert!(codec.decode_frame(r#"{"stream":42,"data":{}}"#).is_none());
        assert!(codec.decode_frame("not json").is_none());
    }

    #[test]
    fn test_decode_missing_data_is_null() {
        let codec = BackpackCodec::new();
        let frame = codec.decode_frame(r#"{"stream":"ticker.SOL_USDC"}"#).unwrap();
        assert_eq!(frame.data, Value::Null);
    }
}
