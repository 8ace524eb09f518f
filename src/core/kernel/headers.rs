use crate::core::kernel::signer::{
    build_batch_signing_string, build_signing_string, current_timestamp_ms, Ed25519Signer,
    SignParams,
};
use std::fmt;

pub const HEADER_API_KEY: &str = "X-API-Key";
pub const HEADER_SIGNATURE: &str = "X-Signature";
pub const HEADER_TIMESTAMP: &str = "X-Timestamp";
pub const HEADER_WINDOW: &str = "X-Window";
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Authentication headers for one signed request
#[derive(Clone, PartialEq, Eq)]
pub struct HeaderSet {
    pub api_key: String,
    pub signature: String,
    pub timestamp: String,
    pub window: String,
}

impl fmt::Debug for HeaderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderSet")
            .field("api_key", &self.api_key)
            .field("signature", &"[REDACTED]")
            .field("timestamp", &self.timestamp)
            .field("window", &self.window)
            .finish()
    }
}

impl HeaderSet {
    /// Header name/value pairs, `Content-Type` included
    pub fn to_headers(&self) -> [(&'static str, &str); 5] {
        [
            (HEADER_API_KEY, self.api_key.as_str()),
            (HEADER_SIGNATURE, self.signature.as_str()),
            (HEADER_TIMESTAMP, self.timestamp.as_str()),
            (HEADER_WINDOW, self.window.as_str()),
            ("Content-Type", JSON_CONTENT_TYPE),
        ]
    }
}

impl Ed25519Signer {
    /// Sign `instruction` with `params` at the current time
    pub fn generate_headers(&self, instruction: &str, params: &SignParams, window: u64) -> HeaderSet {
        let timestamp = current_timestamp_ms();
        let message = build_signing_string(instruction, params, timestamp, window);
        self.header_set(&message, timestamp, window)
    }

    /// Sign a batch of orders at the current time
    pub fn generate_batch_headers(&self, orders: &[SignParams], window: u64) -> HeaderSet {
        let timestamp = current_timestamp_ms();
        let message = build_batch_signing_string(orders, timestamp, window);
        self.header_set(&message, timestamp, window)
    }

    fn header_set(&self, message: &str, timestamp: u64, window: u64) -> HeaderSet {
        HeaderSet {
            api_key: self.public_key().to_string(),
            signature: self.sign(message),
            timestamp: timestamp.to_string(),
            window: window.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ZERO_SEED: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

    #[test]
    fn test_headers_sign_the_canonical_string() {
        let signer = Ed25519Signer::new("api-key", ZERO_SEED).unwrap();
        let params = json!({"symbol": "SOL_USDC"}).as_object().cloned().unwrap();

        let headers = signer.generate_headers("orderQuery", &params, 6000);
        assert_eq!(headers.api_key, "api-key");
        assert_eq!(headers.window, "6000");

        let timestamp: u64 = headers.timestamp.parse().unwrap();
        let expected = signer.sign(&build_signing_string("orderQuery", &params, timestamp, 6000));
        assert_eq!(headers.signature, expected);
    }

    #[test]
    fn test_header_pairs() {
        let headers = HeaderSet {
            api_key: "k".into(),
            signature: "s".into(),
            timestamp: "1".into(),
            window: "5000".into(),
        };
        let pairs = headers.to_headers();
        assert!(pairs.contains(&("X-API-Key", "k")));
        assert!(pairs.contains(&("X-Signature", "s")));
        assert!(pairs.contains(&("X-Timestamp", "1")));
        assert!(pairs.contains(&("X-Window", "5000")));
        assert!(pairs.contains(&("Content-Type", "application/json; charset=utf-8")));
        assert!(!format!("{:?}", headers).contains("\"s\""));
    }
}
