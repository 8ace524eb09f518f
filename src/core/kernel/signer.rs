use crate::core::errors::{BackpackError, Result};
use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::{Signer as _, SigningKey, KEYPAIR_LENGTH, SECRET_KEY_LENGTH};
use serde_json::{Map, Number, Value};
use std::borrow::Cow;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use zeroize::Zeroizing;

/// Instruction every order in a batch is signed under
pub const BATCH_ORDER_INSTRUCTION: &str = "orderExecute";

/// Instruction used to authenticate private stream subscriptions
pub const STREAM_INSTRUCTION: &str = "subscribe";

/// Parameters of a signed request, keyed by field name
pub type SignParams = Map<String, Value>;

/// Ed25519 signer for Backpack requests
///
/// Holds the API key (the base64 public key the exchange issued) and the
/// private signing key. The signer is immutable; rotating credentials means
/// building a new one.
pub struct Ed25519Signer {
    public_key: String,
    signing_key: SigningKey,
}

impl fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl Ed25519Signer {
    /// Create a signer from base64-encoded credentials
    ///
    /// # Arguments
    /// * `public_key` - API key sent in `X-API-Key`
    /// * `secret_key` - Base64 Ed25519 secret, either the 32-byte seed or the
    ///   64-byte key pair (seed followed by public key)
    pub fn new(public_key: impl Into<String>, secret_key: &str) -> Result<Self> {
        let key_bytes = Zeroizing::new(
            general_purpose::STANDARD
                .decode(secret_key.trim())
                .map_err(|e| BackpackError::KeyFormat(format!("Invalid base64 secret key: {}", e)))?,
        );

        let signing_key = match key_bytes.len() {
            SECRET_KEY_LENGTH => {
                let mut seed = Zeroizing::new([0u8; SECRET_KEY_LENGTH]);
                seed.copy_from_slice(&key_bytes);
                SigningKey::from_bytes(&seed)
            }
            KEYPAIR_LENGTH => {
                let mut keypair = Zeroizing::new([0u8; KEYPAIR_LENGTH]);
                keypair.copy_from_slice(&key_bytes);
                SigningKey::from_keypair_bytes(&keypair).map_err(|e| {
                    BackpackError::KeyFormat(format!("Inconsistent key pair: {}", e))
                })?
            }
            other => {
                return Err(BackpackError::KeyFormat(format!(
                    "Invalid secret key length: expected {} or {} bytes, got {}",
                    SECRET_KEY_LENGTH, KEYPAIR_LENGTH, other
                )));
            }
        };

        Ok(Self {
            public_key: public_key.into(),
            signing_key,
        })
    }

    /// API key sent alongside every signature
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Base64 encoding of the public half of the signing key
    ///
    /// For exchange-issued credentials this equals `public_key()`.
    pub fn verifying_key_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign `message` and return the base64 signature
    pub fn sign(&self, message: &str) -> String {
        let signature = self.signing_key.sign(message.as_bytes());
        general_purpose::STANDARD.encode(signature.to_bytes())
    }

    /// Signature and timestamp authenticating a private stream subscription
    pub fn generate_stream_signature(&self, window: u64) -> (String, u64) {
        let timestamp = current_timestamp_ms();
        let message = build_signing_string(STREAM_INSTRUCTION, &SignParams::new(), timestamp, window);
        (self.sign(&message), timestamp)
    }
}

/// Build the canonical string the exchange verifies signatures against
///
/// `instruction=<name>[&k=v...]&timestamp=<ms>&window=<ms>` with keys in
/// ascending order.
pub fn build_signing_string(
    instruction: &str,
    params: &SignParams,
    timestamp: u64,
    window: u64,
) -> String {
    let mut out = String::with_capacity(64 + params.len() * 24);
    push_instruction(&mut out, instruction, params);
    push_suffix(&mut out, timestamp, window);
    out
}

/// Build the canonical string for a batch of orders
///
/// Each order contributes its own `instruction=orderExecute` block; the
/// timestamp and window are appended once for the whole batch.
pub fn build_batch_signing_string(orders: &[SignParams], timestamp: u64, window: u64) -> String {
    let mut out = String::with_capacity(64 + orders.len() * 96);
    for (i, order) in orders.iter().enumerate() {
        if i > 0 {
            out.push('&');
        }
        push_instruction(&mut out, BATCH_ORDER_INSTRUCTION, order);
    }
    push_suffix(&mut out, timestamp, window);
    out
}

/// Current wall-clock time in milliseconds since the UNIX epoch
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

fn push_instruction(out: &mut String, instruction: &str, params: &SignParams) {
    out.push_str("instruction=");
    out.push_str(instruction);

    let mut keys: Vec<&String> = params.keys().collect();
    keys.sort_unstable();

    for key in keys {
        out.push('&');
        out.push_str(key);
        out.push('=');
        out.push_str(&render_value(&params[key.as_str()]));
    }
}

fn push_suffix(out: &mut String, timestamp: u64, window: u64) {
    out.push_str("&timestamp=");
    out.push_str(&timestamp.to_string());
    out.push_str("&window=");
    out.push_str(&window.to_string());
}

/// Integers as-is; floats in plain decimal notation, shortest round-trip
/// digits, no exponent and no trailing `.0`
fn render_number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    n.as_f64().map_or_else(|| n.to_string(), |f| f.to_string())
}

fn render_value(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Bool(true) => Cow::Borrowed("true"),
        Value::Bool(false) => Cow::Borrowed("false"),
        Value::Null => Cow::Borrowed("null"),
        Value::Number(n) => Cow::Owned(render_number(n)),
        other => Cow::Owned(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ZERO_SEED: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

    fn params(value: Value) -> SignParams {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_signing_string_sorts_keys() {
        let p = params(json!({"symbol": "SOL_USDC", "side": "Bid"}));
        assert_eq!(
            build_signing_string("orderExecute", &p, 1_700_000_000_000, 5000),
            "instruction=orderExecute&side=Bid&symbol=SOL_USDC&timestamp=1700000000000&window=5000"
        );
    }

    #[test]
    fn test_signing_string_without_params() {
        assert_eq!(
            build_signing_string("balanceQuery", &SignParams::new(), 1, 2),
            "instruction=balanceQuery&timestamp=1&window=2"
        );
    }

    #[test]
    fn test_value_rendering() {
        let p = params(json!({
            "postOnly": true,
            "reduceOnly": false,
            "clientId": 42,
            "quantity": "1.5",
            "slippage": 0.25,
        }));
        assert_eq!(
            build_signing_string("orderExecute", &p, 10, 20),
            "instruction=orderExecute&clientId=42&postOnly=true&quantity=1.5&reduceOnly=false&slippage=0.25&timestamp=10&window=20"
        );
    }

    #[test]
    fn test_batch_signing_string() {
        let orders = vec![
            params(json!({"symbol": "SOL_USDC", "side": "Bid"})),
            params(json!({"symbol": "BTC_USDC", "side": "Ask", "postOnly": true})),
        ];
        assert_eq!(
            build_batch_signing_string(&orders, 100, 5000),
            "instruction=orderExecute&side=Bid&symbol=SOL_USDC&instruction=orderExecute&postOnly=true&side=Ask&symbol=BTC_USDC&timestamp=100&window=5000"
        );
    }

    #[test]
    fn test_floats_render_without_exponent() {
        let p = params(json!({"price": 100.0, "qty": 0.0000001, "big": 1e21, "neg": -2.5}));
        assert_eq!(
            build_signing_string("orderExecute", &p, 1, 2),
            "instruction=orderExecute&big=1000000000000000000000&neg=-2.5&price=100&qty=0.0000001&timestamp=1&window=2"
        );
    }

    #[test]
    fn test_integers_keep_their_digits() {
        let p = params(json!({"clientId": u64::MAX, "offset": -7}));
        assert_eq!(
            build_signing_string("x", &p, 1, 2),
            format!("instruction=x&clientId={}&offset=-7&timestamp=1&window=2", u64::MAX)
        );
    }

    #[test]
    fn test_empty_batch() {
        assert_eq!(build_batch_signing_string(&[], 1, 2), "&timestamp=1&window=2");
    }

    #[test]
    fn test_rejects_bad_lengths() {
        let short = general_purpose::STANDARD.encode([1u8; 16]);
        let err = Ed25519Signer::new("key", &short).unwrap_err();
        assert!(matches!(err, BackpackError::KeyFormat(msg) if msg.contains("got 16")));

        let err = Ed25519Signer::new("key", "not base64!!").unwrap_err();
        assert!(matches!(err, BackpackError::KeyFormat(_)));
    }

    #[test]
    fn test_sign_is_deterministic() {
        let signer = Ed25519Signer::new("key", ZERO_SEED).unwrap();
        let a = signer.sign("instruction=balanceQuery&timestamp=1&window=5000");
        let b = signer.sign("instruction=balanceQuery&timestamp=1&window=5000");
        assert_eq!(a, b);
        assert_eq!(general_purpose::STANDARD.decode(&a).unwrap().len(), 64);
    }

    #[test]
    fn test_debug_hides_key_material() {
        let signer = Ed25519Signer::new("my-api-key", ZERO_SEED).unwrap();
        let rendered = format!("{:?}", signer);
        assert!(rendered.contains("my-api-key"));
        assert!(!rendered.contains("signing_key"));
    }
}
