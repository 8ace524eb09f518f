//! Shared helpers for the integration tests
#![allow(dead_code)]

use backpack_sdk::core::kernel::Ed25519Signer;
use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use std::sync::Arc;

/// Base64 of 32 zero bytes
pub const ZERO_SEED: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

pub const TEST_API_KEY: &str = "test-api-key";

pub fn test_signer() -> Arc<Ed25519Signer> {
    Arc::new(Ed25519Signer::new(TEST_API_KEY, ZERO_SEED).unwrap())
}

/// Check a base64 signature against the signer's public key
pub fn verify_signature(signer: &Ed25519Signer, message: &str, signature: &str) -> bool {
    let Ok(key_bytes) = general_purpose::STANDARD.decode(signer.verifying_key_base64()) else {
        return false;
    };
    let Ok(key_bytes) = <[u8; 32]>::try_from(key_bytes.as_slice()) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let Ok(sig_bytes) = general_purpose::STANDARD.decode(signature) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&sig_bytes) else {
        return false;
    };
    key.verify(message.as_bytes(), &signature).is_ok()
}

/// Route tracing output through the test harness
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
