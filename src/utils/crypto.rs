// Random tokens, PKCE and ID token inspection for the sign-in handshake

use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Length in bytes of a PKCE code verifier before encoding (RFC 7636 allows 32..=96)
pub const PKCE_VERIFIER_BYTES: usize = 32;

/// Generate a cryptographically secure CSRF token
///
/// 24 bytes (192 bits) of entropy, base64url encoded to 32 characters.
#[must_use]
pub fn generate_csrf_token() -> String {
    generate_nonce(24)
}

/// Generate `length` random bytes, base64url encoded without padding
#[must_use]
pub fn generate_nonce(length: usize) -> String {
    let mut nonce = vec![0u8; length];
    rand::rng().fill_bytes(&mut nonce);
    general_purpose::URL_SAFE_NO_PAD.encode(nonce)
}

/// PKCE verifier and its S256 challenge
#[derive(Clone)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    #[must_use]
    pub fn generate() -> Self {
        let verifier = generate_nonce(PKCE_VERIFIER_BYTES);
        let challenge = pkce_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

/// `BASE64URL(SHA256(verifier))`
#[must_use]
pub fn pkce_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    general_purpose::URL_SAFE_NO_PAD.encode(digest)
}

/// Helper function to decode JWT token payload without verification
///
/// The auth backend verifies the signature during the credential exchange;
/// this is only used to read profile claims and check the nonce.
///
/// # Errors
///
/// Returns an error if:
/// - The JWT format is invalid (not 3 parts separated by dots)
/// - Base64 decoding fails
/// - JSON parsing fails
pub fn decode_jwt_payload(token: &str) -> Result<serde_json::Value, String> {
    let parts: Vec<&str> = token.split('.').collect();
    let [_, payload_b64, _] = parts.as_slice() else {
        return Err("Invalid JWT format".to_string());
    };

    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .or_else(|_| general_purpose::STANDARD.decode(payload_b64))
        .map_err(|_| "Base64 decode failed".to_string())?;

    serde_json::from_slice(&payload_bytes).map_err(|_| "JSON parse failed".to_string())
}

/// Profile claims carried by a provider ID token
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdTokenClaims {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub nonce: Option<String>,
    pub exp: Option<i64>,
}

impl IdTokenClaims {
    /// Decode the unverified claims of an ID token
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be decoded or lacks a `sub` claim
    pub fn from_id_token(token: &str) -> Result<Self, String> {
        let payload = decode_jwt_payload(token)?;
        serde_json::from_value(payload).map_err(|e| format!("Invalid ID token claims: {e}"))
    }
}
