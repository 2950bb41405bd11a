//! PKCE (RFC 7636) primitives shared by both PKCE relationships the
//! gateway maintains: client↔gateway and gateway↔IdP. See spec.md §9 —
//! these two layers must never be confused with each other.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Generate a cryptographically random PKCE verifier: 32 random bytes,
/// base64url-encoded (43 characters, no padding).
#[must_use]
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compute the S256 challenge for a verifier: `BASE64URL(SHA256(verifier))`.
#[must_use]
pub fn challenge_s256(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Generate an opaque correlation value with at least 122 bits of entropy
/// (used for `proxy_state` and `proxy_code`): 16 random bytes, base64url.
#[must_use]
pub fn generate_opaque_id() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Verify a client-presented `code_verifier` against the `code_challenge`
/// and `code_challenge_method` stored at `/authorize` time. Uses
/// constant-time comparison so the response timing never leaks how many
/// leading bytes of the challenge an attacker guessed correctly.
#[must_use]
pub fn verify(verifier: &str, challenge: &str, method: &str) -> bool {
    match method {
        "S256" => challenge_s256(verifier)
            .as_bytes()
            .ct_eq(challenge.as_bytes())
            .into(),
        "plain" => verifier.as_bytes().ct_eq(challenge.as_bytes()).into(),
        _ => false,
    }
}
