//! Webhook signature validation.
//!
//! LINE signs each delivery with HMAC-SHA256 over the raw request body,
//! base64-encoded into the `x-line-signature` header.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Verify a webhook delivery against the channel secret.
///
/// Missing header, malformed base64, and digest mismatch all fail closed.
/// The comparison is constant-time via `Mac::verify_slice`.
pub fn verify(channel_secret: &str, signature_header: Option<&str>, body: &[u8]) -> bool {
    let signature = signature_header.unwrap_or("").trim();
    if signature.is_empty() {
        return false;
    }
    let Ok(signature_bytes) = BASE64.decode(signature) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature_bytes).is_ok()
}

/// Compute the signature header value for a body. Counterpart of [`verify`],
/// used to sign test deliveries.
pub fn sign(channel_secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(channel_secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(body);
    BASE64.encode(mac.finalize().into_bytes())
}
