//! Canonical signing input construction and sign/verify (spec.md §4.3).

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::canonical::{canonicalize, CanonicalizeError};
use crate::crypto::{address::extract_output_key, schnorr, KeyPair};

use super::types::SnapMessage;

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("payload is not canonicalizable: {0}")]
    Canonicalize(#[from] CanonicalizeError),
}

/// Build the seven-field, NUL-joined signing input and hash it with SHA-256.
///
/// `id ‖ 0x00 ‖ from ‖ 0x00 ‖ (to or "") ‖ 0x00 ‖ type ‖ 0x00 ‖ method ‖ 0x00
/// ‖ canonicalPayload ‖ 0x00 ‖ timestamp-as-decimal-ascii`
///
/// An absent `to` contributes the empty string, not a missing field — the
/// 7-field / 6-separator shape never changes.
pub fn signing_digest(message: &SnapMessage) -> Result<[u8; 32], SigningError> {
    let canonical_payload = canonicalize(&message.payload)?;

    let mut input = Vec::with_capacity(
        message.id.len()
            + message.from.len()
            + message.to.as_deref().unwrap_or("").len()
            + message.r#type.as_str().len()
            + message.method.len()
            + canonical_payload.len()
            + 32,
    );
    input.extend_from_slice(message.id.as_bytes());
    input.push(0x00);
    input.extend_from_slice(message.from.as_bytes());
    input.push(0x00);
    input.extend_from_slice(message.to.as_deref().unwrap_or("").as_bytes());
    input.push(0x00);
    input.extend_from_slice(message.r#type.as_str().as_bytes());
    input.push(0x00);
    input.extend_from_slice(message.method.as_bytes());
    input.push(0x00);
    input.extend_from_slice(&canonical_payload);
    input.push(0x00);
    input.extend_from_slice(message.timestamp.to_string().as_bytes());

    let mut hasher = Sha256::new();
    hasher.update(&input);
    Ok(hasher.finalize().into())
}

/// Sign a message with the peer's tweaked private key, using all-zero
/// auxiliary randomness by default for deterministic signatures.
pub fn sign(message: &SnapMessage, keypair: &KeyPair) -> Result<String, SigningError> {
    sign_with_aux_rand(message, keypair, &schnorr::ZERO_AUX_RAND)
}

pub fn sign_with_aux_rand(
    message: &SnapMessage,
    keypair: &KeyPair,
    aux_rand: &[u8; 32],
) -> Result<String, SigningError> {
    let digest = signing_digest(message)?;
    let sig = schnorr::sign_digest(keypair, &digest, aux_rand);
    Ok(hex::encode(sig))
}

/// Verify `sig` against `message`, extracting the tweaked output key from
/// `message.from`. Any decoding or cryptographic failure is `false`, never
/// an error — this function must not raise (spec.md §4.3).
pub fn verify(message: &SnapMessage, sig: &str) -> bool {
    let Ok(output_key) = extract_output_key(&message.from) else {
        return false;
    };
    let Ok(digest) = signing_digest(message) else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(sig) else {
        return false;
    };
    if sig_bytes.len() != 64 {
        return false;
    }
    schnorr::verify_digest(&output_key, &digest, &sig_bytes)
}

/// Convenience: verify the `sig` field already carried on the message.
pub fn verify_self(message: &SnapMessage) -> bool {
    match &message.sig {
        Some(sig) => verify(message, sig),
        None => false,
    }
}
