//! BIP-340 Schnorr sign/verify over the tweaked key-path key (spec.md §4.3).

use bitcoin::secp256k1::{schnorr::Signature, Message, Secp256k1, XOnlyPublicKey};

use super::keypair::KeyPair;

/// Default auxiliary randomness: 32 zero bytes, for deterministic signatures
/// (spec.md §4.3, §6, and testable property 9).
pub const ZERO_AUX_RAND: [u8; 32] = [0u8; 32];

/// Sign a 32-byte digest with the peer's tweaked private key.
///
/// `aux_rand` defaults to [`ZERO_AUX_RAND`] for deterministic test vectors;
/// callers that want non-deterministic signatures (still verifiable) may
/// pass random bytes instead.
pub fn sign_digest(keypair: &KeyPair, digest: &[u8; 32], aux_rand: &[u8; 32]) -> [u8; 64] {
    let secp = Secp256k1::new();
    let tweaked = keypair.tweaked_keypair(&secp);
    let msg = Message::from_digest(*digest);
    let sig = secp.sign_schnorr_with_aux_rand(&msg, &tweaked, aux_rand);
    sig.serialize()
}

/// Verify a 64-byte Schnorr signature against a digest and an x-only public key.
///
/// Never panics: any malformed signature or key is treated as a failed
/// verification, matching spec.md §4.3 ("Any decoding or cryptographic
/// failure is returned as `false`, not raised").
pub fn verify_digest(output_key: &XOnlyPublicKey, digest: &[u8; 32], sig: &[u8]) -> bool {
    let secp = Secp256k1::verification_only();
    let Ok(sig) = Signature::from_slice(sig) else {
        return false;
    };
    let msg = Message::from_digest(*digest);
    secp.verify_schnorr(&sig, &msg, output_key).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{KeyPair, Network};

    #[test]
    fn sign_then_verify_round_trips() {
        let kp = KeyPair::from_secret_bytes([0x11; 32], Network::Mainnet).unwrap();
        let digest = [0x22u8; 32];
        let sig = sign_digest(&kp, &digest, &ZERO_AUX_RAND);
        assert!(verify_digest(&kp.output_key(), &digest, &sig));
    }

    #[test]
    fn default_aux_rand_is_deterministic() {
        let kp = KeyPair::from_secret_bytes([0x33; 32], Network::Mainnet).unwrap();
        let digest = [0x44u8; 32];
        let sig_a = sign_digest(&kp, &digest, &ZERO_AUX_RAND);
        let sig_b = sign_digest(&kp, &digest, &ZERO_AUX_RAND);
        assert_eq!(sig_a, sig_b);
    }

    #[test]
    fn nonzero_aux_rand_still_verifies() {
        let kp = KeyPair::from_secret_bytes([0x55; 32], Network::Mainnet).unwrap();
        let digest = [0x66u8; 32];
        let aux = [0x77u8; 32];
        let sig = sign_digest(&kp, &digest, &aux);
        assert!(verify_digest(&kp.output_key(), &digest, &sig));
    }

    #[test]
    fn flipping_a_digest_bit_breaks_verification() {
        let kp = KeyPair::from_secret_bytes([0x88; 32], Network::Mainnet).unwrap();
        let digest = [0x99u8; 32];
        let sig = sign_digest(&kp, &digest, &ZERO_AUX_RAND);

        let mut tampered = digest;
        tampered[0] ^= 0x01;
        assert!(!verify_digest(&kp.output_key(), &tampered, &sig));
    }

    #[test]
    fn malformed_signature_fails_closed() {
        let kp = KeyPair::from_secret_bytes([0xaa; 32], Network::Mainnet).unwrap();
        assert!(!verify_digest(&kp.output_key(), &[0u8; 32], &[0u8; 10]));
    }
}
