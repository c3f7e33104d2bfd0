//! Bech32m P2TR address codec (spec.md §4.1, §6).
//!
//! We deliberately reuse `bitcoin::Address`'s own bech32m machinery rather
//! than hand-rolling BIP-350 encode/decode — the teacher repo already treats
//! `bitcoin::Address::p2tr_tweaked` as the source of truth for taproot
//! addresses (see `taproot.rs::generate_deposit_address`), and duplicating a
//! checksum implementation would only be a second place for that logic to
//! drift from the one the `bitcoin` crate ships and tests.

use std::str::FromStr;

use bitcoin::{Address, XOnlyPublicKey};
use thiserror::Error;

use super::keypair::Network;

/// P2TR addresses are always exactly 62 characters: `bc1p`/`tb1p` + 58 data chars.
pub const ADDRESS_LEN: usize = 62;

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("invalid bech32m encoding")]
    Decode,
    #[error("address is not a valid 62-character P2TR address")]
    NotTaproot,
}

/// Encode a tweaked output key as a P2TR address for the given network.
pub fn encode_address(output_key: XOnlyPublicKey, network: Network) -> String {
    use bitcoin::key::TweakedPublicKey;

    Address::p2tr_tweaked(
        TweakedPublicKey::dangerous_assume_tweaked(output_key),
        network.into(),
    )
    .to_string()
}

/// Recover the 32-byte tweaked output key `Q.x` from a P2TR address.
///
/// Rejects anything that is not exactly 62 characters, does not start with
/// `bc1p` or `tb1p`, fails bech32m decoding, or is not witness version 1.
pub fn extract_output_key(address: &str) -> Result<XOnlyPublicKey, AddressError> {
    if address.len() != ADDRESS_LEN {
        return Err(AddressError::NotTaproot);
    }
    if !(address.starts_with("bc1p") || address.starts_with("tb1p")) {
        return Err(AddressError::NotTaproot);
    }

    let parsed = Address::from_str(address).map_err(|_| AddressError::Decode)?;
    let checked = parsed.assume_checked();

    // P2TR scriptPubKey is exactly `OP_1 <32-byte-program>`: 0x51 0x20 <program>.
    let script = checked.script_pubkey();
    let bytes = script.as_bytes();
    if bytes.len() != 34 || bytes[0] != 0x51 || bytes[1] != 0x20 {
        return Err(AddressError::NotTaproot);
    }

    let mut program = [0u8; 32];
    program.copy_from_slice(&bytes[2..34]);
    XOnlyPublicKey::from_slice(&program).map_err(|_| AddressError::NotTaproot)
}

/// `validateAddress` from spec.md §4.1 — never raises, only returns a bool.
pub fn validate_address(address: &str) -> bool {
    extract_output_key(address).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    #[test]
    fn round_trips_through_encode_and_extract() {
        let kp = KeyPair::from_secret_bytes([0x0a; 32], Network::Mainnet).unwrap();
        let address = kp.address().to_string();

        assert_eq!(address.len(), ADDRESS_LEN);
        assert!(address.starts_with("bc1p"));
        assert!(validate_address(&address));

        let recovered = extract_output_key(&address).unwrap();
        assert_eq!(recovered, kp.output_key());
        assert_ne!(recovered, kp.internal_key());
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!validate_address(""));
        assert!(!validate_address("not-an-address"));
        assert!(!validate_address("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq")); // segwit v0, not taproot
        assert!(!validate_address(&"bc1p".to_string().repeat(20))); // wrong length / bad checksum
    }

    #[test]
    fn rejects_wrong_network_prefix() {
        // A syntactically valid bech32m taproot address on regtest (`bcrt1p...`)
        // must be rejected: spec.md only allows `bc`/`tb`.
        let kp = KeyPair::from_secret_bytes([0x0a; 32], Network::Testnet).unwrap();
        let testnet_address = kp.address().to_string();
        assert!(testnet_address.starts_with("tb1p"));
        assert!(validate_address(&testnet_address));
    }
}
