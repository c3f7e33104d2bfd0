//! Identity derivation and BIP-340/341 crypto primitives for SNAP.
//!
//! A SNAP peer is identified by a Bitcoin Pay-to-Taproot (P2TR) address:
//! a bech32m encoding of the BIP-341 key-path tweak of a secp256k1 key pair.
//! This module derives that address from a private key and signs/verifies
//! the BIP-340 Schnorr signatures carried by every on-wire message.

pub mod address;
pub mod keypair;
pub mod schnorr;

pub use address::{extract_output_key, validate_address, AddressError};
pub use keypair::{KeyPair, Network};
pub use schnorr::{sign_digest, verify_digest};
