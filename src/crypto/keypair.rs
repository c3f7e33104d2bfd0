//! Key derivation: private key → internal key → BIP-341 tweaked output key.
//!
//! Mirrors the shape of the teacher's `taproot::PoolKeys` / `btc_client::SingleKeySigner`
//! (a `Keypair` plus a `Secp256k1` context), generalized from "the pool's
//! signing key" to "one SNAP peer's identity key", and with the private
//! scalar held in a zeroizing container per spec.md §9 ("Key material").

use bitcoin::key::{Keypair, Secp256k1, TapTweak};
use bitcoin::secp256k1::{self, SecretKey};
use bitcoin::XOnlyPublicKey;
use thiserror::Error;
use zeroize::Zeroizing;

use super::address::{encode_address, AddressError};

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes")]
    InvalidSecret,
    #[error("address error: {0}")]
    Address(#[from] AddressError),
}

/// Networks a SNAP address can be minted for. `Devnet`/testing code maps onto
/// `Testnet`, matching the way the teacher's `common::config::Network` folds
/// devnet into the testnet Bitcoin network for RPC/address purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl From<Network> for bitcoin::Network {
    fn from(n: Network) -> Self {
        match n {
            Network::Mainnet => bitcoin::Network::Bitcoin,
            Network::Testnet => bitcoin::Network::Testnet,
        }
    }
}

/// A SNAP peer's identity key pair: the raw secret, the untweaked internal
/// key `P` (also the peer's Nostr identity per the glossary), and the
/// BIP-341 key-path tweaked output key `Q` that the P2TR address encodes.
pub struct KeyPair {
    secret: Zeroizing<[u8; 32]>,
    internal_key: XOnlyPublicKey,
    output_key: XOnlyPublicKey,
    address: String,
    network: Network,
}

impl KeyPair {
    /// Derive a key pair from a 32-byte secret scalar.
    pub fn from_secret_bytes(secret: [u8; 32], network: Network) -> Result<Self, KeyError> {
        let secp = Secp256k1::new();
        let secret_key = SecretKey::from_slice(&secret).map_err(|_| KeyError::InvalidSecret)?;
        let keypair = Keypair::from_secret_key(&secp, &secret_key);
        let (internal_key, _parity) = keypair.x_only_public_key();

        let tweaked = keypair.tap_tweak(&secp, None);
        let (output_key, _parity) = tweaked.to_inner().x_only_public_key();

        let address = encode_address(output_key, network);

        Ok(Self {
            secret: Zeroizing::new(secret),
            internal_key,
            output_key,
            address,
            network,
        })
    }

    /// Generate a fresh, random key pair.
    pub fn generate(network: Network) -> Self {
        use rand::RngCore;
        let mut secret = [0u8; 32];
        // Resample on the cryptographically negligible chance of an
        // out-of-range or zero scalar so callers never see a Result here.
        loop {
            rand::thread_rng().fill_bytes(&mut secret);
            if let Ok(kp) = Self::from_secret_bytes(secret, network) {
                return kp;
            }
        }
    }

    pub fn internal_key(&self) -> XOnlyPublicKey {
        self.internal_key
    }

    pub fn output_key(&self) -> XOnlyPublicKey {
        self.output_key
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn internal_key_hex(&self) -> String {
        hex::encode(self.internal_key.serialize())
    }

    /// Reconstruct the tweaked (key-path) keypair used for signing.
    ///
    /// Re-derived from the zeroized secret on every call rather than cached,
    /// so the only long-lived copy of the secret is the zeroizing buffer.
    pub(crate) fn tweaked_keypair(&self, secp: &Secp256k1<secp256k1::All>) -> Keypair {
        let secret_key =
            SecretKey::from_slice(&self.secret[..]).expect("secret was validated at construction");
        let keypair = Keypair::from_secret_key(secp, &secret_key);
        keypair.tap_tweak(secp, None).to_inner()
    }
}
