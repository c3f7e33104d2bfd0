//! snap-core: decentralized agent-to-agent messaging over Bitcoin P2TR
//! identities.
//!
//! A SNAP peer is identified by a Pay-to-Taproot address derived from a
//! secp256k1 key pair (`crypto`). Messages are canonicalized (`canonical`)
//! and signed with BIP-340 Schnorr signatures (`message::signing`), carried
//! over pluggable `transport`s, validated and dispatched by an `agent::Agent`
//! through an ordered middleware chain, with durable `storage` for replay
//! protection and task records. `task` and `card` define the two structured
//! documents the protocol exchanges beyond raw messages: task status and
//! agent discovery cards.

pub mod agent;
pub mod canonical;
pub mod card;
pub mod common;
pub mod config;
pub mod crypto;
pub mod logging;
pub mod message;
pub mod storage;
pub mod task;
pub mod transport;

pub use common::error::{Result, SnapError};
pub use config::{ConfigError, SnapConfig};
pub use crypto::{KeyPair, Network};
