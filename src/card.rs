//! Agent discovery documents (spec.md §3 AgentCard, §6).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::canonical::{canonicalize, CanonicalizeError};
use crate::crypto::{schnorr, KeyPair};

#[derive(Debug, Error)]
pub enum CardError {
    #[error("{0}")]
    Canonicalize(#[from] CanonicalizeError),
    #[error("defaultInputModes and defaultOutputModes must be non-empty")]
    EmptyDefaultModes,
}

/// One capability an agent advertises.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub input_modes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub output_modes: Option<Vec<String>>,
}

/// A reachable transport endpoint for this agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointProtocol {
    Http,
    Wss,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub protocol: EndpointProtocol,
    pub url: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub push_notifications: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rate_limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
}

/// Discovery document advertising identity, skills, and reachability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub version: String,
    /// P2TR address identifying this agent.
    pub identity: String,
    pub skills: Vec<Skill>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub endpoints: Option<Vec<Endpoint>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub nostr_relays: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub capabilities: Option<Capabilities>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub provider: Option<Provider>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub trust: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub doc_url: Option<String>,
    pub default_input_modes: Vec<String>,
    pub default_output_modes: Vec<String>,
}

impl AgentCard {
    /// Validates the one invariant the type itself can't express:
    /// `defaultInputModes`/`defaultOutputModes` are required and non-empty.
    pub fn validate(&self) -> Result<(), CardError> {
        if self.default_input_modes.is_empty() || self.default_output_modes.is_empty() {
            return Err(CardError::EmptyDefaultModes);
        }
        Ok(())
    }

    /// `SHA-256(canonicalize(card) ‖ "|" ‖ timestamp)` per spec.md §6.
    fn signing_digest(&self, timestamp: u64) -> Result<[u8; 32], CardError> {
        let value = serde_json::to_value(self).expect("AgentCard always serializes to a Value");
        let mut input = canonicalize(&value)?;
        input.push(b'|');
        input.extend_from_slice(timestamp.to_string().as_bytes());

        let mut hasher = Sha256::new();
        hasher.update(&input);
        Ok(hasher.finalize().into())
    }

    /// Sign this card for unauthenticated serving, producing the wrapper
    /// from spec.md §6.
    pub fn sign(&self, keypair: &KeyPair, timestamp: u64) -> Result<SignedAgentCard, CardError> {
        self.validate()?;
        let digest = self.signing_digest(timestamp)?;
        let sig = schnorr::sign_digest(keypair, &digest, &schnorr::ZERO_AUX_RAND);
        Ok(SignedAgentCard {
            card: self.clone(),
            sig: hex::encode(sig),
            public_key: keypair.internal_key_hex(),
            timestamp,
        })
    }
}

/// The signed wrapper `{ card, sig, publicKey, timestamp }` from spec.md §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedAgentCard {
    pub card: AgentCard,
    pub sig: String,
    #[serde(rename = "publicKey")]
    pub public_key: String,
    pub timestamp: u64,
}

impl SignedAgentCard {
    /// Verify `sig` against the card's own `identity` field output key.
    pub fn verify(&self) -> bool {
        let Ok(output_key) = crate::crypto::extract_output_key(&self.card.identity) else {
            return false;
        };
        let Ok(digest) = self.card.signing_digest(self.timestamp) else {
            return false;
        };
        let Ok(sig_bytes) = hex::decode(&self.sig) else {
            return false;
        };
        if sig_bytes.len() != 64 {
            return false;
        }
        schnorr::verify_digest(&output_key, &digest, &sig_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Network;

    fn sample_card(identity: String) -> AgentCard {
        AgentCard {
            name: "Echo Agent".into(),
            description: "Echoes whatever it receives".into(),
            version: "0.1".into(),
            identity,
            skills: vec![Skill {
                id: "echo".into(),
                name: "Echo".into(),
                description: "Echoes the payload back".into(),
                tags: vec!["utility".into()],
                input_modes: None,
                output_modes: None,
            }],
            endpoints: Some(vec![Endpoint {
                protocol: EndpointProtocol::Http,
                url: "https://example.invalid/snap".into(),
            }]),
            nostr_relays: None,
            capabilities: Some(Capabilities { streaming: true, ..Default::default() }),
            provider: None,
            trust: None,
            icon_url: None,
            doc_url: None,
            default_input_modes: vec!["application/json".into()],
            default_output_modes: vec!["application/json".into()],
        }
    }

    #[test]
    fn rejects_empty_default_modes() {
        let mut card = sample_card("bc1pfrom".into());
        card.default_input_modes.clear();
        assert!(matches!(card.validate(), Err(CardError::EmptyDefaultModes)));
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let keypair = KeyPair::from_secret_bytes([0x55; 32], Network::Mainnet).unwrap();
        let card = sample_card(keypair.address().to_string());
        let signed = card.sign(&keypair, 1_738_627_200).unwrap();
        assert!(signed.verify());
    }

    #[test]
    fn tampering_the_card_after_signing_breaks_verification() {
        let keypair = KeyPair::from_secret_bytes([0x56; 32], Network::Mainnet).unwrap();
        let card = sample_card(keypair.address().to_string());
        let mut signed = card.sign(&keypair, 1_738_627_200).unwrap();
        signed.card.name = "Renamed Agent".into();
        assert!(!signed.verify());
    }
}
