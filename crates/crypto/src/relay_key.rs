// Path: crates/crypto/src/relay_key.rs
use secp256k1::{Keypair, Message, Secp256k1, SecretKey};

use hearth_types::event::Event;

use crate::error::CryptoError;
use crate::event::compute_event_id;

/// The relay's own signing key, used to produce kind-888 subscription
/// events (C5) and as the uploader/verifier identity in DAG operations
/// (C9). Thin wrapper in the style of `ioi-crypto`'s `Ed25519KeyPair` — one
/// struct per concern, small trait-free surface since this crate has no
/// cross-backend abstraction to support (Schnorr-over-secp256k1 is the only
/// scheme the relay itself signs with).
pub struct RelayKeypair {
    secp: Secp256k1<secp256k1::All>,
    keypair: Keypair,
    pub public_key: [u8; 32],
}

impl RelayKeypair {
    pub fn from_hex_secret(hex_secret: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_secret)
            .map_err(|e| CryptoError::KeyGeneration(format!("bad relay.private_key hex: {e}")))?;
        let secret = SecretKey::from_slice(&bytes)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        Self::from_secret(secret)
    }

    /// Generates a fresh keypair. Callers (`hearth-node`'s bootstrap) are
    /// responsible for persisting `secret_hex()` back into configuration so
    /// the relay's identity is stable across restarts.
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret, _public) = secp.generate_keypair(&mut rand::thread_rng());
        Self::from_secret(secret).unwrap_or_else(|_| {
            // generate_keypair always produces a valid SecretKey; this path
            // is unreachable but kept explicit rather than panicking.
            Self::from_secret(SecretKey::from_slice(&[1u8; 32]).expect("fallback key is valid"))
                .expect("fallback key constructs")
        })
    }

    fn from_secret(secret: SecretKey) -> Result<Self, CryptoError> {
        let secp = Secp256k1::new();
        let keypair = Keypair::from_secret_key(&secp, &secret);
        let (xonly, _parity) = keypair.x_only_public_key();
        Ok(RelayKeypair {
            secp,
            keypair,
            public_key: xonly.serialize(),
        })
    }

    pub fn secret_hex(&self) -> String {
        hex::encode(self.keypair.secret_bytes())
    }

    /// Fills `event.pubkey`, recomputes `event.id`, and signs it, producing
    /// a fully valid relay-authored event. Signing is CPU-bound and never
    /// suspends (spec §5).
    pub fn sign(&self, mut event: Event) -> Event {
        event.pubkey = self.public_key;
        event.id = compute_event_id(&event);
        let message = Message::from_digest(event.id);
        let sig = self.secp.sign_schnorr(&message, &self.keypair);
        event.sig = sig.as_ref().try_into().unwrap_or([0u8; 64]);
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_types::event::Tag;

    #[test]
    fn generated_key_produces_verifiable_events() {
        let key = RelayKeypair::generate();
        let event = key.sign(Event {
            id: [0u8; 32],
            pubkey: [0u8; 32],
            created_at: 100,
            kind: 888,
            tags: vec![Tag::new(["p", "abc"])],
            content: "{}".into(),
            sig: [0u8; 64],
        });
        assert_eq!(event.pubkey, key.public_key);
        assert!(crate::event::verify_event_signature(&event).is_ok());
    }

    #[test]
    fn secret_hex_roundtrips() {
        let key = RelayKeypair::generate();
        let restored = RelayKeypair::from_hex_secret(&key.secret_hex()).unwrap();
        assert_eq!(restored.public_key, key.public_key);
    }
}
