// Path: crates/crypto/src/event.rs
use secp256k1::schnorr::Signature as SchnorrSignature;
use secp256k1::{Message, Secp256k1, XOnlyPublicKey};
use sha2::{Digest, Sha256};

use hearth_types::event::Event;

use crate::error::CryptoError;

/// `id = SHA-256(canonical-serialize(pubkey, created_at, kind, tags, content))`.
/// Hashing itself is the only thing this crate owns; the byte-exact
/// serialization lives in `hearth_types::event::Event`.
pub fn compute_event_id(event: &Event) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(event.canonical_payload());
    hasher.finalize().into()
}

/// Verifies that `event.sig` is a valid BIP-340 Schnorr signature of
/// `event.id` under `event.pubkey`. Does **not** recompute `id` — callers
/// that need the full invariant (`event.id == compute_event_id(event)`)
/// should check that separately; the dispatcher always does both.
pub fn verify_event_signature(event: &Event) -> Result<(), CryptoError> {
    verify_schnorr_signature(&event.pubkey, &event.id, &event.sig)
}

/// Verifies an arbitrary 32-byte-digest Schnorr signature under `pubkey`.
/// `verify_event_signature` is the event-shaped special case of this;
/// `hearth-dag`'s root-CID upload verification is the other caller, since a
/// DAG root signature is over a content hash, not an Event.
pub fn verify_schnorr_signature(
    pubkey: &[u8; 32],
    digest: &[u8; 32],
    sig: &[u8; 64],
) -> Result<(), CryptoError> {
    let secp = Secp256k1::verification_only();
    let pubkey = XOnlyPublicKey::from_slice(pubkey)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
    let signature = SchnorrSignature::from_slice(sig)
        .map_err(|e| CryptoError::InvalidSignatureEncoding(e.to_string()))?;
    let message = Message::from_digest(*digest);
    secp.verify_schnorr(&signature, &message, &pubkey)
        .map_err(|_| CryptoError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_types::event::Tag;
    use secp256k1::{Keypair, SecretKey};

    fn signed_event(secret: &SecretKey, content: &str) -> Event {
        let secp = Secp256k1::new();
        let keypair = Keypair::from_secret_key(&secp, secret);
        let (xonly, _parity) = keypair.x_only_public_key();

        let mut event = Event {
            id: [0u8; 32],
            pubkey: xonly.serialize(),
            created_at: 1_700_000_000,
            kind: 1,
            tags: vec![Tag::new(["e", "abc"])],
            content: content.to_string(),
            sig: [0u8; 64],
        };
        event.id = compute_event_id(&event);
        let message = Message::from_digest(event.id);
        let sig = secp.sign_schnorr(&message, &keypair);
        event.sig = sig.as_ref().try_into().unwrap_or([0u8; 64]);
        event
    }

    #[test]
    fn valid_signature_verifies() {
        let secret = SecretKey::from_slice(&[7u8; 32]).unwrap();
        let event = signed_event(&secret, "hello");
        assert!(verify_event_signature(&event).is_ok());
    }

    #[test]
    fn tampered_content_fails_verification() {
        let secret = SecretKey::from_slice(&[7u8; 32]).unwrap();
        let mut event = signed_event(&secret, "hello");
        event.content = "tampered".to_string();
        assert!(verify_event_signature(&event).is_err());
    }

    #[test]
    fn id_matches_canonical_hash() {
        let secret = SecretKey::from_slice(&[7u8; 32]).unwrap();
        let event = signed_event(&secret, "hello");
        assert_eq!(event.id, compute_event_id(&event));
    }
}
