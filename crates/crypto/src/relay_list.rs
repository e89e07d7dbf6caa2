// Path: crates/crypto/src/relay_list.rs
use ed25519_dalek::{Signature, VerifyingKey};

use crate::error::CryptoError;

/// Verifies the Ed25519 signature carried by a kind-11011 signed relay-list
/// event: `dht_sig` over the bencoded `content`, under `dht_pubkey`. This is
/// deliberately a distinct scheme from event-signing Schnorr — spec §4.6
/// names Ed25519 specifically for this one kind.
pub fn verify_relay_list_signature(
    dht_pubkey: &[u8],
    dht_sig: &[u8],
    bencoded_content: &[u8],
) -> Result<(), CryptoError> {
    let key_bytes: [u8; 32] = dht_pubkey
        .try_into()
        .map_err(|_| CryptoError::InvalidPublicKey("dht_pubkey must be 32 bytes".into()))?;
    let verifying_key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
    let sig_bytes: [u8; 64] = dht_sig
        .try_into()
        .map_err(|_| CryptoError::InvalidSignatureEncoding("dht_sig must be 64 bytes".into()))?;
    let signature = Signature::from_bytes(&sig_bytes);
    verifying_key
        .verify_strict(bencoded_content, &signature)
        .map_err(|_| CryptoError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    #[test]
    fn valid_ed25519_signature_verifies() {
        let signing_key = SigningKey::from_bytes(&[11u8; 32]);
        let content = b"d4:name5:relaye";
        let signature = signing_key.sign(content);
        let verifying_key = signing_key.verifying_key();
        assert!(verify_relay_list_signature(
            verifying_key.as_bytes(),
            &signature.to_bytes(),
            content
        )
        .is_ok());
    }

    #[test]
    fn tampered_content_fails() {
        let signing_key = SigningKey::from_bytes(&[11u8; 32]);
        let content = b"d4:name5:relaye";
        let signature = signing_key.sign(content);
        let verifying_key = signing_key.verifying_key();
        assert!(verify_relay_list_signature(
            verifying_key.as_bytes(),
            &signature.to_bytes(),
            b"different content"
        )
        .is_err());
    }
}
