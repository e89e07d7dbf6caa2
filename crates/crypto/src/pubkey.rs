// Path: crates/crypto/src/pubkey.rs
use crate::error::CryptoError;

const NPUB_HRP: &str = "npub";

/// Normalizes a public key to canonical lowercase 32-byte hex, per spec
/// §4.1. Accepts either plain hex or the bech32-style `npub1...` encoding.
pub fn canonicalize(pubkey: &str) -> Result<[u8; 32], CryptoError> {
    let trimmed = pubkey.trim();
    if trimmed.starts_with(NPUB_HRP) {
        canonicalize_bech32(trimmed)
    } else {
        canonicalize_hex(trimmed)
    }
}

fn canonicalize_hex(pubkey: &str) -> Result<[u8; 32], CryptoError> {
    let bytes = hex::decode(pubkey)
        .map_err(|e| CryptoError::InvalidPublicKey(format!("not valid hex: {e}")))?;
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| CryptoError::InvalidPublicKey(format!("expected 32 bytes, got {}", v.len())))
}

fn canonicalize_bech32(pubkey: &str) -> Result<[u8; 32], CryptoError> {
    let (hrp, data) = bech32::decode(pubkey)
        .map_err(|e| CryptoError::InvalidPublicKey(format!("invalid bech32: {e}")))?;
    if hrp.as_str() != NPUB_HRP {
        return Err(CryptoError::InvalidPublicKey(format!(
            "unexpected bech32 prefix: {}",
            hrp.as_str()
        )));
    }
    data.try_into()
        .map_err(|v: Vec<u8>| CryptoError::InvalidPublicKey(format!("expected 32 bytes, got {}", v.len())))
}

/// Encodes a 32-byte public key as the bech32 `npub1...` form, the inverse
/// of `canonicalize`'s bech32 branch. Used by admin tooling and the
/// subscription manager when presenting a human-facing identifier.
pub fn to_bech32(pubkey: &[u8; 32]) -> Result<String, CryptoError> {
    let hrp = bech32::Hrp::parse(NPUB_HRP)
        .map_err(|e| CryptoError::InvalidPublicKey(format!("bad hrp: {e}")))?;
    bech32::encode::<bech32::Bech32>(hrp, pubkey)
        .map_err(|e| CryptoError::InvalidPublicKey(format!("bech32 encode failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_lowercase_hex() {
        let hex_key = "a".repeat(64);
        let canon = canonicalize(&hex_key).unwrap();
        assert_eq!(canon, [0xaa; 32]);
    }

    #[test]
    fn rejects_wrong_length_hex() {
        let err = canonicalize("abcd").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidPublicKey(_)));
    }

    #[test]
    fn bech32_roundtrips_through_hex() {
        let canon = [0x42u8; 32];
        let encoded = to_bech32(&canon).unwrap();
        assert!(encoded.starts_with("npub1"));
        let decoded = canonicalize(&encoded).unwrap();
        assert_eq!(decoded, canon);
    }
}
