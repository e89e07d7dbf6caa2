// Path: crates/crypto/src/error.rs
use hearth_types::error::ErrorCode;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid signature encoding: {0}")]
    InvalidSignatureEncoding(String),

    #[error("key generation failed: {0}")]
    KeyGeneration(String),
}

impl ErrorCode for CryptoError {
    fn code(&self) -> &'static str {
        match self {
            CryptoError::InvalidPublicKey(_) => "CRYPTO_INVALID_PUBLIC_KEY",
            CryptoError::InvalidSignature => "CRYPTO_INVALID_SIGNATURE",
            CryptoError::InvalidSignatureEncoding(_) => "CRYPTO_INVALID_SIGNATURE_ENCODING",
            CryptoError::KeyGeneration(_) => "CRYPTO_KEY_GENERATION",
        }
    }
}
