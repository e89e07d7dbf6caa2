// Path: crates/types/src/error/mod.rs

/// Maps every error variant in this workspace to a stable, machine-readable
/// code independent of its human-facing `Display` message. Transports and
/// admin tooling should match on `code()`, never on the message text.
pub trait ErrorCode {
    fn code(&self) -> &'static str;
}

/// Errors that can occur while working with `Event`/`Tag`/`Filter` values
/// themselves, before any storage or network concern is involved.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid event id: {0}")]
    InvalidEventId(String),

    #[error("invalid signature encoding: {0}")]
    InvalidSignatureEncoding(String),

    #[error("malformed wire message: {0}")]
    InvalidFraming(String),

    #[error("config error: {0}")]
    Config(String),
}

impl ErrorCode for TypesError {
    fn code(&self) -> &'static str {
        match self {
            TypesError::InvalidPublicKey(_) => "TYPES_INVALID_PUBLIC_KEY",
            TypesError::InvalidEventId(_) => "TYPES_INVALID_EVENT_ID",
            TypesError::InvalidSignatureEncoding(_) => "TYPES_INVALID_SIGNATURE_ENCODING",
            TypesError::InvalidFraming(_) => "TYPES_INVALID_FRAMING",
            TypesError::Config(_) => "TYPES_CONFIG",
        }
    }
}

impl From<serde_json::Error> for TypesError {
    fn from(e: serde_json::Error) -> Self {
        TypesError::InvalidFraming(e.to_string())
    }
}
