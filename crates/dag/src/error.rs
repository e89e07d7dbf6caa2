// Path: crates/dag/src/error.rs
use hearth_crypto::error::CryptoError;

/// Errors C9 (DAG upload/download) surfaces, per spec §4.9 and §7.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DagError {
    #[error("invalid root signature: {0}")]
    InvalidRootSignature(CryptoError),

    #[error("root not found")]
    RootNotFound,

    #[error("leaf not found: {0}")]
    LeafNotFound(String),

    #[error("leaf does not belong to an open upload session")]
    NoOpenUpload,

    #[error("backend error: {0}")]
    Backend(String),
}

impl hearth_types::error::ErrorCode for DagError {
    fn code(&self) -> &'static str {
        match self {
            DagError::InvalidRootSignature(_) => "DAG_INVALID_ROOT_SIGNATURE",
            DagError::RootNotFound => "DAG_ROOT_NOT_FOUND",
            DagError::LeafNotFound(_) => "DAG_LEAF_NOT_FOUND",
            DagError::NoOpenUpload => "DAG_NO_OPEN_UPLOAD",
            DagError::Backend(_) => "DAG_BACKEND",
        }
    }
}
