// Path: crates/services/src/error.rs
use hearth_api::error::StoreError;
use hearth_crypto::error::CryptoError;
use hearth_dag::error::DagError;
use hearth_stats::error::StatsError;
use hearth_types::error::ErrorCode;

/// The C4/C5 error taxonomy (spec §7). `Dispatcher` (C6) and
/// `QueryPipeline` (C7) are the boundary that turns any of these -- or a
/// `hearth_api::error::DispatchError` surfaced by a `KindHandler` -- into
/// a client-visible `OK`/`NOTICE`/`CLOSED` message. Nothing here is ever
/// serialized directly onto the wire.
#[derive(thiserror::Error, Debug, Clone)]
pub enum ServicesError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("not allowed: {0}")]
    NotAllowed(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Dag(#[from] DagError),

    #[error("statistics store error: {0}")]
    Stats(String),

    #[error("subsystem error: {0}")]
    Backend(String),
}

impl From<StatsError> for ServicesError {
    fn from(e: StatsError) -> Self {
        ServicesError::Stats(e.to_string())
    }
}

impl ErrorCode for ServicesError {
    fn code(&self) -> &'static str {
        match self {
            ServicesError::InvalidPublicKey(_) => "SERVICES_INVALID_PUBLIC_KEY",
            ServicesError::NotAllowed(_) => "SERVICES_NOT_ALLOWED",
            ServicesError::Store(_) => "SERVICES_STORE",
            ServicesError::Crypto(_) => "SERVICES_CRYPTO",
            ServicesError::Dag(_) => "SERVICES_DAG",
            ServicesError::Stats(_) => "SERVICES_STATS",
            ServicesError::Backend(_) => "SERVICES_BACKEND",
        }
    }
}
