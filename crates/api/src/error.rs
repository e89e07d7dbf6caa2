// Path: crates/api/src/error.rs
use hearth_types::error::ErrorCode;

/// Errors `EventStore` implementations surface. This is the rich,
/// subsystem-specific error category; the dispatcher maps it to a
/// client-visible `OK`/`NOTICE` message at the transport boundary, never
/// forwarding it directly.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("event already exists")]
    Duplicate,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("event not found")]
    NotFound,

    #[error("transient storage error: {0}")]
    Transient(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl ErrorCode for StoreError {
    fn code(&self) -> &'static str {
        match self {
            StoreError::Duplicate => "STORE_DUPLICATE",
            StoreError::InvalidSignature => "STORE_INVALID_SIGNATURE",
            StoreError::NotFound => "STORE_NOT_FOUND",
            StoreError::Transient(_) => "STORE_TRANSIENT",
            StoreError::Backend(_) => "STORE_BACKEND",
        }
    }
}

/// Errors a `ContentFilterRuntime` implementation can surface. Almost every
/// real-world failure (network error, timeout, non-200, malformed JSON) is
/// *not* one of these — `hearth-filter` catches them and returns a
/// fail-open `FilterVerdict` instead. This enum exists for genuine misuse
/// (e.g. calling an unconfigured runtime), not for the upstream-unavailable
/// case.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("content filter runtime not configured")]
    NotConfigured,

    /// Network error, timeout, non-200 status, or malformed response body.
    /// `hearth-filter` catches every variant of this at the `filter_one`
    /// boundary and converts it to `FilterVerdict::pass("api-error")` — it
    /// never reaches a client.
    #[error("upstream content-filter call failed: {0}")]
    Upstream(String),
}

impl ErrorCode for FilterError {
    fn code(&self) -> &'static str {
        match self {
            FilterError::NotConfigured => "FILTER_NOT_CONFIGURED",
            FilterError::Upstream(_) => "FILTER_UPSTREAM",
        }
    }
}

/// Errors a `KindHandler` can return from its per-kind invariant checks.
/// `hearth-services::Dispatcher` is the single boundary that maps these
/// (and every other subsystem error it wraps as `Backend`) into a
/// client-visible `OK`/`CLOSED` message — no raw error ever reaches the
/// wire.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("event timestamp outside the configured skew window")]
    TimestampSkew,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("not allowed: {0}")]
    NotAllowed(String),

    #[error("event already exists")]
    Duplicate,

    #[error("kind-specific validation failed: {0}")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("subsystem error: {0}")]
    Backend(String),
}

impl ErrorCode for DispatchError {
    fn code(&self) -> &'static str {
        match self {
            DispatchError::TimestampSkew => "DISPATCH_TIMESTAMP_SKEW",
            DispatchError::InvalidSignature => "DISPATCH_INVALID_SIGNATURE",
            DispatchError::NotAllowed(_) => "DISPATCH_NOT_ALLOWED",
            DispatchError::Duplicate => "DISPATCH_DUPLICATE",
            DispatchError::Invalid(_) => "DISPATCH_INVALID",
            DispatchError::Store(_) => "DISPATCH_STORE",
            DispatchError::Backend(_) => "DISPATCH_BACKEND",
        }
    }
}
