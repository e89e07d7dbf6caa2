// Path: crates/api/src/filter_runtime.rs
use async_trait::async_trait;
use std::time::Duration;

use crate::error::FilterError;

/// The outcome of one content-filter decision, cached by `hearth-filter`
/// keyed on `(event_id, sha256(instructions))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterVerdict {
    pub pass: bool,
    pub reason: String,
}

impl FilterVerdict {
    pub fn pass(reason: impl Into<String>) -> Self {
        FilterVerdict {
            pass: true,
            reason: reason.into(),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        FilterVerdict {
            pass: false,
            reason: reason.into(),
        }
    }
}

/// The remote inference call the content-filter cache wraps with fail-open
/// semantics. Narrowed from a general chat/tool/embedding inference trait
/// down to the single true/false content-filter question this relay asks.
#[async_trait]
pub trait ContentFilterRuntime: Send + Sync {
    /// Sends `prompt` (instructions + event content + the true/false
    /// directive) to the endpoint with the given hard `timeout`. Returns the
    /// raw textual response body. `hearth-filter` is responsible for
    /// catching every error this can produce and converting it into a
    /// fail-open `FilterVerdict` — this trait itself is allowed to return an
    /// `Err` for transport-level failures; only `NotConfigured` is reserved
    /// for genuine misuse.
    async fn classify(&self, prompt: &str, timeout: Duration) -> Result<String, FilterError>;
}
