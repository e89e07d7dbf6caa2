// Path: crates/api/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! Cross-crate trait seams. These are the only interfaces `hearth-services`
//! depends on for storage and content-filtering, breaking what would
//! otherwise be a cyclic reference between the store, the subscription
//! manager, and the access controller: concrete crates implement these
//! traits and are wired together in one direction by `hearth-node::Runtime`.

/// Shared error categories for the traits below.
pub mod error;
/// The remote content-inference seam.
pub mod filter_runtime;
/// The kind-dispatch seam.
pub mod kind_handler;
/// The event-store seam.
pub mod store;

pub mod prelude {
    pub use crate::error::{DispatchError, FilterError, StoreError};
    pub use crate::filter_runtime::{ContentFilterRuntime, FilterVerdict};
    pub use crate::kind_handler::{DispatchContext, KindHandler};
    pub use crate::store::EventStore;
}
