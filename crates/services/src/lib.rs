// Path: crates/services/src/lib.rs
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

//! Access control, subscriptions, kind dispatch, and the query pipeline
//! (C4-C7). Depends on `hearth-api`'s `EventStore`/`KindHandler` traits
//! rather than on `hearth-store` directly, and on `hearth-stats` for
//! ledger reads/writes -- the one-directional wiring of spec §9 is built
//! by `hearth-node`, not by this crate.

pub mod access;
pub mod dispatch;
pub mod error;
pub mod query;
pub mod subscription;

pub mod prelude {
    pub use crate::access::{AccessController, Direction};
    pub use crate::dispatch::Dispatcher;
    pub use crate::error::ServicesError;
    pub use crate::query::{QueryPipeline, Session};
    pub use crate::subscription::SubscriptionManager;
}
