// Path: crates/stats/src/lib.rs
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

//! The relational statistics store (C3): users, allow-lists, paid
//! subscribers, wallet bookkeeping, address allocation, and moderation /
//! payment / report notifications. Backed by SQLite through `diesel`, with
//! one connection (and lock) per named subsystem so unrelated subsystems
//! never block each other.

pub mod error;
pub mod models;
pub mod retry;
pub mod schema;
pub mod store;

pub mod prelude {
    pub use crate::error::StatsError;
    pub use crate::retry::with_retry;
    pub use crate::store::{StatsBucket, StatsStore};
}
