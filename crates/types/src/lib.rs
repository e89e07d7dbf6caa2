// Path: crates/types/src/lib.rs
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

/// Access-control settings, scopes, and subscription tiers (spec §3, §4.4).
pub mod access;
/// Relay configuration structures and TOML loading (spec §6).
pub mod config;
/// The error taxonomy and `ErrorCode` trait shared across the workspace.
pub mod error;
/// The signed `Event`/`Tag` types and canonical serialization (spec §3).
pub mod event;
/// The `Filter` type and its matching semantics (spec §4.2).
pub mod filter;
/// Framed wire messages in and out of the relay core (spec §6).
pub mod wire;

pub mod prelude;
