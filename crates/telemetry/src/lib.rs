// Path: crates/telemetry/src/lib.rs
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

//! Structured JSON logging initialization shared across every `hearth-*`
//! binary. No admin-panel metrics or dashboards here; this crate only
//! wires up `tracing`.

/// The initialization routine for global structured logging.
pub mod init;

pub use init::init_tracing;
