// Path: crates/node/src/lib.rs
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

//! Wires the `hearth-*` library crates into one `Runtime` (spec §9: an
//! explicit record threaded into handler constructors rather than
//! process-wide singletons, built via one-directional dependency
//! injection), and exposes the two boundary calls an external transport
//! drives: [`Runtime::handle_client_message`] for everything inbound on a
//! connection, and bootstrap/shutdown around it. Transport binding itself
//! (WebSocket or a peer-to-peer stream multiplexer) is out of scope (spec
//! §1) and lives entirely outside this crate.

pub mod runtime;

pub use runtime::Runtime;
