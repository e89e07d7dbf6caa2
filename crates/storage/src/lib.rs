// Path: crates/storage/src/lib.rs
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

//! The C2 event store: a durable `redb`-backed mapping from event-id to
//! signed event, with secondary indices by author, kind, and tag.

pub mod redb_event_store;

pub use redb_event_store::RedbEventStore;
