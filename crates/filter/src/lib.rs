// Path: crates/filter/src/lib.rs
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

//! Content-filter cache and LLM proxy (C8): a bounded TTL cache of
//! `(event-id, instructions-hash) -> verdict`, batched/concurrency-bounded
//! calls to an external inference endpoint, and a background purge task.
//! Every failure mode is fail-open by contract (spec §4.8) — this crate
//! never propagates an upstream error to its caller.

pub mod cache;
pub mod http_runtime;
pub mod pipeline;
pub mod purge;

pub mod prelude {
    pub use crate::cache::{instructions_hash, FilterCache};
    pub use crate::http_runtime::HttpContentFilterRuntime;
    pub use crate::pipeline::ContentFilter;
    pub use crate::purge::spawn_purge_task;
}
