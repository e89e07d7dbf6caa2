// Path: crates/api/src/store.rs
use async_trait::async_trait;

use hearth_types::event::Event;
use hearth_types::filter::Filter;

use crate::error::StoreError;

/// The event-store contract. `hearth-store`'s redb-backed implementation is
/// the only production implementor; the trait exists so `hearth-services`
/// depends on this interface rather than on `hearth-store` directly — the
/// store is constructed first and referenced by everything built after it.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Fails with `Duplicate` if `event.id` already exists, `InvalidSignature`
    /// if `verify_event_signature` rejects it, else persists the event and
    /// updates every secondary index.
    async fn put(&self, event: Event) -> Result<(), StoreError>;

    /// Returns the event or `NotFound`.
    async fn get_by_id(&self, id: [u8; 32]) -> Result<Event, StoreError>;

    /// Matches per `Filter`'s conjunction-across-fields, disjunction-within-
    /// field semantics; results ordered `created_at` desc, id asc, truncated
    /// to `filter.limit` after ordering.
    async fn query(&self, filter: &Filter) -> Result<Vec<Event>, StoreError>;

    /// Idempotent: removing an absent id is not an error.
    async fn delete(&self, id: [u8; 32]) -> Result<(), StoreError>;

    /// Atomically removes every event carrying `(tag_name, tag_value)` whose
    /// `created_at <= before_ts`; returns the removed ids.
    async fn delete_by_tag(
        &self,
        tag_name: &str,
        tag_value: &str,
        before_ts: i64,
    ) -> Result<Vec<[u8; 32]>, StoreError>;
}
