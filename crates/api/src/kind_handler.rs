// Path: crates/api/src/kind_handler.rs
use async_trait::async_trait;

use hearth_types::event::Event;
use hearth_types::filter::Filter;

use crate::error::{DispatchError, StoreError};

/// The narrow set of capabilities a [`KindHandler`] needs from the wired-up
/// runtime, without depending on `hearth-store`/`hearth-stats`/`hearth-dag`
/// directly. `hearth-services::Dispatcher` is the sole implementor: handlers
/// are generic over this trait, not over a concrete runtime struct.
#[async_trait]
pub trait DispatchContext: Send + Sync {
    async fn store_put(&self, event: Event) -> Result<(), StoreError>;
    async fn store_get(&self, id: [u8; 32]) -> Result<Event, StoreError>;
    async fn store_query(&self, filter: &Filter) -> Result<Vec<Event>, StoreError>;
    async fn store_delete(&self, id: [u8; 32]) -> Result<(), StoreError>;
    async fn store_delete_by_tag(
        &self,
        tag_name: &str,
        tag_value: &str,
        before_ts: i64,
    ) -> Result<Vec<[u8; 32]>, StoreError>;

    /// Records author/kind/size accounting and, for kind 0, upserts the
    /// profile row. Never fails the write that triggered it.
    async fn record_stats(&self, event: &Event);

    async fn is_relay_owner(&self, pubkey_hex: &str) -> bool;

    /// `true` if `author_hex` has already recorded this Blossom hash (kind
    /// 117's duplicate-upload check).
    async fn file_info_exists(&self, author_hex: &str, blossom_hash: &str) -> bool;

    /// Records a new kind-117 file attachment and its tags. Never fails the
    /// write that triggered it.
    async fn record_file_info(
        &self,
        author_hex: &str,
        blossom_hash: &str,
        event_id_hex: &str,
        size_bytes: i64,
        created_at: i64,
        tags: &[(String, String)],
    );

    /// Best-effort: deletes a DAG root by hash, swallowing errors (the root
    /// may already be gone or may never have existed).
    async fn delete_dag_root(&self, root_hash: [u8; 32]);
}

/// One implementation per Nostr kind the relay understands, looked up from
/// a fixed `HashMap<u64, Box<dyn KindHandler>>` built once at startup. Runs
/// after the dispatcher's common prefix — timestamp skew, signature
/// verification, write-access check — has already passed.
#[async_trait]
pub trait KindHandler: Send + Sync {
    /// Applies this kind's invariants, persists `event` through `ctx`, and
    /// returns the message to attach to the client's `OK`. An `Err` becomes
    /// `OK false <message>`, except `DispatchError::Duplicate`, which the
    /// dispatcher turns into `OK true "duplicate: ..."`.
    async fn handle(
        &self,
        event: &Event,
        ctx: &dyn DispatchContext,
    ) -> Result<String, DispatchError>;
}
