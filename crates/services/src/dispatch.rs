// Path: crates/services/src/dispatch.rs
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use hearth_api::error::{DispatchError, StoreError};
use hearth_api::kind_handler::{DispatchContext, KindHandler};
use hearth_api::store::EventStore;
use hearth_crypto::event::{compute_event_id, verify_event_signature};
use hearth_crypto::relay_list::verify_relay_list_signature;
use hearth_dag::store::DagStore;
use hearth_stats::store::StatsStore;
use hearth_types::event::Event;
use hearth_types::filter::Filter;
use hearth_types::wire::RelayMessage;

use crate::access::AccessController;

/// C6: the fixed `kind -> handler` table (spec §4.6), built once at
/// startup, plus the eight-step skeleton every event passes through before
/// a handler ever sees it.
pub struct Dispatcher {
    store: Arc<dyn EventStore>,
    stats: Arc<StatsStore>,
    access: Arc<AccessController>,
    dag: Arc<DagStore>,
    accountable_kinds: Vec<i64>,
    past_skew_secs: i64,
    future_skew_secs: i64,
    handlers: HashMap<u64, Box<dyn KindHandler>>,
    default_handler: Box<dyn KindHandler>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn EventStore>,
        stats: Arc<StatsStore>,
        access: Arc<AccessController>,
        dag: Arc<DagStore>,
        accountable_kinds: Vec<i64>,
        past_skew_secs: i64,
        future_skew_secs: i64,
    ) -> Self {
        let mut handlers: HashMap<u64, Box<dyn KindHandler>> = HashMap::new();
        handlers.insert(0, Box::new(ProfileHandler));
        for kind in [1, 3, 6, 7, 8] {
            handlers.insert(kind, Box::new(GenericHandler));
        }
        handlers.insert(5, Box::new(TombstoneHandler));
        handlers.insert(117, Box::new(FileAttachmentHandler));
        handlers.insert(411, Box::new(RelayInfoHandler));
        handlers.insert(445, Box::new(GroupEventHandler));
        handlers.insert(10001, Box::new(ReplaceableHandler));
        handlers.insert(10010, Box::new(ReplaceableHandler));
        handlers.insert(11011, Box::new(RelayListHandler));

        Dispatcher {
            store,
            stats,
            access,
            dag,
            accountable_kinds,
            past_skew_secs,
            future_skew_secs,
            handlers,
            default_handler: Box::new(GenericHandler),
        }
    }

    /// Spec §4.6's common prefix: timestamp skew, id recomputation,
    /// signature verification, write-access check, kind-specific handling,
    /// then exactly one client-visible `OK`. No handler error is ever
    /// forwarded to the wire verbatim.
    pub async fn handle_event(&self, event: Event, now: i64) -> RelayMessage {
        let event_id = event.id;

        if event.created_at < now - self.past_skew_secs || event.created_at > now + self.future_skew_secs {
            return RelayMessage::Ok {
                event_id,
                accepted: false,
                message: "invalid: created_at is outside the accepted skew window".into(),
            };
        }

        if compute_event_id(&event) != event.id {
            return RelayMessage::Ok {
                event_id,
                accepted: false,
                message: "invalid: id does not match the computed hash".into(),
            };
        }

        if let Err(e) = verify_event_signature(&event) {
            return RelayMessage::Ok {
                event_id,
                accepted: false,
                message: format!("invalid: {e}"),
            };
        }

        let author_hex = hex::encode(event.pubkey);
        if let Err(e) = self.access.can_write(&author_hex).await {
            return RelayMessage::Ok {
                event_id,
                accepted: false,
                message: format!("blocked: write - user does not have permission to write: {e}"),
            };
        }

        let handler = self.handlers.get(&event.kind).unwrap_or(&self.default_handler);
        match handler.handle(&event, self).await {
            Ok(message) => RelayMessage::Ok {
                event_id,
                accepted: true,
                message,
            },
            Err(DispatchError::Duplicate) | Err(DispatchError::Store(StoreError::Duplicate)) => {
                RelayMessage::Ok {
                    event_id,
                    accepted: true,
                    message: "duplicate: event already stored".into(),
                }
            }
            Err(e) => RelayMessage::Ok {
                event_id,
                accepted: false,
                message: e.to_string(),
            },
        }
    }
}

#[async_trait]
impl DispatchContext for Dispatcher {
    async fn store_put(&self, event: Event) -> Result<(), StoreError> {
        self.store.put(event).await
    }

    async fn store_get(&self, id: [u8; 32]) -> Result<Event, StoreError> {
        self.store.get_by_id(id).await
    }

    async fn store_query(&self, filter: &Filter) -> Result<Vec<Event>, StoreError> {
        self.store.query(filter).await
    }

    async fn store_delete(&self, id: [u8; 32]) -> Result<(), StoreError> {
        self.store.delete(id).await
    }

    async fn store_delete_by_tag(
        &self,
        tag_name: &str,
        tag_value: &str,
        before_ts: i64,
    ) -> Result<Vec<[u8; 32]>, StoreError> {
        self.store.delete_by_tag(tag_name, tag_value, before_ts).await
    }

    async fn record_stats(&self, event: &Event) {
        let event_id_hex = hex::encode(event.id);
        let author_hex = hex::encode(event.pubkey);
        if let Err(e) = self
            .stats
            .record_event_kind(
                &event_id_hex,
                &author_hex,
                event.kind as i64,
                &event.content,
                event.content.len() as i64,
                event.created_at,
                &self.accountable_kinds,
            )
            .await
        {
            tracing::warn!(error = %e, kind = event.kind, "failed to record event stats");
        }
    }

    async fn is_relay_owner(&self, pubkey_hex: &str) -> bool {
        self.stats
            .get_relay_owner()
            .await
            .map(|row| row.pubkey == pubkey_hex)
            .unwrap_or(false)
    }

    async fn file_info_exists(&self, author_hex: &str, blossom_hash: &str) -> bool {
        self.stats
            .file_info_exists(author_hex, blossom_hash)
            .await
            .unwrap_or(false)
    }

    async fn record_file_info(
        &self,
        author_hex: &str,
        blossom_hash: &str,
        event_id_hex: &str,
        size_bytes: i64,
        created_at: i64,
        tags: &[(String, String)],
    ) {
        if let Err(e) = self
            .stats
            .record_file_info(author_hex, blossom_hash, event_id_hex, size_bytes, created_at, tags)
            .await
        {
            tracing::warn!(error = %e, "failed to record file attachment");
        }
    }

    async fn delete_dag_root(&self, root_hash: [u8; 32]) {
        if let Err(e) = self.dag.delete_root(root_hash) {
            tracing::debug!(error = %e, root = %hex::encode(root_hash), "dag root already absent");
        }
    }
}

fn tag_value<'a>(event: &'a Event, name: &str) -> Option<&'a str> {
    event.tags.iter().find(|t| t.name() == Some(name)).and_then(|t| t.get(1))
}

/// Kinds 1/3/6/7/8, and the fallback for any kind with no dedicated
/// handler: store the event as-is and record accounting.
struct GenericHandler;

#[async_trait]
impl KindHandler for GenericHandler {
    async fn handle(&self, event: &Event, ctx: &dyn DispatchContext) -> Result<String, DispatchError> {
        ctx.store_put(event.clone()).await?;
        ctx.record_stats(event).await;
        Ok(String::new())
    }
}

/// Kind 0: profile metadata. No extra invariant beyond the common
/// skeleton -- the profile row itself is derived inside the stats store's
/// `record_event_kind`.
struct ProfileHandler;

#[async_trait]
impl KindHandler for ProfileHandler {
    async fn handle(&self, event: &Event, ctx: &dyn DispatchContext) -> Result<String, DispatchError> {
        ctx.store_put(event.clone()).await?;
        ctx.record_stats(event).await;
        Ok(String::new())
    }
}

/// Kind 5: tombstone. Cascades deletion across `"e"` tags (author-matched
/// against the tombstone's own pubkey), `"c"` tags (owner-prefix-matched
/// via `delete_by_tag`), and collects DAG roots referenced by an optional
/// `"d"` tag so they are removed before the cascaded events themselves.
struct TombstoneHandler;

#[async_trait]
impl KindHandler for TombstoneHandler {
    async fn handle(&self, event: &Event, ctx: &dyn DispatchContext) -> Result<String, DispatchError> {
        let author_hex = hex::encode(event.pubkey);

        for tag in event.tags.iter().filter(|t| t.name() == Some("e")) {
            let Some(target_hex) = tag.get(1) else { continue };
            let Ok(target_bytes) = hex::decode(target_hex) else { continue };
            let Ok(target_id) = <[u8; 32]>::try_from(target_bytes.as_slice()) else { continue };
            if let Ok(target_event) = ctx.store_get(target_id).await {
                if target_event.pubkey == event.pubkey {
                    if let Some(root_hex) = tag_value(&target_event, "d") {
                        if let Ok(root_bytes) = hex::decode(root_hex) {
                            if let Ok(root) = <[u8; 32]>::try_from(root_bytes.as_slice()) {
                                ctx.delete_dag_root(root).await;
                            }
                        }
                    }
                    ctx.store_delete(target_id).await?;
                }
            }
        }

        for tag in event.tags.iter().filter(|t| t.name() == Some("c")) {
            let Some(name) = tag.get(1) else { continue };
            let Some(value) = tag.get(2) else { continue };
            let owner_prefix = value.split(['/', ':']).next().unwrap_or(value);
            if owner_prefix != author_hex {
                continue;
            }
            let deleted = ctx.store_delete_by_tag(name, value, event.created_at).await?;
            for id in deleted {
                if let Ok(deleted_event) = ctx.store_get(id).await {
                    if let Some(root_hex) = tag_value(&deleted_event, "d") {
                        if let Ok(root_bytes) = hex::decode(root_hex) {
                            if let Ok(root) = <[u8; 32]>::try_from(root_bytes.as_slice()) {
                                ctx.delete_dag_root(root).await;
                            }
                        }
                    }
                }
            }
        }

        ctx.store_put(event.clone()).await?;
        ctx.record_stats(event).await;
        Ok("tombstone processed".into())
    }
}

/// Kind 117: file attachment. Requires a `"blossom_hash"` tag and rejects
/// a second upload of the same hash by the same author.
struct FileAttachmentHandler;

#[async_trait]
impl KindHandler for FileAttachmentHandler {
    async fn handle(&self, event: &Event, ctx: &dyn DispatchContext) -> Result<String, DispatchError> {
        let Some(blossom_hash) = tag_value(event, "blossom_hash") else {
            return Err(DispatchError::Invalid("missing blossom_hash tag".into()));
        };
        let author_hex = hex::encode(event.pubkey);
        if ctx.file_info_exists(&author_hex, blossom_hash).await {
            return Err(DispatchError::Duplicate);
        }

        ctx.store_put(event.clone()).await?;
        ctx.record_stats(event).await;

        let event_id_hex = hex::encode(event.id);
        let tags: Vec<(String, String)> = event
            .tags
            .iter()
            .filter_map(|t| Some((t.name()?.to_string(), t.get(1)?.to_string())))
            .collect();
        ctx.record_file_info(
            &author_hex,
            blossom_hash,
            &event_id_hex,
            event.content.len() as i64,
            event.created_at,
            &tags,
        )
        .await;
        Ok(String::new())
    }
}

/// Kind 411: relay information document. Owner-only singleton: replaces
/// any previous kind-411 event rather than accumulating one per author.
struct RelayInfoHandler;

#[async_trait]
impl KindHandler for RelayInfoHandler {
    async fn handle(&self, event: &Event, ctx: &dyn DispatchContext) -> Result<String, DispatchError> {
        let author_hex = hex::encode(event.pubkey);
        if !ctx.is_relay_owner(&author_hex).await {
            return Err(DispatchError::NotAllowed("relay-info is owner-only".into()));
        }

        let existing = ctx
            .store_query(&Filter {
                kinds: Some(vec![411]),
                ..Default::default()
            })
            .await?;
        for old in existing {
            ctx.store_delete(old.id).await?;
        }

        ctx.store_put(event.clone()).await?;
        ctx.record_stats(event).await;
        Ok(String::new())
    }
}

/// Kind 445: group event. Requires an `"h"` tag naming the group.
struct GroupEventHandler;

#[async_trait]
impl KindHandler for GroupEventHandler {
    async fn handle(&self, event: &Event, ctx: &dyn DispatchContext) -> Result<String, DispatchError> {
        if tag_value(event, "h").is_none() {
            return Err(DispatchError::Invalid("missing h tag".into()));
        }
        ctx.store_put(event.clone()).await?;
        ctx.record_stats(event).await;
        Ok(String::new())
    }
}

/// Kinds 10001/10010: replaceable events. Older events by the same author
/// and kind are superseded: query, insert the new one, delete the rest.
struct ReplaceableHandler;

#[async_trait]
impl KindHandler for ReplaceableHandler {
    async fn handle(&self, event: &Event, ctx: &dyn DispatchContext) -> Result<String, DispatchError> {
        let author_hex = hex::encode(event.pubkey);
        let older = ctx
            .store_query(&Filter {
                kinds: Some(vec![event.kind]),
                authors: Some(vec![author_hex]),
                ..Default::default()
            })
            .await?;

        ctx.store_put(event.clone()).await?;
        ctx.record_stats(event).await;

        for old in older {
            if old.id != event.id {
                ctx.store_delete(old.id).await?;
            }
        }
        Ok(String::new())
    }
}

#[derive(Debug, Default, Deserialize)]
struct RelayListPayload {
    #[serde(default)]
    relays: Vec<String>,
}

/// Kind 11011: bencode+Ed25519-signed relay list. `dht_pubkey`/`dht_sig`
/// tags carry the signature over the raw (bencoded) content bytes; the
/// decoded payload is logged, not stored in a dedicated relay-directory
/// component -- this corpus has none.
struct RelayListHandler;

#[async_trait]
impl KindHandler for RelayListHandler {
    async fn handle(&self, event: &Event, ctx: &dyn DispatchContext) -> Result<String, DispatchError> {
        let dht_pubkey_hex = tag_value(event, "dht_pubkey")
            .ok_or_else(|| DispatchError::Invalid("missing dht_pubkey tag".into()))?;
        let dht_sig_hex = tag_value(event, "dht_sig")
            .ok_or_else(|| DispatchError::Invalid("missing dht_sig tag".into()))?;
        let dht_pubkey = hex::decode(dht_pubkey_hex)
            .map_err(|e| DispatchError::Invalid(format!("bad dht_pubkey: {e}")))?;
        let dht_sig = hex::decode(dht_sig_hex)
            .map_err(|e| DispatchError::Invalid(format!("bad dht_sig: {e}")))?;

        verify_relay_list_signature(&dht_pubkey, &dht_sig, event.content.as_bytes())
            .map_err(|e| DispatchError::Invalid(format!("relay list signature: {e}")))?;

        match serde_bencode::from_bytes::<RelayListPayload>(event.content.as_bytes()) {
            Ok(payload) => {
                let relays: HashSet<&str> = payload.relays.iter().map(String::as_str).collect();
                tracing::info!(relays = ?relays, "relay list ready for DHT propagation");
            }
            Err(e) => tracing::debug!(error = %e, "relay list content is not decodable bencode"),
        }

        ctx.store_put(event.clone()).await?;
        ctx.record_stats(event).await;
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use hearth_types::event::Tag;

    #[derive(Default)]
    struct StubStore {
        events: StdMutex<Vec<Event>>,
        deleted_roots: StdMutex<Vec<[u8; 32]>>,
    }

    #[async_trait]
    impl DispatchContext for StubStore {
        async fn store_put(&self, event: Event) -> Result<(), StoreError> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }

        async fn store_get(&self, id: [u8; 32]) -> Result<Event, StoreError> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .ok_or(StoreError::NotFound)
        }

        async fn store_query(&self, _filter: &Filter) -> Result<Vec<Event>, StoreError> {
            Ok(self.events.lock().unwrap().clone())
        }

        async fn store_delete(&self, id: [u8; 32]) -> Result<(), StoreError> {
            self.events.lock().unwrap().retain(|e| e.id != id);
            Ok(())
        }

        async fn store_delete_by_tag(
            &self,
            tag_name: &str,
            tag_value: &str,
            before_ts: i64,
        ) -> Result<Vec<[u8; 32]>, StoreError> {
            let mut events = self.events.lock().unwrap();
            let mut deleted = Vec::new();
            events.retain(|e| {
                let matches = e.created_at <= before_ts
                    && e.tags
                        .iter()
                        .any(|t| t.name() == Some(tag_name) && t.get(1) == Some(tag_value));
                if matches {
                    deleted.push(e.id);
                }
                !matches
            });
            Ok(deleted)
        }

        async fn record_stats(&self, _event: &Event) {}

        async fn is_relay_owner(&self, _pubkey_hex: &str) -> bool {
            false
        }

        async fn file_info_exists(&self, _author_hex: &str, _blossom_hash: &str) -> bool {
            false
        }

        async fn record_file_info(
            &self,
            _author_hex: &str,
            _blossom_hash: &str,
            _event_id_hex: &str,
            _size_bytes: i64,
            _created_at: i64,
            _tags: &[(String, String)],
        ) {
        }

        async fn delete_dag_root(&self, root_hash: [u8; 32]) {
            self.deleted_roots.lock().unwrap().push(root_hash);
        }
    }

    fn tagged_event(id: u8, author: [u8; 32], created_at: i64, tag_name: &str, tag_value: &str) -> Event {
        Event {
            id: [id; 32],
            pubkey: author,
            created_at,
            kind: 1,
            tags: vec![Tag::new([tag_name, tag_value])],
            content: String::new(),
            sig: [0u8; 64],
        }
    }

    /// S2: owner `P` publishes a kind-5 tagged `["c","r","P:repoA"]` at
    /// `t=200`; two events tagged `["r","P:repoA"]` at `t=100,150` by other
    /// authors must be cascaded away, and the tombstone itself persists.
    #[tokio::test]
    async fn tombstone_cascade_deletes_by_owner_prefixed_tag_value() {
        let owner = [0xAAu8; 32];
        let owner_hex = hex::encode(owner);
        let other_author = [0xBBu8; 32];

        let store = StubStore::default();
        store
            .store_put(tagged_event(1, other_author, 100, "r", &format!("{owner_hex}:repoA")))
            .await
            .unwrap();
        store
            .store_put(tagged_event(2, other_author, 150, "r", &format!("{owner_hex}:repoA")))
            .await
            .unwrap();

        let tombstone = Event {
            id: [3u8; 32],
            pubkey: owner,
            created_at: 200,
            kind: 5,
            tags: vec![Tag::new(["c", "r", &format!("{owner_hex}:repoA")])],
            content: String::new(),
            sig: [0u8; 64],
        };

        let handler = TombstoneHandler;
        handler.handle(&tombstone, &store).await.unwrap();

        let remaining = store.events.lock().unwrap().clone();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, tombstone.id);
    }

    /// A `"c"` tag whose value's owner prefix does not match the
    /// tombstone's author must not trigger a cascade.
    #[tokio::test]
    async fn tombstone_cascade_rejects_mismatched_owner_prefix() {
        let owner = [0xAAu8; 32];
        let impostor = [0xCCu8; 32];
        let other_author = [0xBBu8; 32];

        let store = StubStore::default();
        let target = tagged_event(1, other_author, 100, "r", &format!("{}:repoA", hex::encode(owner)));
        store.store_put(target.clone()).await.unwrap();

        let tombstone = Event {
            id: [3u8; 32],
            pubkey: impostor,
            created_at: 200,
            kind: 5,
            tags: vec![Tag::new(["c", "r", &format!("{}:repoA", hex::encode(owner))])],
            content: String::new(),
            sig: [0u8; 64],
        };

        let handler = TombstoneHandler;
        handler.handle(&tombstone, &store).await.unwrap();

        let remaining = store.events.lock().unwrap().clone();
        assert!(remaining.iter().any(|e| e.id == target.id));
    }
}
