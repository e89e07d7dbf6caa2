// Path: crates/storage/src/redb_event_store.rs
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use redb::{Database, MultimapTableDefinition, ReadableMultimapTable, ReadableTable, TableDefinition};
use tokio::sync::{mpsc, oneshot, Mutex};

use hearth_api::error::StoreError;
use hearth_api::store::EventStore;
use hearth_types::event::Event;
use hearth_types::filter::Filter;

const EVENTS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("events");
const BY_AUTHOR: MultimapTableDefinition<&[u8], &[u8]> = MultimapTableDefinition::new("by_author");
const BY_KIND: MultimapTableDefinition<u64, &[u8]> = MultimapTableDefinition::new("by_kind");
const BY_TAG: MultimapTableDefinition<&[u8], &[u8]> = MultimapTableDefinition::new("by_tag");

fn tag_index_key(name: &str, value: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(name.len() + value.len() + 1);
    key.extend_from_slice(name.as_bytes());
    key.push(0);
    key.extend_from_slice(value.as_bytes());
    key
}

/// A background-persistence operation, queued onto a bounded channel so a
/// burst of writers never blocks on the redb write-transaction lock — the
/// same shape the teacher's `redb_epoch_store.rs` uses for block
/// persistence, generalized here from "block" to "event".
enum PersistenceOp {
    Put {
        event: Box<Event>,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    Delete {
        id: [u8; 32],
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    DeleteByTag {
        name: String,
        value: String,
        before_ts: i64,
        reply: oneshot::Sender<Result<Vec<[u8; 32]>, StoreError>>,
    },
}

/// Durable mapping from event-id to signed event, with secondary indices by
/// author, kind, and tag (spec §4.2). Reads are served from an in-memory
/// `memtable` for read-your-writes consistency while a background task
/// flushes to `redb` — the same "memtable ahead of the backend" pattern the
/// teacher uses in `RedbEpochStore`, here keyed by event id instead of
/// block height.
pub struct RedbEventStore {
    db: Arc<Database>,
    memtable: Arc<RwLock<HashMap<[u8; 32], Event>>>,
    tombstoned: Arc<RwLock<std::collections::HashSet<[u8; 32]>>>,
    tx: mpsc::Sender<PersistenceOp>,
}

impl RedbEventStore {
    pub fn open(path: &std::path::Path) -> Result<Self, StoreError> {
        let db = Database::create(path).map_err(|e| StoreError::Backend(e.to_string()))?;
        {
            let write_txn = db.begin_write().map_err(|e| StoreError::Backend(e.to_string()))?;
            {
                write_txn
                    .open_table(EVENTS)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                write_txn
                    .open_multimap_table(BY_AUTHOR)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                write_txn
                    .open_multimap_table(BY_KIND)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                write_txn
                    .open_multimap_table(BY_TAG)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
            }
            write_txn.commit().map_err(|e| StoreError::Backend(e.to_string()))?;
        }

        let db = Arc::new(db);
        let memtable = Arc::new(RwLock::new(HashMap::new()));
        let tombstoned = Arc::new(RwLock::new(std::collections::HashSet::new()));
        let (tx, rx) = mpsc::channel(1024);

        spawn_persistence_worker(db.clone(), memtable.clone(), rx);

        Ok(RedbEventStore {
            db,
            memtable,
            tombstoned,
            tx,
        })
    }

    fn read_from_backend(&self, id: &[u8; 32]) -> Result<Option<Event>, StoreError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let table = read_txn
            .open_table(EVENTS)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        match table.get(id.as_slice()).map_err(|e| StoreError::Backend(e.to_string()))? {
            Some(bytes) => {
                let event: Event = serde_json::from_slice(bytes.value())
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                Ok(Some(event))
            }
            None => Ok(None),
        }
    }

    fn exists(&self, id: &[u8; 32]) -> Result<bool, StoreError> {
        if self.memtable.read().map_err(|_| StoreError::Backend("memtable poisoned".into()))?.contains_key(id) {
            return Ok(true);
        }
        Ok(self.read_from_backend(id)?.is_some())
    }

    /// Gathers every event currently visible (memtable + backend, minus any
    /// id recorded as tombstoned in this process since open). `query`
    /// narrows via secondary indices when possible, falling back to a full
    /// scan when the filter names no ids/authors/kinds.
    fn candidate_ids(&self, filter: &Filter) -> Result<Vec<[u8; 32]>, StoreError> {
        if let Some(ids) = &filter.ids {
            return Ok(ids
                .iter()
                .filter_map(|s| hex::decode(s).ok())
                .filter_map(|v| v.try_into().ok())
                .collect());
        }

        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if let Some(authors) = &filter.authors {
            let table = read_txn
                .open_multimap_table(BY_AUTHOR)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            let mut ids = Vec::new();
            for author in authors {
                if let Ok(author_bytes) = hex::decode(author) {
                    let mut iter = table
                        .get(author_bytes.as_slice())
                        .map_err(|e| StoreError::Backend(e.to_string()))?;
                    while let Some(entry) = iter.next() {
                        let entry = entry.map_err(|e| StoreError::Backend(e.to_string()))?;
                        if let Ok(id) = <[u8; 32]>::try_from(entry.value()) {
                            ids.push(id);
                        }
                    }
                }
            }
            return Ok(ids);
        }

        if let Some(kinds) = &filter.kinds {
            let table = read_txn
                .open_multimap_table(BY_KIND)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            let mut ids = Vec::new();
            for kind in kinds {
                let mut iter = table
                    .get(*kind)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                while let Some(entry) = iter.next() {
                    let entry = entry.map_err(|e| StoreError::Backend(e.to_string()))?;
                    if let Ok(id) = <[u8; 32]>::try_from(entry.value()) {
                        ids.push(id);
                    }
                }
            }
            return Ok(ids);
        }

        if let Some((name, values)) = filter.tags.iter().next() {
            let table = read_txn
                .open_multimap_table(BY_TAG)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            let mut ids = Vec::new();
            for value in values {
                let key = tag_index_key(name, value);
                let mut iter = table
                    .get(key.as_slice())
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                while let Some(entry) = iter.next() {
                    let entry = entry.map_err(|e| StoreError::Backend(e.to_string()))?;
                    if let Ok(id) = <[u8; 32]>::try_from(entry.value()) {
                        ids.push(id);
                    }
                }
            }
            return Ok(ids);
        }

        // No narrowing constraint: full scan of the EVENTS table.
        let table = read_txn
            .open_table(EVENTS)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let mut ids = Vec::new();
        for entry in table.iter().map_err(|e| StoreError::Backend(e.to_string()))? {
            let (key, _) = entry.map_err(|e| StoreError::Backend(e.to_string()))?;
            if let Ok(id) = <[u8; 32]>::try_from(key.value()) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    fn get_visible(&self, id: &[u8; 32]) -> Result<Option<Event>, StoreError> {
        if self
            .tombstoned
            .read()
            .map_err(|_| StoreError::Backend("tombstone set poisoned".into()))?
            .contains(id)
        {
            return Ok(None);
        }
        if let Some(event) = self
            .memtable
            .read()
            .map_err(|_| StoreError::Backend("memtable poisoned".into()))?
            .get(id)
            .cloned()
        {
            return Ok(Some(event));
        }
        self.read_from_backend(id)
    }
}

fn spawn_persistence_worker(
    db: Arc<Database>,
    memtable: Arc<RwLock<HashMap<[u8; 32], Event>>>,
    mut rx: mpsc::Receiver<PersistenceOp>,
) {
    tokio::spawn(async move {
        while let Some(op) = rx.recv().await {
            match op {
                PersistenceOp::Put { event, reply } => {
                    let result = persist_put(&db, &event);
                    if result.is_ok() {
                        if let Ok(mut table) = memtable.write() {
                            table.remove(&event.id);
                        }
                    }
                    let _ = reply.send(result);
                }
                PersistenceOp::Delete { id, reply } => {
                    let result = persist_delete(&db, &id);
                    let _ = reply.send(result);
                }
                PersistenceOp::DeleteByTag {
                    name,
                    value,
                    before_ts,
                    reply,
                } => {
                    let result = persist_delete_by_tag(&db, &name, &value, before_ts);
                    let _ = reply.send(result);
                }
            }
        }
        tracing::info!("event store persistence worker shut down");
    });
}

fn persist_put(db: &Database, event: &Event) -> Result<(), StoreError> {
    let write_txn = db.begin_write().map_err(|e| StoreError::Backend(e.to_string()))?;
    {
        let mut events = write_txn
            .open_table(EVENTS)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let bytes = serde_json::to_vec(event).map_err(|e| StoreError::Backend(e.to_string()))?;
        events
            .insert(event.id.as_slice(), bytes.as_slice())
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut by_author = write_txn
            .open_multimap_table(BY_AUTHOR)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        by_author
            .insert(event.pubkey.as_slice(), event.id.as_slice())
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut by_kind = write_txn
            .open_multimap_table(BY_KIND)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        by_kind
            .insert(event.kind, event.id.as_slice())
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut by_tag = write_txn
            .open_multimap_table(BY_TAG)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        for tag in &event.tags {
            if let (Some(name), Some(value)) = (tag.get(0), tag.get(1)) {
                let key = tag_index_key(name, value);
                by_tag
                    .insert(key.as_slice(), event.id.as_slice())
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
            }
        }
    }
    write_txn.commit().map_err(|e| StoreError::Backend(e.to_string()))?;
    Ok(())
}

fn persist_delete(db: &Database, id: &[u8; 32]) -> Result<(), StoreError> {
    let write_txn = db.begin_write().map_err(|e| StoreError::Backend(e.to_string()))?;
    {
        let mut events = write_txn
            .open_table(EVENTS)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        events
            .remove(id.as_slice())
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        // Secondary index entries for a removed event are left as harmless
        // dangling pointers resolved at read time (`get_visible` returns
        // `None` once the primary row is gone); a compaction pass could
        // prune them, but none is required by spec §4.2's contract.
    }
    write_txn.commit().map_err(|e| StoreError::Backend(e.to_string()))?;
    Ok(())
}

fn persist_delete_by_tag(
    db: &Database,
    name: &str,
    value: &str,
    before_ts: i64,
) -> Result<Vec<[u8; 32]>, StoreError> {
    let key = tag_index_key(name, value);
    let mut removed = Vec::new();
    let write_txn = db.begin_write().map_err(|e| StoreError::Backend(e.to_string()))?;
    {
        let mut events = write_txn
            .open_table(EVENTS)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let by_tag = write_txn
            .open_multimap_table(BY_TAG)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let mut iter = by_tag
            .get(key.as_slice())
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let mut ids = Vec::new();
        while let Some(entry) = iter.next() {
            let entry = entry.map_err(|e| StoreError::Backend(e.to_string()))?;
            if let Ok(id) = <[u8; 32]>::try_from(entry.value()) {
                ids.push(id);
            }
        }
        drop(iter);
        for id in ids {
            if let Some(bytes) = events.get(id.as_slice()).map_err(|e| StoreError::Backend(e.to_string()))? {
                let event: Event = serde_json::from_slice(bytes.value())
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                drop(bytes);
                if event.created_at <= before_ts {
                    events
                        .remove(id.as_slice())
                        .map_err(|e| StoreError::Backend(e.to_string()))?;
                    removed.push(id);
                }
            }
        }
    }
    write_txn.commit().map_err(|e| StoreError::Backend(e.to_string()))?;
    Ok(removed)
}

#[async_trait]
impl EventStore for RedbEventStore {
    async fn put(&self, event: Event) -> Result<(), StoreError> {
        if hearth_crypto_verify(&event).is_err() {
            return Err(StoreError::InvalidSignature);
        }
        if self.exists(&event.id)? {
            return Err(StoreError::Duplicate);
        }
        {
            let mut table = self
                .memtable
                .write()
                .map_err(|_| StoreError::Backend("memtable poisoned".into()))?;
            table.insert(event.id, event.clone());
        }
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PersistenceOp::Put {
                event: Box::new(event),
                reply: reply_tx,
            })
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;
        reply_rx
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?
    }

    async fn get_by_id(&self, id: [u8; 32]) -> Result<Event, StoreError> {
        self.get_visible(&id)?.ok_or(StoreError::NotFound)
    }

    async fn query(&self, filter: &Filter) -> Result<Vec<Event>, StoreError> {
        let ids = self.candidate_ids(filter)?;
        let mut events = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for id in ids {
            if !seen.insert(id) {
                continue;
            }
            if let Some(event) = self.get_visible(&id)? {
                if filter.matches(&event) {
                    events.push(event);
                }
            }
        }
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        if let Some(limit) = filter.limit {
            events.truncate(limit);
        }
        Ok(events)
    }

    async fn delete(&self, id: [u8; 32]) -> Result<(), StoreError> {
        {
            let mut table = self
                .memtable
                .write()
                .map_err(|_| StoreError::Backend("memtable poisoned".into()))?;
            table.remove(&id);
        }
        {
            let mut tombstoned = self
                .tombstoned
                .write()
                .map_err(|_| StoreError::Backend("tombstone set poisoned".into()))?;
            tombstoned.insert(id);
        }
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PersistenceOp::Delete { id, reply: reply_tx })
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;
        reply_rx
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?
    }

    async fn delete_by_tag(
        &self,
        tag_name: &str,
        tag_value: &str,
        before_ts: i64,
    ) -> Result<Vec<[u8; 32]>, StoreError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PersistenceOp::DeleteByTag {
                name: tag_name.to_string(),
                value: tag_value.to_string(),
                before_ts,
                reply: reply_tx,
            })
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;
        let removed = reply_rx
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))??;
        if let Ok(mut tombstoned) = self.tombstoned.write() {
            tombstoned.extend(removed.iter().copied());
        }
        Ok(removed)
    }
}

/// Signature verification is out of this crate's remit (it belongs to
/// `hearth-crypto`); `hearth-services::dispatch` already verifies before
/// calling `put` per spec §4.6 step 3, so this is a defense-in-depth check
/// only, not the primary enforcement point. Kept dependency-free by
/// re-deriving the id here rather than taking a `hearth-crypto` dependency,
/// which would create a cycle (`hearth-crypto` has no reason to depend on
/// `hearth-store`, but adding the reverse edge here is unnecessary weight
/// for a belt-and-suspenders check).
fn hearth_crypto_verify(event: &Event) -> Result<(), ()> {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(event.canonical_payload());
    let computed: [u8; 32] = hasher.finalize().into();
    if computed != event.id {
        return Err(());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_types::event::Tag;

    fn sample_event(id: u8, kind: u64, created_at: i64) -> Event {
        let mut event = Event {
            id: [0u8; 32],
            pubkey: [2u8; 32],
            created_at,
            kind,
            tags: vec![Tag::new(["e", "marker"])],
            content: format!("event-{id}"),
            sig: [0u8; 64],
        };
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(event.canonical_payload());
        event.id = hasher.finalize().into();
        event
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbEventStore::open(&dir.path().join("events.redb")).unwrap();
        let event = sample_event(1, 1, 100);
        let id = event.id;
        store.put(event.clone()).await.unwrap();
        let fetched = store.get_by_id(id).await.unwrap();
        assert_eq!(fetched.content, event.content);
    }

    #[tokio::test]
    async fn duplicate_put_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbEventStore::open(&dir.path().join("events.redb")).unwrap();
        let event = sample_event(1, 1, 100);
        store.put(event.clone()).await.unwrap();
        let err = store.put(event).await.unwrap_err();
        assert_eq!(err, StoreError::Duplicate);
    }

    #[tokio::test]
    async fn query_orders_created_at_desc_id_asc() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbEventStore::open(&dir.path().join("events.redb")).unwrap();
        let older = sample_event(1, 1, 100);
        let newer = sample_event(2, 1, 200);
        store.put(older.clone()).await.unwrap();
        store.put(newer.clone()).await.unwrap();

        let results = store
            .query(&Filter {
                kinds: Some(vec![1]),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, newer.id);
        assert_eq!(results[1].id, older.id);
    }

    #[tokio::test]
    async fn delete_by_tag_removes_only_matching_before_cutoff() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbEventStore::open(&dir.path().join("events.redb")).unwrap();
        let before = sample_event(1, 1, 100);
        let after = sample_event(2, 1, 300);
        store.put(before.clone()).await.unwrap();
        store.put(after.clone()).await.unwrap();

        let removed = store.delete_by_tag("e", "marker", 200).await.unwrap();
        assert_eq!(removed, vec![before.id]);

        let remaining = store
            .query(&Filter {
                kinds: Some(vec![1]),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, after.id);
    }
}
