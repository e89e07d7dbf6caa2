// Path: crates/dag/src/store.rs
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use redb::{Database, MultimapTableDefinition, ReadableMultimapTable, ReadableTable, TableDefinition};

use hearth_crypto::event::verify_schnorr_signature;

use crate::error::DagError;
use crate::leaf::DagLeaf;

const LEAVES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("dag_leaves");
const CHILDREN: MultimapTableDefinition<&[u8], &[u8]> = MultimapTableDefinition::new("dag_children");
const ROOT_MEMBERS: MultimapTableDefinition<&[u8], &[u8]> = MultimapTableDefinition::new("dag_root_members");

/// An in-progress upload: the uploader's verified pubkey and the leaves
/// received so far, buffered until `commit` (spec §4.9's "accepts
/// successive leaf messages, commits the DAG when complete").
struct PendingUpload {
    uploader_pubkey: [u8; 32],
    leaves: Vec<DagLeaf>,
}

/// C9 at interface level: root-signature verification, content-addressed
/// leaf storage (redb-backed, grounded on the teacher's `get_node`/
/// `put_block` content-addressing pattern), and deterministic
/// parents-before-children traversal for download.
pub struct DagStore {
    db: Arc<Database>,
    pending: Mutex<HashMap<[u8; 32], PendingUpload>>,
}

impl DagStore {
    pub fn open(path: &std::path::Path) -> Result<Self, DagError> {
        let db = Database::create(path).map_err(|e| DagError::Backend(e.to_string()))?;
        {
            let write_txn = db.begin_write().map_err(|e| DagError::Backend(e.to_string()))?;
            {
                write_txn.open_table(LEAVES).map_err(|e| DagError::Backend(e.to_string()))?;
                write_txn
                    .open_multimap_table(CHILDREN)
                    .map_err(|e| DagError::Backend(e.to_string()))?;
                write_txn
                    .open_multimap_table(ROOT_MEMBERS)
                    .map_err(|e| DagError::Backend(e.to_string()))?;
            }
            write_txn.commit().map_err(|e| DagError::Backend(e.to_string()))?;
        }
        Ok(DagStore {
            db: Arc::new(db),
            pending: Mutex::new(HashMap::new()),
        })
    }

    /// Verifies the uploader's Schnorr signature over the root CID and
    /// opens a pending-upload session for it. Per spec §4.9: "a root is
    /// accepted only if its signature verifies against a provided pubkey
    /// over the root CID."
    pub fn begin_upload(
        &self,
        root_hash: [u8; 32],
        uploader_pubkey: [u8; 32],
        signature: [u8; 64],
    ) -> Result<(), DagError> {
        verify_schnorr_signature(&uploader_pubkey, &root_hash, &signature)
            .map_err(DagError::InvalidRootSignature)?;
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| DagError::Backend("pending-upload lock poisoned".into()))?;
        pending.insert(
            root_hash,
            PendingUpload {
                uploader_pubkey,
                leaves: Vec::new(),
            },
        );
        Ok(())
    }

    /// Buffers one leaf belonging to an open upload session. Call `commit`
    /// once every leaf has been received.
    pub fn put_leaf(&self, root_hash: [u8; 32], leaf: DagLeaf) -> Result<(), DagError> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| DagError::Backend("pending-upload lock poisoned".into()))?;
        let upload = pending.get_mut(&root_hash).ok_or(DagError::NoOpenUpload)?;
        upload.leaves.push(leaf);
        Ok(())
    }

    /// Commits every buffered leaf for `root_hash` into the durable store in
    /// one write transaction, then clears the pending session. Returns the
    /// number of leaves committed.
    pub fn commit(&self, root_hash: [u8; 32]) -> Result<usize, DagError> {
        let upload = {
            let mut pending = self
                .pending
                .lock()
                .map_err(|_| DagError::Backend("pending-upload lock poisoned".into()))?;
            pending.remove(&root_hash).ok_or(DagError::NoOpenUpload)?
        };
        let _ = upload.uploader_pubkey;

        let write_txn = self.db.begin_write().map_err(|e| DagError::Backend(e.to_string()))?;
        {
            let mut leaves_table = write_txn.open_table(LEAVES).map_err(|e| DagError::Backend(e.to_string()))?;
            let mut children_table = write_txn
                .open_multimap_table(CHILDREN)
                .map_err(|e| DagError::Backend(e.to_string()))?;
            let mut root_members = write_txn
                .open_multimap_table(ROOT_MEMBERS)
                .map_err(|e| DagError::Backend(e.to_string()))?;

            for leaf in &upload.leaves {
                let encoded = encode_leaf(leaf);
                leaves_table
                    .insert(leaf.hash.as_slice(), encoded.as_slice())
                    .map_err(|e| DagError::Backend(e.to_string()))?;
                if let Some(parent) = leaf.parent_hash {
                    children_table
                        .insert(parent.as_slice(), leaf.hash.as_slice())
                        .map_err(|e| DagError::Backend(e.to_string()))?;
                }
                root_members
                    .insert(root_hash.as_slice(), leaf.hash.as_slice())
                    .map_err(|e| DagError::Backend(e.to_string()))?;
            }
        }
        write_txn.commit().map_err(|e| DagError::Backend(e.to_string()))?;
        Ok(upload.leaves.len())
    }

    fn get_leaf(&self, hash: &[u8; 32]) -> Result<Option<DagLeaf>, DagError> {
        let read_txn = self.db.begin_read().map_err(|e| DagError::Backend(e.to_string()))?;
        let table = read_txn.open_table(LEAVES).map_err(|e| DagError::Backend(e.to_string()))?;
        match table.get(hash.as_slice()).map_err(|e| DagError::Backend(e.to_string()))? {
            Some(bytes) => Ok(Some(decode_leaf(bytes.value())?)),
            None => Ok(None),
        }
    }

    fn children_of(&self, hash: &[u8; 32]) -> Result<Vec<[u8; 32]>, DagError> {
        let read_txn = self.db.begin_read().map_err(|e| DagError::Backend(e.to_string()))?;
        let table = read_txn
            .open_multimap_table(CHILDREN)
            .map_err(|e| DagError::Backend(e.to_string()))?;
        let mut out = Vec::new();
        let mut iter = table.get(hash.as_slice()).map_err(|e| DagError::Backend(e.to_string()))?;
        while let Some(entry) = iter.next() {
            let entry = entry.map_err(|e| DagError::Backend(e.to_string()))?;
            if let Ok(child) = <[u8; 32]>::try_from(entry.value()) {
                out.push(child);
            }
        }
        out.sort();
        Ok(out)
    }

    /// Streams the requested DAG in deterministic parents-before-children
    /// (BFS) order, per spec §4.9. `label_filter` restricts traversal to
    /// leaves whose `additional_data` matches exactly when set; children are
    /// still discovered via the full tree so a labeled subtree is reachable.
    pub fn download(
        &self,
        root_hash: [u8; 32],
        label_filter: Option<&[u8]>,
    ) -> Result<Vec<DagLeaf>, DagError> {
        let root = self.get_leaf(&root_hash)?.ok_or(DagError::RootNotFound)?;
        let mut out = Vec::new();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(root);
        while let Some(leaf) = queue.pop_front() {
            let children = self.children_of(&leaf.hash)?;
            let matches = label_filter.map(|l| leaf.additional_data == l).unwrap_or(true);
            if matches {
                out.push(leaf.clone());
            }
            for child_hash in children {
                if let Some(child) = self.get_leaf(&child_hash)? {
                    queue.push_back(child);
                }
            }
        }
        Ok(out)
    }

    /// Deletes every leaf belonging to `root_hash`. Invoked by C6's kind-5
    /// handler when a tombstone's `["d", name]` descriptor names a tag whose
    /// referenced events carried DAG roots (spec §4.6).
    pub fn delete_root(&self, root_hash: [u8; 32]) -> Result<(), DagError> {
        let write_txn = self.db.begin_write().map_err(|e| DagError::Backend(e.to_string()))?;
        {
            let mut leaves_table = write_txn.open_table(LEAVES).map_err(|e| DagError::Backend(e.to_string()))?;
            let mut root_members = write_txn
                .open_multimap_table(ROOT_MEMBERS)
                .map_err(|e| DagError::Backend(e.to_string()))?;
            let mut members = Vec::new();
            let mut iter = root_members
                .get(root_hash.as_slice())
                .map_err(|e| DagError::Backend(e.to_string()))?;
            while let Some(entry) = iter.next() {
                let entry = entry.map_err(|e| DagError::Backend(e.to_string()))?;
                if let Ok(hash) = <[u8; 32]>::try_from(entry.value()) {
                    members.push(hash);
                }
            }
            drop(iter);
            for hash in &members {
                leaves_table
                    .remove(hash.as_slice())
                    .map_err(|e| DagError::Backend(e.to_string()))?;
            }
            root_members
                .remove_all(root_hash.as_slice())
                .map_err(|e| DagError::Backend(e.to_string()))?;
        }
        write_txn.commit().map_err(|e| DagError::Backend(e.to_string()))?;
        Ok(())
    }
}

fn encode_leaf(leaf: &DagLeaf) -> Vec<u8> {
    let mut out = Vec::new();
    match leaf.parent_hash {
        Some(parent) => {
            out.push(1);
            out.extend_from_slice(&parent);
        }
        None => out.push(0),
    }
    out.extend_from_slice(&(leaf.additional_data.len() as u64).to_le_bytes());
    out.extend_from_slice(&leaf.additional_data);
    out.extend_from_slice(&leaf.payload);
    out
}

fn decode_leaf(bytes: &[u8]) -> Result<DagLeaf, DagError> {
    let mut cursor = 0usize;
    let has_parent = *bytes.get(cursor).ok_or_else(|| DagError::Backend("truncated leaf".into()))?;
    cursor += 1;
    let parent_hash = if has_parent == 1 {
        let slice = bytes
            .get(cursor..cursor + 32)
            .ok_or_else(|| DagError::Backend("truncated leaf parent".into()))?;
        cursor += 32;
        Some(<[u8; 32]>::try_from(slice).map_err(|_| DagError::Backend("bad parent hash".into()))?)
    } else {
        None
    };
    let len_slice = bytes
        .get(cursor..cursor + 8)
        .ok_or_else(|| DagError::Backend("truncated leaf length".into()))?;
    let additional_len = u64::from_le_bytes(
        len_slice
            .try_into()
            .map_err(|_| DagError::Backend("bad length prefix".into()))?,
    ) as usize;
    cursor += 8;
    let additional_data = bytes
        .get(cursor..cursor + additional_len)
        .ok_or_else(|| DagError::Backend("truncated additional_data".into()))?
        .to_vec();
    cursor += additional_len;
    let payload = bytes.get(cursor..).unwrap_or(&[]).to_vec();
    let hash = DagLeaf::compute_hash(parent_hash.as_ref(), &additional_data, &payload);
    Ok(DagLeaf {
        hash,
        parent_hash,
        additional_data,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::{Keypair, Message, Secp256k1, SecretKey};

    fn sign_root(secret: &SecretKey, root_hash: [u8; 32]) -> ([u8; 32], [u8; 64]) {
        let secp = Secp256k1::new();
        let keypair = Keypair::from_secret_key(&secp, secret);
        let (xonly, _) = keypair.x_only_public_key();
        let message = Message::from_digest(root_hash);
        let sig = secp.sign_schnorr(&message, &keypair);
        (xonly.serialize(), sig.as_ref().try_into().unwrap_or([0u8; 64]))
    }

    #[test]
    fn upload_then_download_returns_parents_before_children() {
        let dir = tempfile::tempdir().unwrap();
        let store = DagStore::open(&dir.path().join("dag.redb")).unwrap();

        let root = DagLeaf::new(None, b"root".to_vec(), b"root-payload".to_vec());
        let child = DagLeaf::new(Some(root.hash), b"child".to_vec(), b"child-payload".to_vec());

        let secret = SecretKey::from_slice(&[5u8; 32]).unwrap();
        let (pubkey, sig) = sign_root(&secret, root.hash);

        store.begin_upload(root.hash, pubkey, sig).unwrap();
        store.put_leaf(root.hash, root.clone()).unwrap();
        store.put_leaf(root.hash, child.clone()).unwrap();
        let committed = store.commit(root.hash).unwrap();
        assert_eq!(committed, 2);

        let downloaded = store.download(root.hash, None).unwrap();
        assert_eq!(downloaded.len(), 2);
        assert_eq!(downloaded[0].hash, root.hash);
        assert_eq!(downloaded[1].hash, child.hash);
    }

    #[test]
    fn upload_with_bad_signature_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = DagStore::open(&dir.path().join("dag.redb")).unwrap();
        let root = DagLeaf::new(None, b"root".to_vec(), b"payload".to_vec());
        let err = store.begin_upload(root.hash, [0u8; 32], [0u8; 64]).unwrap_err();
        assert!(matches!(err, DagError::InvalidRootSignature(_)));
    }

    #[test]
    fn delete_root_removes_all_leaves() {
        let dir = tempfile::tempdir().unwrap();
        let store = DagStore::open(&dir.path().join("dag.redb")).unwrap();
        let root = DagLeaf::new(None, b"root".to_vec(), b"payload".to_vec());
        let secret = SecretKey::from_slice(&[6u8; 32]).unwrap();
        let (pubkey, sig) = sign_root(&secret, root.hash);
        store.begin_upload(root.hash, pubkey, sig).unwrap();
        store.put_leaf(root.hash, root.clone()).unwrap();
        store.commit(root.hash).unwrap();

        store.delete_root(root.hash).unwrap();
        let err = store.download(root.hash, None).unwrap_err();
        assert!(matches!(err, DagError::RootNotFound));
    }
}
