// Path: crates/dag/src/leaf.rs
use sha2::{Digest, Sha256};

/// A content-addressed node of a Merkle-DAG, per spec §3. `hash` is the
/// content address (`SHA-256` of `parent_hash || additional_data ||
/// payload`); `parent_hash` is `None` for a root leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DagLeaf {
    pub hash: [u8; 32],
    pub parent_hash: Option<[u8; 32]>,
    pub additional_data: Vec<u8>,
    pub payload: Vec<u8>,
}

impl DagLeaf {
    /// Builds a leaf and computes its content address. Uploaders are
    /// expected to have computed the same hash client-side; `commit`
    /// recomputes it server-side rather than trusting a claimed hash.
    pub fn new(parent_hash: Option<[u8; 32]>, additional_data: Vec<u8>, payload: Vec<u8>) -> Self {
        let hash = Self::compute_hash(parent_hash.as_ref(), &additional_data, &payload);
        DagLeaf {
            hash,
            parent_hash,
            additional_data,
            payload,
        }
    }

    pub fn compute_hash(parent_hash: Option<&[u8; 32]>, additional_data: &[u8], payload: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        if let Some(parent) = parent_hash {
            hasher.update(parent);
        }
        hasher.update(additional_data);
        hasher.update(payload);
        hasher.finalize().into()
    }

    pub fn is_root(&self) -> bool {
        self.parent_hash.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_over_same_inputs() {
        let a = DagLeaf::new(None, vec![1, 2], vec![3, 4]);
        let b = DagLeaf::new(None, vec![1, 2], vec![3, 4]);
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn different_parent_changes_hash() {
        let a = DagLeaf::new(None, vec![1], vec![2]);
        let b = DagLeaf::new(Some([9u8; 32]), vec![1], vec![2]);
        assert_ne!(a.hash, b.hash);
    }
}
