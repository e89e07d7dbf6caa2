// Path: crates/types/src/event.rs
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TypesError;

/// An ordered sequence of strings attached to an event; the first element is
/// the tag name (e.g. `["e", "<id>"]`, `["c", "r", "P:repoA"]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(pub Vec<String>);

impl Tag {
    pub fn name(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Tag(parts.into_iter().map(Into::into).collect())
    }
}

/// A signed Nostr event. `id`, `pubkey`, and `sig` are fixed-size byte arrays
/// internally (cheap comparison/indexing) but serialize to lower-hex strings
/// on the wire, matching the Nostr JSON shape exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: [u8; 32],
    pub pubkey: [u8; 32],
    pub created_at: i64,
    pub kind: u64,
    pub tags: Vec<Tag>,
    pub content: String,
    pub sig: [u8; 64],
}

impl Event {
    /// The minified JSON array `[0, pubkey, created_at, kind, tags, content]`
    /// prescribed by the Nostr protocol for event-id computation. Hashing
    /// this (SHA-256) yields `id`; `hearth-crypto` owns the hashing step,
    /// this crate only owns the byte-exact serialization.
    pub fn canonical_payload(&self) -> Vec<u8> {
        let tags: Vec<Vec<&str>> = self
            .tags
            .iter()
            .map(|t| t.0.iter().map(String::as_str).collect())
            .collect();
        let value = serde_json::json!([
            0,
            hex::encode(self.pubkey),
            self.created_at,
            self.kind,
            tags,
            self.content,
        ]);
        // serde_json's default Display/to_string omits insignificant
        // whitespace already; no separate "minify" step is needed.
        value.to_string().into_bytes()
    }
}

/// Wire representation: all identifiers are lower-hex strings, matching what
/// a transport reads/writes as JSON.
#[derive(Debug, Serialize, Deserialize)]
struct EventWire {
    id: String,
    pubkey: String,
    created_at: i64,
    kind: u64,
    tags: Vec<Tag>,
    content: String,
    sig: String,
}

fn decode_fixed<const N: usize>(field: &str, s: &str) -> Result<[u8; N], TypesError> {
    let bytes = hex::decode(s)
        .map_err(|e| TypesError::InvalidSignatureEncoding(format!("{field}: {e}")))?;
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| {
            TypesError::InvalidSignatureEncoding(format!(
                "{field}: expected {N} bytes, got {}",
                v.len()
            ))
        })
}

impl Serialize for Event {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        EventWire {
            id: hex::encode(self.id),
            pubkey: hex::encode(self.pubkey),
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags.clone(),
            content: self.content.clone(),
            sig: hex::encode(self.sig),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let wire = EventWire::deserialize(deserializer)?;
        let id = decode_fixed::<32>("id", &wire.id).map_err(serde::de::Error::custom)?;
        let pubkey =
            decode_fixed::<32>("pubkey", &wire.pubkey).map_err(serde::de::Error::custom)?;
        let sig = decode_fixed::<64>("sig", &wire.sig).map_err(serde::de::Error::custom)?;
        Ok(Event {
            id,
            pubkey,
            created_at: wire.created_at,
            kind: wire.kind,
            tags: wire.tags,
            content: wire.content,
            sig,
        })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event(id={}, kind={})", hex::encode(self.id), self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_payload_matches_nip01_shape() {
        let event = Event {
            id: [0u8; 32],
            pubkey: [1u8; 32],
            created_at: 1700000000,
            kind: 1,
            tags: vec![Tag::new(["e", "abc"])],
            content: "hello".into(),
            sig: [0u8; 64],
        };
        let payload = String::from_utf8(event.canonical_payload()).unwrap();
        assert!(payload.starts_with("[0,\""));
        assert!(payload.contains("\"hello\""));
        assert!(!payload.contains(' '));
    }

    #[test]
    fn wire_roundtrip_preserves_bytes() {
        let event = Event {
            id: [7u8; 32],
            pubkey: [9u8; 32],
            created_at: 42,
            kind: 0,
            tags: vec![],
            content: "{}".into(),
            sig: [3u8; 64],
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
