// Path: crates/types/src/filter.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A Nostr filter object constraining a `query`. A candidate event matches a
/// filter iff it matches every present constraint (conjunction across
/// fields); within a field the constraint is a disjunction ("any of").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub ids: Option<Vec<String>>,
    pub authors: Option<Vec<String>>,
    pub kinds: Option<Vec<u64>>,
    /// Tag constraints, keyed by tag name without the leading `#`
    /// (`{"e": ["id1"]}` in Rust is the `"#e"` JSON key per NIP-01; the
    /// leading `#` is stripped/added by the manual (de)serialization below).
    pub tags: HashMap<String, Vec<String>>,
    pub since: Option<i64>,
    pub until: Option<i64>,
    pub limit: Option<usize>,
}

impl Serialize for Filter {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(None)?;
        if let Some(ids) = &self.ids {
            map.serialize_entry("ids", ids)?;
        }
        if let Some(authors) = &self.authors {
            map.serialize_entry("authors", authors)?;
        }
        if let Some(kinds) = &self.kinds {
            map.serialize_entry("kinds", kinds)?;
        }
        for (name, values) in &self.tags {
            map.serialize_entry(&format!("#{name}"), values)?;
        }
        if let Some(since) = self.since {
            map.serialize_entry("since", &since)?;
        }
        if let Some(until) = self.until {
            map.serialize_entry("until", &until)?;
        }
        if let Some(limit) = self.limit {
            map.serialize_entry("limit", &limit)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = serde_json::Map::<String, Value>::deserialize(deserializer)?;
        let mut filter = Filter::default();
        for (key, value) in raw {
            match key.as_str() {
                "ids" => filter.ids = serde_json::from_value(value).ok(),
                "authors" => filter.authors = serde_json::from_value(value).ok(),
                "kinds" => filter.kinds = serde_json::from_value(value).ok(),
                "since" => filter.since = value.as_i64(),
                "until" => filter.until = value.as_i64(),
                "limit" => filter.limit = value.as_u64().map(|v| v as usize),
                other if other.starts_with('#') => {
                    if let Ok(values) = serde_json::from_value::<Vec<String>>(value) {
                        filter.tags.insert(other.trim_start_matches('#').to_string(), values);
                    }
                }
                _ => {}
            }
        }
        Ok(filter)
    }
}

impl Filter {
    pub fn matches(&self, event: &super::event::Event) -> bool {
        if let Some(ids) = &self.ids {
            let hex_id = hex::encode(event.id);
            if !ids.iter().any(|i| i == &hex_id) {
                return false;
            }
        }
        if let Some(authors) = &self.authors {
            let hex_pubkey = hex::encode(event.pubkey);
            if !authors.iter().any(|a| a == &hex_pubkey) {
                return false;
            }
        }
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&event.kind) {
                return false;
            }
        }
        for (tag_name, allowed_values) in &self.tags {
            let has_match = event.tags.iter().any(|t| {
                t.name() == Some(tag_name.as_str())
                    && t.get(1)
                        .map(|v| allowed_values.iter().any(|a| a == v))
                        .unwrap_or(false)
            });
            if !has_match {
                return false;
            }
        }
        if let Some(since) = self.since {
            if event.created_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if event.created_at > until {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, Tag};

    fn sample_event(id: u8, kind: u64, created_at: i64, tags: Vec<Tag>) -> Event {
        Event {
            id: [id; 32],
            pubkey: [1u8; 32],
            created_at,
            kind,
            tags,
            content: String::new(),
            sig: [0u8; 64],
        }
    }

    #[test]
    fn kind_filter_is_disjunctive() {
        let filter = Filter {
            kinds: Some(vec![1, 3]),
            ..Default::default()
        };
        assert!(filter.matches(&sample_event(1, 1, 0, vec![])));
        assert!(!filter.matches(&sample_event(1, 7, 0, vec![])));
    }

    #[test]
    fn tag_and_kind_are_conjunctive() {
        let mut tags = HashMap::new();
        tags.insert("r".to_string(), vec!["P:repoA".to_string()]);
        let filter = Filter {
            kinds: Some(vec![1]),
            tags,
            ..Default::default()
        };
        let event = sample_event(1, 1, 0, vec![Tag::new(["r", "P:repoA"])]);
        assert!(filter.matches(&event));
        let wrong_kind = sample_event(1, 7, 0, vec![Tag::new(["r", "P:repoA"])]);
        assert!(!filter.matches(&wrong_kind));
    }

    #[test]
    fn since_until_bound_created_at() {
        let filter = Filter {
            since: Some(100),
            until: Some(200),
            ..Default::default()
        };
        assert!(filter.matches(&sample_event(1, 1, 150, vec![])));
        assert!(!filter.matches(&sample_event(1, 1, 50, vec![])));
        assert!(!filter.matches(&sample_event(1, 1, 250, vec![])));
    }
}
