// Path: crates/services/src/query.rs
use std::collections::HashSet;
use std::sync::Arc;

use hearth_api::store::EventStore;
use hearth_crypto::event::verify_event_signature;
use hearth_filter::pipeline::ContentFilter;
use hearth_types::event::Event;
use hearth_types::filter::Filter;
use hearth_types::wire::RelayMessage;

use crate::subscription::SubscriptionManager;

/// Per-connection NIP-42-style authentication state. A transport owns one
/// of these per connection and feeds it any inbound `AUTH` event.
#[derive(Debug, Default, Clone)]
pub struct Session {
    pub authenticated_pubkey: Option<[u8; 32]>,
}

impl Session {
    /// Accepts only a kind-22242 event with a valid signature; the signer
    /// becomes the session's authenticated identity.
    pub fn authenticate(&mut self, event: &Event) -> Result<(), String> {
        if event.kind != 22242 {
            return Err("AUTH event must be kind 22242".into());
        }
        verify_event_signature(event).map_err(|e| e.to_string())?;
        self.authenticated_pubkey = Some(event.pubkey);
        Ok(())
    }
}

/// C7: the eight-step `REQ` query algorithm (spec §4.7).
pub struct QueryPipeline {
    store: Arc<dyn EventStore>,
    subscription: Arc<SubscriptionManager>,
    filter: Arc<ContentFilter>,
}

impl QueryPipeline {
    pub fn new(
        store: Arc<dyn EventStore>,
        subscription: Arc<SubscriptionManager>,
        filter: Arc<ContentFilter>,
    ) -> Self {
        QueryPipeline {
            store,
            subscription,
            filter,
        }
    }

    /// Steps 1-5 of spec §4.7, shared by `run` (`REQ`) and `count`
    /// (`COUNT`): reject a request for restricted content outright, gather
    /// and deduplicate matches across every filter, then drop anything the
    /// requester isn't allowed to see.
    async fn gather(
        &self,
        sub_id: &str,
        filters: &[Filter],
        session: &Session,
    ) -> Result<Vec<Event>, RelayMessage> {
        let requests_dms = filters
            .iter()
            .any(|f| f.kinds.as_ref().is_some_and(|kinds| kinds.contains(&4)));
        if requests_dms && session.authenticated_pubkey.is_none() {
            return Err(RelayMessage::Closed {
                sub_id: sub_id.to_string(),
                reason: "auth-required: kind 4 requires an authenticated session".into(),
            });
        }

        let mut seen: HashSet<[u8; 32]> = HashSet::new();
        let mut events = Vec::new();
        for filter in filters {
            match self.store.query(filter).await {
                Ok(matched) => {
                    for event in matched {
                        if seen.insert(event.id) {
                            events.push(event);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, sub_id, "query against event store failed");
                }
            }
        }

        events.retain(|event| self.is_visible(event, session));
        Ok(events)
    }

    pub async fn run(
        &self,
        sub_id: &str,
        filters: &[Filter],
        session: &Session,
    ) -> Vec<RelayMessage> {
        let mut events = match self.gather(sub_id, filters, session).await {
            Ok(events) => events,
            Err(closed) => return vec![closed],
        };

        let mut refreshed = Vec::with_capacity(events.len());
        for event in events {
            if event.kind == 888 {
                refreshed.push(self.subscription.refresh_if_stale(event).await);
            } else {
                refreshed.push(event);
            }
        }
        events = refreshed;

        if let Some(pubkey) = session.authenticated_pubkey {
            if let Some(instructions) = self.lookup_filter_instructions(pubkey).await {
                let (to_filter, rest): (Vec<Event>, Vec<Event>) =
                    events.into_iter().partition(|e| e.kind == 1);
                let verdicts = self.filter.filter_many(&to_filter, &instructions).await;
                let mut passing: Vec<Event> = verdicts
                    .into_iter()
                    .filter_map(|(event, verdict)| verdict.pass.then_some(event))
                    .collect();
                passing.extend(rest);
                events = passing;
            }
        }

        events.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let mut messages: Vec<RelayMessage> = events
            .into_iter()
            .map(|event| RelayMessage::Event {
                sub_id: sub_id.to_string(),
                event: Box::new(event),
            })
            .collect();
        messages.push(RelayMessage::Eose {
            sub_id: sub_id.to_string(),
        });
        messages
    }

    /// `COUNT`: the same restricted-content check, gather, dedup, and
    /// visibility filter as `run`, minus subscription refresh and content
    /// filtering (spec §6 gives `COUNT` a bare integer, not a feed to
    /// curate).
    pub async fn count(&self, sub_id: &str, filters: &[Filter], session: &Session) -> RelayMessage {
        match self.gather(sub_id, filters, session).await {
            Ok(events) => RelayMessage::Count {
                sub_id: sub_id.to_string(),
                count: events.len() as u64,
            },
            Err(closed) => closed,
        }
    }

    /// Kind 10010 is visible only to its own author (a filter preference
    /// is private to the user it governs); kind 888 is visible only to
    /// the user named in its "p" tag (the relay signs it, but the subject
    /// is not the author). Spec §4.7 step 5.
    fn is_visible(&self, event: &Event, session: &Session) -> bool {
        let Some(requester) = session.authenticated_pubkey else {
            return event.kind != 10010 && event.kind != 888;
        };
        match event.kind {
            10010 => event.pubkey == requester,
            888 => event
                .tags
                .iter()
                .find(|t| t.name() == Some("p"))
                .and_then(|t| t.get(1))
                .map(|subject_hex| hex::encode(requester) == subject_hex)
                .unwrap_or(false),
            _ => true,
        }
    }

    /// A filter preference's instructions live in `content` verbatim
    /// (spec §3); the `["enabled","true"|"false"]` tag gates whether it
    /// applies at all.
    async fn lookup_filter_instructions(&self, pubkey: [u8; 32]) -> Option<String> {
        let filter = Filter {
            kinds: Some(vec![10010]),
            authors: Some(vec![hex::encode(pubkey)]),
            limit: Some(1),
            ..Default::default()
        };
        let events = self.store.query(&filter).await.ok()?;
        let event = events.into_iter().next()?;
        let enabled = event
            .tags
            .iter()
            .find(|t| t.name() == Some("enabled"))
            .and_then(|t| t.get(1))
            .map(|v| v == "true")
            .unwrap_or(false);
        if !enabled || event.content.trim().is_empty() {
            return None;
        }
        Some(event.content.clone())
    }
}
