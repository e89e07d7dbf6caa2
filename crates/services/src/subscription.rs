// Path: crates/services/src/subscription.rs
use std::collections::HashMap;
use std::sync::Arc;

use hearth_api::store::EventStore;
use hearth_crypto::relay_key::RelayKeypair;
use hearth_stats::store::StatsStore;
use hearth_types::access::Tier;
use hearth_types::event::{Event, Tag};
use hearth_types::filter::Filter;

use crate::access::AccessController;
use crate::error::ServicesError;

/// C5: maintains the kind-888 subscription event the relay signs on behalf
/// of each subscriber, deriving its content from the statistics ledger
/// rather than trusting any client-supplied value.
pub struct SubscriptionManager {
    relay_keypair: Arc<RelayKeypair>,
    stats: Arc<StatsStore>,
    store: Arc<dyn EventStore>,
    access: Arc<AccessController>,
    tiers: Vec<Tier>,
}

impl SubscriptionManager {
    pub fn new(
        relay_keypair: Arc<RelayKeypair>,
        stats: Arc<StatsStore>,
        store: Arc<dyn EventStore>,
        access: Arc<AccessController>,
        tiers: Vec<Tier>,
    ) -> Self {
        SubscriptionManager {
            relay_keypair,
            stats,
            store,
            access,
            tiers,
        }
    }

    fn tier_price(&self, tier_name: &str) -> u64 {
        self.tiers
            .iter()
            .find(|t| t.name == tier_name)
            .map(|t| t.price_sats)
            .unwrap_or(0)
    }

    async fn derive_content(&self, pubkey_hex: &str) -> Result<(String, i64), ServicesError> {
        let row = self.stats.get_paid_subscriber(pubkey_hex).await?;
        let usage = self.stats.stats_by_author(pubkey_hex).await?;
        let content = serde_json::json!({
            "tier": row.tier_name,
            "expiration": row.expiration_ts,
            "price_sats": self.tier_price(&row.tier_name),
            "bytes_used": usage.total_bytes,
        })
        .to_string();
        Ok((content, row.expiration_ts))
    }

    /// Replaces the subscriber's kind-888 event with a freshly relay-signed
    /// one: delete-then-insert, since `EventStore` exposes no multi-op
    /// transaction primitive to make this atomic.
    pub async fn upsert_subscription_event(&self, pubkey: [u8; 32]) -> Result<Event, ServicesError> {
        let pubkey_hex = hex::encode(pubkey);
        let (content, _expiration_ts) = self.derive_content(&pubkey_hex).await?;

        let existing = self
            .store
            .query(&Filter {
                kinds: Some(vec![888]),
                tags: HashMap::from([("p".to_string(), vec![pubkey_hex.clone()])]),
                ..Default::default()
            })
            .await?;
        for old in &existing {
            self.store.delete(old.id).await?;
        }

        let unsigned = Event {
            id: [0u8; 32],
            pubkey: [0u8; 32],
            created_at: now_unix(),
            kind: 888,
            tags: vec![Tag::new(["p", pubkey_hex.as_str()])],
            content,
            sig: [0u8; 64],
        };
        let signed = self.relay_keypair.sign(unsigned);
        self.store.put(signed.clone()).await?;
        Ok(signed)
    }

    /// Re-derives `event`'s content against the current ledger and, if it
    /// has drifted, issues a fresh signed replacement. Fails soft: any
    /// error along the way just returns the event unchanged, since a stale
    /// read is far less harmful than failing the query that asked for it.
    pub async fn refresh_if_stale(&self, event: Event) -> Event {
        let Some(subject_hex) = event
            .tags
            .iter()
            .find(|t| t.name() == Some("p"))
            .and_then(|t| t.get(1))
        else {
            return event;
        };

        let fresh = match self.derive_content(subject_hex).await {
            Ok((content, _)) => content,
            Err(_) => return event,
        };
        if fresh == event.content {
            return event;
        }

        let Ok(subject_hex_bytes) = hex::decode(subject_hex) else {
            return event;
        };
        let Ok(subject) = <[u8; 32]>::try_from(subject_hex_bytes.as_slice()) else {
            return event;
        };
        self.upsert_subscription_event(subject).await.unwrap_or(event)
    }

    /// Records an observed payment, invalidates cached access decisions (a
    /// newly-paid subscriber must be let in on the very next check), and
    /// republishes the subscriber's kind-888 event.
    pub async fn on_payment_observed(
        &self,
        pubkey: [u8; 32],
        tier_name: &str,
        expiration_ts: i64,
        address: Option<&str>,
    ) -> Result<Event, ServicesError> {
        let pubkey_hex = hex::encode(pubkey);
        self.stats
            .upsert_paid_subscriber(&pubkey_hex, tier_name, expiration_ts, address)
            .await?;
        self.stats
            .insert_payment_notification(&pubkey_hex, self.tier_price(tier_name) as i64, tier_name, now_unix())
            .await?;
        self.access.invalidate_cache();
        self.upsert_subscription_event(pubkey).await
    }
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
