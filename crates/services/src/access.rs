// Path: crates/services/src/access.rs
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use hearth_crypto::pubkey::canonicalize;
use hearth_stats::store::StatsStore;
use hearth_types::access::{AccessSettings, Scope, Tier};

use crate::error::ServicesError;

/// Which side of the relay a permission check concerns. `Scope` names the
/// *policy* (only-me/allowed/paid/all); `Direction` names which allow-list
/// table applies, since the same scope value gates either `read` or
/// `write` depending on which field of `AccessSettings` it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Read,
    Write,
}

#[derive(Clone)]
struct CacheEntry {
    decision: Result<(), String>,
    cached_at: Instant,
}

/// C4: evaluates the permission algorithm of spec §4.4 against the
/// currently normalized `AccessSettings`, caching decisions keyed
/// `(direction, pubkey)` behind a flat TTL. Any settings, allow-list, or
/// payment mutation invalidates the whole cache rather than a single
/// entry -- a stale "allowed" decision is worse than one extra database
/// round trip.
pub struct AccessController {
    stats: Arc<StatsStore>,
    settings: RwLock<AccessSettings>,
    owner_pubkey_config: Option<[u8; 32]>,
    tiers: Vec<Tier>,
    cache: DashMap<(Direction, [u8; 32]), CacheEntry>,
    cache_ttl: Duration,
}

impl AccessController {
    pub fn new(
        stats: Arc<StatsStore>,
        initial_settings: AccessSettings,
        owner_pubkey_config: Option<[u8; 32]>,
        tiers: Vec<Tier>,
        cache_ttl: Duration,
    ) -> Self {
        AccessController {
            stats,
            settings: RwLock::new(initial_settings),
            owner_pubkey_config,
            tiers,
            cache: DashMap::new(),
            cache_ttl,
        }
    }

    pub fn settings(&self) -> AccessSettings {
        *self.settings.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Replaces the active settings and invalidates every cached decision.
    pub fn update_settings(&self, settings: AccessSettings) {
        *self.settings.write().unwrap_or_else(|e| e.into_inner()) = settings;
        self.invalidate_cache();
    }

    pub fn invalidate_cache(&self) {
        self.cache.clear();
    }

    pub async fn can_read(&self, pubkey: &str) -> Result<(), ServicesError> {
        let scope = self.settings().read;
        self.is_allowed(Direction::Read, scope, pubkey).await
    }

    pub async fn can_write(&self, pubkey: &str) -> Result<(), ServicesError> {
        let scope = self.settings().write;
        self.is_allowed(Direction::Write, scope, pubkey).await
    }

    /// The six-step algorithm of spec §4.4: `all_users` bypass,
    /// canonicalization, cache check, owner fast-allow, allow-list / paid-
    /// tier lookup, and cache store.
    async fn is_allowed(
        &self,
        direction: Direction,
        scope: Scope,
        pubkey: &str,
    ) -> Result<(), ServicesError> {
        if scope == Scope::AllUsers {
            return Ok(());
        }

        let canon =
            canonicalize(pubkey).map_err(|e| ServicesError::InvalidPublicKey(e.to_string()))?;

        let cache_key = (direction, canon);
        if let Some(entry) = self.cache.get(&cache_key) {
            if entry.cached_at.elapsed() < self.cache_ttl {
                return entry.decision.clone().map_err(ServicesError::NotAllowed);
            }
        }

        let decision = self.evaluate(direction, scope, &canon).await;
        self.cache.insert(
            cache_key,
            CacheEntry {
                decision: decision.clone(),
                cached_at: Instant::now(),
            },
        );
        decision.map_err(ServicesError::NotAllowed)
    }

    async fn evaluate(
        &self,
        direction: Direction,
        scope: Scope,
        canon: &[u8; 32],
    ) -> Result<(), String> {
        let pubkey_hex = hex::encode(canon);

        let is_owner = self
            .stats
            .get_relay_owner()
            .await
            .map(|row| row.pubkey == pubkey_hex)
            .unwrap_or(false)
            || self.owner_pubkey_config == Some(*canon);
        if is_owner {
            return Ok(());
        }

        match scope {
            Scope::AllUsers => Ok(()),
            // Only the owner passes an only-me scope; there is no
            // allow-list fallback to consult.
            Scope::OnlyMe => Err("relay is in only-me mode".into()),
            Scope::AllowedUsers => {
                let allowed = match direction {
                    Direction::Read => self.stats.is_allowed_read(&pubkey_hex).await,
                    Direction::Write => self.stats.is_allowed_write(&pubkey_hex).await,
                }
                .unwrap_or(false);
                if allowed {
                    Ok(())
                } else {
                    Err("pubkey is not on the allow-list".into())
                }
            }
            Scope::PaidUsers => {
                let row = self
                    .stats
                    .get_paid_subscriber(&pubkey_hex)
                    .await
                    .map_err(|_| "no paid subscription on file".to_string())?;
                if row.expiration_ts <= now_unix() {
                    return Err("paid subscription has expired".into());
                }
                let Some(tier) = self.tiers.iter().find(|t| t.name == row.tier_name) else {
                    return Err("subscription tier is not configured".into());
                };
                if !tier.is_paid() {
                    return Err("subscription tier is free".into());
                }
                Ok(())
            }
        }
    }
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_types::access::AccessMode;

    fn settings(mode: AccessMode, read: Scope, write: Scope) -> AccessSettings {
        AccessSettings::normalize(mode, read, write)
    }

    #[tokio::test]
    async fn all_users_scope_bypasses_everything() {
        let stats = Arc::new(StatsStore::open_in_memory().unwrap());
        let ctrl = AccessController::new(
            stats,
            settings(AccessMode::Public, Scope::AllUsers, Scope::AllUsers),
            None,
            vec![],
            Duration::from_secs(30),
        );
        assert!(ctrl.can_read("not-even-valid-hex").await.is_ok());
    }

    #[tokio::test]
    async fn owner_passes_only_me_scope() {
        let stats = Arc::new(StatsStore::open_in_memory().unwrap());
        let owner = [0x11u8; 32];
        stats.set_relay_owner(&hex::encode(owner)).await.unwrap();
        let ctrl = AccessController::new(
            stats,
            settings(AccessMode::OnlyMe, Scope::OnlyMe, Scope::OnlyMe),
            None,
            vec![],
            Duration::from_secs(30),
        );
        assert!(ctrl.can_read(&hex::encode(owner)).await.is_ok());
        assert!(ctrl.can_read(&hex::encode([0x22u8; 32])).await.is_err());
    }

    #[tokio::test]
    async fn allowed_users_scope_consults_the_allow_list() {
        let stats = Arc::new(StatsStore::open_in_memory().unwrap());
        let allowed = [0x33u8; 32];
        stats
            .add_allowed_read(&hex::encode(allowed), None, "admin", 0)
            .await
            .unwrap();
        let ctrl = AccessController::new(
            stats,
            settings(AccessMode::InviteOnly, Scope::AllowedUsers, Scope::AllowedUsers),
            None,
            vec![],
            Duration::from_secs(30),
        );
        assert!(ctrl.can_read(&hex::encode(allowed)).await.is_ok());
        assert!(ctrl.can_read(&hex::encode([0x44u8; 32])).await.is_err());
    }

    #[tokio::test]
    async fn paid_users_scope_rejects_free_tier() {
        let stats = Arc::new(StatsStore::open_in_memory().unwrap());
        let subscriber = [0x55u8; 32];
        stats
            .upsert_paid_subscriber(&hex::encode(subscriber), "free", 9_999_999_999, None)
            .await
            .unwrap();
        let ctrl = AccessController::new(
            stats,
            settings(AccessMode::Subscription, Scope::PaidUsers, Scope::PaidUsers),
            None,
            vec![Tier {
                name: "free".into(),
                monthly_limit_bytes: 1000,
                price_sats: 0,
            }],
            Duration::from_secs(30),
        );
        assert!(ctrl.can_read(&hex::encode(subscriber)).await.is_err());
    }

    #[tokio::test]
    async fn settings_update_invalidates_cache() {
        let stats = Arc::new(StatsStore::open_in_memory().unwrap());
        let ctrl = AccessController::new(
            stats,
            settings(AccessMode::Public, Scope::AllUsers, Scope::AllUsers),
            None,
            vec![],
            Duration::from_secs(30),
        );
        let pubkey = hex::encode([0x66u8; 32]);
        assert!(ctrl.can_read(&pubkey).await.is_ok());
        ctrl.update_settings(settings(AccessMode::OnlyMe, Scope::OnlyMe, Scope::OnlyMe));
        assert!(ctrl.can_read(&pubkey).await.is_err());
    }
}
