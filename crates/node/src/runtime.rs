// Path: crates/node/src/runtime.rs
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use hearth_api::store::EventStore;
use hearth_crypto::relay_key::RelayKeypair;
use hearth_dag::store::DagStore;
use hearth_filter::http_runtime::HttpContentFilterRuntime;
use hearth_filter::pipeline::ContentFilter;
use hearth_filter::purge::spawn_purge_task;
use hearth_services::access::AccessController;
use hearth_services::dispatch::Dispatcher;
use hearth_services::query::{QueryPipeline, Session};
use hearth_services::subscription::SubscriptionManager;
use hearth_stats::store::StatsStore;
use hearth_store::RedbEventStore;
use hearth_types::access::{AccessMode, AccessSettings, Scope};
use hearth_types::config::RelayConfig;
use hearth_types::wire::{ClientMessage, RelayMessage};

/// The complete DI graph of spec §9: statistics store first, then the
/// access controller (needs stats), then the subscription manager (needs
/// the relay key, stats, the event store, and access), then the dispatcher
/// (C6) and query pipeline (C7), each depending only on what was built
/// before it. No component holds a reference to anything built after it —
/// the cyclic store/subscription/access reference the teacher's source
/// exhibited (spec §9) is broken by this ordering.
pub struct Runtime {
    pub config: RelayConfig,
    pub relay_keypair: Arc<RelayKeypair>,
    pub store: Arc<dyn EventStore>,
    pub stats: Arc<StatsStore>,
    pub dag: Arc<DagStore>,
    pub access: Arc<AccessController>,
    pub subscription: Arc<SubscriptionManager>,
    pub dispatcher: Arc<Dispatcher>,
    pub filter: Arc<ContentFilter>,
    pub query: Arc<QueryPipeline>,
}

fn parse_access_mode(mode: AccessMode, read: Scope, write: Scope) -> AccessSettings {
    AccessSettings::normalize(mode, read, write)
}

impl Runtime {
    /// Builds every component from a loaded [`RelayConfig`]. Opens the
    /// event store, DAG store, and statistics database at the configured
    /// paths (creating parent directories as needed), loads or generates
    /// the relay's signing key, and wires C4 through C8 in the order spec
    /// §9 prescribes.
    pub fn bootstrap(config: RelayConfig) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(&config.event_store_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        if let Some(parent) = Path::new(&config.stats_db_path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let relay_keypair = Arc::new(match &config.relay.private_key {
            Some(hex_secret) => RelayKeypair::from_hex_secret(hex_secret)?,
            None => {
                tracing::warn!("relay.private_key not configured; generating an ephemeral key");
                RelayKeypair::generate()
            }
        });

        let store: Arc<dyn EventStore> =
            Arc::new(RedbEventStore::open(Path::new(&config.event_store_path))?);
        let stats = Arc::new(StatsStore::open(&config.stats_db_path)?);
        let dag_path = Path::new(&config.event_store_path).with_extension("dag.redb");
        let dag = Arc::new(DagStore::open(&dag_path)?);

        let owner_pubkey_config = config
            .relay
            .public_key
            .as_deref()
            .and_then(|hex_key| hearth_crypto::pubkey::canonicalize(hex_key).ok());
        let tiers = config.allowed_users.tiers.clone();
        let settings = parse_access_mode(
            config.allowed_users.mode,
            config.allowed_users.read,
            config.allowed_users.write,
        );
        let access = Arc::new(AccessController::new(
            stats.clone(),
            settings,
            owner_pubkey_config,
            tiers.clone(),
            Duration::from_secs(config.access_cache_ttl_secs),
        ));

        let subscription = Arc::new(SubscriptionManager::new(
            relay_keypair.clone(),
            stats.clone(),
            store.clone(),
            access.clone(),
            tiers,
        ));

        let accountable_kinds: Vec<i64> = config
            .event_filtering
            .kind_whitelist
            .iter()
            .filter_map(|s| s.parse::<i64>().ok())
            .collect();
        let dispatcher = Arc::new(Dispatcher::new(
            store.clone(),
            stats.clone(),
            access.clone(),
            dag.clone(),
            accountable_kinds,
            config.past_skew_secs,
            config.future_skew_secs,
        ));

        let filter_runtime = Arc::new(HttpContentFilterRuntime::new(
            config.content_filter.ollama_url.clone(),
            config.content_filter.ollama_model.clone(),
            config.content_filter.api_key.clone(),
        ));
        let filter = Arc::new(ContentFilter::new(filter_runtime, &config.content_filter));
        spawn_purge_task(filter.clone(), Duration::from_secs(60));

        let query = Arc::new(QueryPipeline::new(
            store.clone(),
            subscription.clone(),
            filter.clone(),
        ));

        Ok(Runtime {
            config,
            relay_keypair,
            store,
            stats,
            dag,
            access,
            subscription,
            dispatcher,
            filter,
            query,
        })
    }

    /// The single entrypoint an external transport calls with one framed
    /// inbound message (spec §6); returns every framed outbound message the
    /// transport should write back, in order. `AUTH` mutates `session` in
    /// place and produces no wire reply of its own (NIP-42 doesn't define
    /// one beyond the initial challenge, which is the transport's concern).
    pub async fn handle_client_message(
        &self,
        raw: &str,
        session: &mut Session,
    ) -> Vec<RelayMessage> {
        let message = match ClientMessage::parse(raw) {
            Ok(m) => m,
            Err(e) => {
                return vec![RelayMessage::Notice {
                    message: format!("invalid: {e}"),
                }]
            }
        };

        match message {
            ClientMessage::Event(event) => {
                let now = now_unix();
                vec![self.dispatcher.handle_event(*event, now).await]
            }
            ClientMessage::Req { sub_id, filters } => self.query.run(&sub_id, &filters, session).await,
            ClientMessage::Close { sub_id } => {
                tracing::debug!(sub_id, "subscription closed by client");
                vec![]
            }
            ClientMessage::Count { sub_id, filters } => {
                vec![self.query.count(&sub_id, &filters, session).await]
            }
            ClientMessage::Auth(event) => match session.authenticate(&event) {
                Ok(()) => vec![],
                Err(reason) => vec![RelayMessage::Notice {
                    message: format!("restricted: {reason}"),
                }],
            },
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
    use hearth_types::config::{
        AllowedUsersSection, ContentFilterSection, EventFilteringSection, FilteringMode,
        RelaySection, ServerSection,
    };

    fn test_config(dir: &std::path::Path) -> RelayConfig {
        RelayConfig {
            relay: RelaySection {
                private_key: None,
                public_key: None,
                dht_key: None,
                name: "test-relay".into(),
                version: "0.1.0".into(),
                supported_nips: vec![1],
            },
            event_filtering: EventFilteringSection {
                mode: FilteringMode::Whitelist,
                kind_whitelist: vec!["0".into(), "1".into()],
            },
            allowed_users: AllowedUsersSection {
                mode: AccessMode::Public,
                read: Scope::AllUsers,
                write: Scope::AllUsers,
                tiers: vec![],
            },
            content_filter: ContentFilterSection {
                enabled: false,
                ollama_url: "http://localhost:11434/api/generate".into(),
                ollama_model: "llama3".into(),
                ollama_timeout_ms: 5000,
                cache_size: 100,
                cache_ttl_minutes: 60,
                filter_kinds: vec![1],
                batch_threshold: 10,
                concurrency_limit: 4,
                api_key: None,
            },
            server: ServerSection {
                port: 8080,
                web: false,
                upnp: false,
                demo: false,
            },
            event_store_path: dir.join("events.redb").to_string_lossy().to_string(),
            stats_db_path: dir.join("stats.sqlite3").to_string_lossy().to_string(),
            access_cache_ttl_secs: 30,
            past_skew_secs: 3600,
            future_skew_secs: 900,
        }
    }

    #[tokio::test]
    async fn bootstrap_wires_every_component() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Runtime::bootstrap(test_config(dir.path())).unwrap();
        let mut session = Session::default();

        let reply = runtime
            .handle_client_message(r#"["REQ","sub1",{"kinds":[1]}]"#, &mut session)
            .await;
        assert_eq!(reply.len(), 1);
        assert!(matches!(reply[0], RelayMessage::Eose { .. }));
    }

    #[tokio::test]
    async fn malformed_message_produces_notice() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Runtime::bootstrap(test_config(dir.path())).unwrap();
        let mut session = Session::default();

        let reply = runtime.handle_client_message("not json", &mut session).await;
        assert_eq!(reply.len(), 1);
        assert!(matches!(reply[0], RelayMessage::Notice { .. }));
    }
}
