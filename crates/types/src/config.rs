// Path: crates/types/src/config.rs
use serde::{Deserialize, Serialize};

use crate::access::{AccessMode, Scope, Tier};

/// `relay.*` configuration keys, per spec §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySection {
    /// Lower-hex secp256k1 secret key. May be absent, in which case
    /// `hearth-node` generates one and persists it back (see SPEC_FULL §4.1).
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub dht_key: Option<String>,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub supported_nips: Vec<u32>,
}

/// `event_filtering.*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilteringMode {
    Blacklist,
    Whitelist,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFilteringSection {
    pub mode: FilteringMode,
    #[serde(default)]
    pub kind_whitelist: Vec<String>,
}

/// `allowed_users.*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowedUsersSection {
    pub mode: AccessMode,
    pub read: Scope,
    pub write: Scope,
    #[serde(default)]
    pub tiers: Vec<Tier>,
}

/// `content_filter.*`, per spec §4.8/§6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentFilterSection {
    pub enabled: bool,
    pub ollama_url: String,
    pub ollama_model: String,
    pub ollama_timeout_ms: u64,
    pub cache_size: usize,
    pub cache_ttl_minutes: u64,
    #[serde(default)]
    pub filter_kinds: Vec<u64>,
    pub batch_threshold: usize,
    pub concurrency_limit: usize,
    /// Optional bearer token for the inference endpoint; omitted for
    /// unauthenticated local endpoints (e.g. Ollama).
    #[serde(default)]
    pub api_key: Option<String>,
}

/// `server.*`. Transport binding itself is out of scope (spec §1); these
/// fields exist purely so an external transport can read the relay's
/// published configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    pub port: u16,
    #[serde(default)]
    pub web: bool,
    #[serde(default)]
    pub upnp: bool,
    #[serde(default)]
    pub demo: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub relay: RelaySection,
    pub event_filtering: EventFilteringSection,
    pub allowed_users: AllowedUsersSection,
    pub content_filter: ContentFilterSection,
    pub server: ServerSection,
    /// Filesystem path to the embedded event/blob store (spec §6).
    pub event_store_path: String,
    /// Filesystem path to the SQLite statistics database (spec §6).
    pub stats_db_path: String,
    /// Seconds the access-controller cache retains a decision (spec §4.4,
    /// default 30).
    #[serde(default = "default_access_cache_ttl_secs")]
    pub access_cache_ttl_secs: u64,
    /// Accepted past clock skew, in seconds, for inbound event timestamps
    /// (spec §4.6, default 3600 = 1h).
    #[serde(default = "default_past_skew_secs")]
    pub past_skew_secs: i64,
    /// Accepted future clock skew, in seconds (spec §4.6, "small positive").
    #[serde(default = "default_future_skew_secs")]
    pub future_skew_secs: i64,
}

fn default_access_cache_ttl_secs() -> u64 {
    30
}

fn default_past_skew_secs() -> i64 {
    3600
}

fn default_future_skew_secs() -> i64 {
    900
}

impl RelayConfig {
    /// Reads a TOML file from `path`, then applies environment-variable
    /// overrides for fields whose dotted path names a secret, mirroring the
    /// env-var-driven selection the teacher's node binary performs for LLM
    /// endpoint credentials.
    pub fn load(path: &std::path::Path) -> Result<Self, crate::error::TypesError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| crate::error::TypesError::Config(format!("{}: {e}", path.display())))?;
        let mut config: RelayConfig = toml::from_str(&text)
            .map_err(|e| crate::error::TypesError::Config(e.to_string()))?;
        if let Ok(key) = std::env::var("RELAY_PRIVATE_KEY") {
            config.relay.private_key = Some(key);
        }
        if let Ok(key) = std::env::var("RELAY_CONTENT_FILTER_API_KEY") {
            config.content_filter.api_key = Some(key);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let toml_text = r#"
            event_store_path = "./data/events"
            stats_db_path = "./data/stats.sqlite3"

            [relay]
            name = "hearth"
            version = "0.1.0"

            [event_filtering]
            mode = "whitelist"
            kind_whitelist = ["0", "1"]

            [allowed_users]
            mode = "public"
            read = "all_users"
            write = "all_users"

            [content_filter]
            enabled = false
            ollama_url = "http://localhost:11434"
            ollama_model = "llama3"
            ollama_timeout_ms = 5000
            cache_size = 1000
            cache_ttl_minutes = 60
            batch_threshold = 10
            concurrency_limit = 4

            [server]
            port = 8080
        "#;
        let config: RelayConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(config.access_cache_ttl_secs, 30);
        assert_eq!(config.server.port, 8080);
    }
}
