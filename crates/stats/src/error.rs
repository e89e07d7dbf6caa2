// Path: crates/stats/src/error.rs
use hearth_types::error::ErrorCode;

#[derive(thiserror::Error, Debug)]
pub enum StatsError {
    #[error("row not found")]
    NotFound,

    #[error("no available addresses")]
    NoAddresses,

    #[error("transient lock contention: {0}")]
    Transient(String),

    #[error("database backend error: {0}")]
    Backend(String),

    #[error("migration error: {0}")]
    Migration(String),
}

impl ErrorCode for StatsError {
    fn code(&self) -> &'static str {
        match self {
            StatsError::NotFound => "STATS_NOT_FOUND",
            StatsError::NoAddresses => "STATS_NO_ADDRESSES",
            StatsError::Transient(_) => "STATS_TRANSIENT",
            StatsError::Backend(_) => "STATS_BACKEND",
            StatsError::Migration(_) => "STATS_MIGRATION",
        }
    }
}

impl From<diesel::result::Error> for StatsError {
    fn from(e: diesel::result::Error) -> Self {
        if let diesel::result::Error::DatabaseError(kind, ref info) = e {
            let message = info.message();
            let is_lock_contention = matches!(kind, diesel::result::DatabaseErrorKind::SerializationFailure)
                || message.contains("database is locked")
                || message.contains("database table is locked");
            if is_lock_contention {
                return StatsError::Transient(message.to_string());
            }
        }
        match e {
            diesel::result::Error::NotFound => StatsError::NotFound,
            other => StatsError::Backend(other.to_string()),
        }
    }
}
