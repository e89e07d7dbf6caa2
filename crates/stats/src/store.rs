// Path: crates/stats/src/store.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tokio::sync::Mutex;

use crate::error::StatsError;
use crate::retry::with_retry;
use crate::models::{
    AllowedReadRow, AllowedWriteRow, FileInfoRow, ModerationNotificationRow, NewFileInfoRow,
    NewFileTagRow, NewKindRow, PaidSubscriberRow, PaymentNotificationRow, RelayOwnerRow,
    ReportNotificationRow, UserProfileRow, WalletAddressRow,
};
use crate::schema::{
    allowed_read_npubs, allowed_write_npubs, file_infos, file_tags, kinds,
    moderation_notifications, paid_subscribers, payment_notifications, relay_owner,
    report_notifications, subscriber_addresses, user_profiles, wallet_addresses,
};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Lock-contention retry parameters for the subsystems prone to it (spec
/// §5: "up to 6-8 attempts, bases 100ms-1s").
const RETRY_ATTEMPTS: u32 = 6;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

static MEMORY_DB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One row of aggregated accounting, returned by the `stats_by_*` family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsBucket {
    pub label: String,
    pub event_count: i64,
    pub total_bytes: i64,
}

fn open_conn(path: &str) -> Result<SqliteConnection, StatsError> {
    let mut conn = SqliteConnection::establish(path)
        .map_err(|e| StatsError::Backend(e.to_string()))?;
    diesel::sql_query("PRAGMA foreign_keys = ON")
        .execute(&mut conn)
        .map_err(|e| StatsError::Backend(e.to_string()))?;
    diesel::sql_query("PRAGMA journal_mode = WAL")
        .execute(&mut conn)
        .map_err(|e| StatsError::Backend(e.to_string()))?;
    diesel::sql_query("PRAGMA temp_store = MEMORY")
        .execute(&mut conn)
        .map_err(|e| StatsError::Backend(e.to_string()))?;
    Ok(conn)
}

/// The relational statistics store (C3). Rather than one global lock, each
/// named subsystem gets its own connection behind its own `Mutex`, so a long
/// query against wallet transactions never blocks event-kind accounting.
/// Spec §5 names five subsystem locks (balance, bitcoin-rate, wallet-tx,
/// event-kind, address); control-plane tables (allowlists, admin users,
/// relay ownership, tokens, challenges, notifications) don't fit any of
/// those five, so they share a sixth `access` bucket.
pub struct StatsStore {
    balance: Mutex<SqliteConnection>,
    bitcoin_rate: Mutex<SqliteConnection>,
    wallet_tx: Mutex<SqliteConnection>,
    event_kind: Mutex<SqliteConnection>,
    address: Mutex<SqliteConnection>,
    access: Mutex<SqliteConnection>,
    /// Holds one extra connection open for the lifetime of the store when
    /// backed by a named in-memory database: SQLite drops a `:memory:`
    /// database the moment its last connection closes, so without this the
    /// six subsystem connections below would each see their own empty,
    /// unmigrated database rather than sharing one.
    _memory_keepalive: Option<SqliteConnection>,
}

impl StatsStore {
    /// Opens six connections to the same SQLite file, running pending
    /// migrations once on the first connection.
    pub fn open(path: &str) -> Result<Self, StatsError> {
        let mut first = open_conn(path)?;
        first
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StatsError::Migration(e.to_string()))?;

        Ok(StatsStore {
            balance: Mutex::new(first),
            bitcoin_rate: Mutex::new(open_conn(path)?),
            wallet_tx: Mutex::new(open_conn(path)?),
            event_kind: Mutex::new(open_conn(path)?),
            address: Mutex::new(open_conn(path)?),
            access: Mutex::new(open_conn(path)?),
            _memory_keepalive: None,
        })
    }

    /// Opens a store backed by a uniquely-named, shared-cache in-memory
    /// database (`file:<id>?mode=memory&cache=shared`) instead of a bare
    /// `:memory:` URI, so all six subsystem connections see the same
    /// database rather than six private, unmigrated ones. A dedicated
    /// connection is kept alive on the returned store to keep the database
    /// from being dropped once the six subsystem connections are all idle.
    pub fn open_in_memory() -> Result<Self, StatsError> {
        let id = MEMORY_DB_COUNTER.fetch_add(1, Ordering::Relaxed);
        let uri = format!("file:hearth_stats_mem_{id}?mode=memory&cache=shared");

        let mut keepalive = open_conn(&uri)?;
        keepalive
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StatsError::Migration(e.to_string()))?;

        Ok(StatsStore {
            balance: Mutex::new(open_conn(&uri)?),
            bitcoin_rate: Mutex::new(open_conn(&uri)?),
            wallet_tx: Mutex::new(open_conn(&uri)?),
            event_kind: Mutex::new(open_conn(&uri)?),
            address: Mutex::new(open_conn(&uri)?),
            access: Mutex::new(open_conn(&uri)?),
            _memory_keepalive: Some(keepalive),
        })
    }

    // --- kind accounting / user profiles (event_kind lock) ---

    /// Records one ingested event against the kind ledger, gated by an
    /// allow-list of accountable kinds (every kind that isn't explicitly
    /// accountable is skipped rather than rejected -- accounting is
    /// best-effort bookkeeping, not an admission check). Kind 0 additionally
    /// upserts the author's profile row, deriving `lightning_addr`/`dht_key`
    /// booleans from the metadata content.
    pub async fn record_event_kind(
        &self,
        event_id: &str,
        author: &str,
        kind: i64,
        content: &str,
        size_bytes: i64,
        created_at: i64,
        accountable_kinds: &[i64],
    ) -> Result<(), StatsError> {
        if !accountable_kinds.contains(&kind) {
            return Ok(());
        }
        let mut conn = self.event_kind.lock().await;
        let row = NewKindRow {
            event_id,
            author,
            kind,
            size_bytes,
            created_at,
        };
        diesel::insert_into(kinds::table)
            .values(&row)
            .execute(&mut *conn)?;

        if kind == 0 {
            let (lightning_addr, dht_key) = derive_profile_flags(content);
            let profile = UserProfileRow {
                pubkey: author.to_string(),
                content: content.to_string(),
                lightning_addr,
                dht_key,
                updated_at: created_at,
            };
            diesel::insert_into(user_profiles::table)
                .values(&profile)
                .on_conflict(user_profiles::pubkey)
                .do_update()
                .set(&profile)
                .execute(&mut *conn)?;
        }
        Ok(())
    }

    pub async fn get_user_profile(&self, pubkey: &str) -> Result<UserProfileRow, StatsError> {
        let mut conn = self.event_kind.lock().await;
        user_profiles::table
            .find(pubkey)
            .first(&mut *conn)
            .map_err(StatsError::from)
    }

    /// Aggregate event count and byte total for one author, grounding the
    /// "statistics by user" view.
    pub async fn stats_by_author(&self, author: &str) -> Result<StatsBucket, StatsError> {
        let mut conn = self.event_kind.lock().await;
        let (count, total): (i64, Option<i64>) = kinds::table
            .filter(kinds::author.eq(author))
            .select((
                diesel::dsl::count_star(),
                diesel::dsl::sum(kinds::size_bytes),
            ))
            .first(&mut *conn)?;
        Ok(StatsBucket {
            label: author.to_string(),
            event_count: count,
            total_bytes: total.unwrap_or(0),
        })
    }

    /// Aggregate event count and byte total for one kind, grounding the
    /// "statistics by type" view.
    pub async fn stats_by_kind(&self, kind: i64) -> Result<StatsBucket, StatsError> {
        let mut conn = self.event_kind.lock().await;
        let (count, total): (i64, Option<i64>) = kinds::table
            .filter(kinds::kind.eq(kind))
            .select((
                diesel::dsl::count_star(),
                diesel::dsl::sum(kinds::size_bytes),
            ))
            .first(&mut *conn)?;
        Ok(StatsBucket {
            label: kind.to_string(),
            event_count: count,
            total_bytes: total.unwrap_or(0),
        })
    }

    /// Aggregate event count and byte total across one UTC calendar month,
    /// given as half-open `[month_start, month_end)` Unix timestamps.
    pub async fn stats_by_month(
        &self,
        month_start: i64,
        month_end: i64,
    ) -> Result<StatsBucket, StatsError> {
        let mut conn = self.event_kind.lock().await;
        let (count, total): (i64, Option<i64>) = kinds::table
            .filter(kinds::created_at.ge(month_start))
            .filter(kinds::created_at.lt(month_end))
            .select((
                diesel::dsl::count_star(),
                diesel::dsl::sum(kinds::size_bytes),
            ))
            .first(&mut *conn)?;
        Ok(StatsBucket {
            label: format!("{month_start}-{month_end}"),
            event_count: count,
            total_bytes: total.unwrap_or(0),
        })
    }

    // --- kind-117 file attachments (event_kind lock) ---

    /// `true` if `author` has already recorded this Blossom hash -- kind-117
    /// handling rejects the duplicate upload rather than storing it twice.
    pub async fn file_info_exists(
        &self,
        author: &str,
        blossom_hash: &str,
    ) -> Result<bool, StatsError> {
        let mut conn = self.event_kind.lock().await;
        let found = file_infos::table
            .filter(file_infos::author.eq(author))
            .filter(file_infos::blossom_hash.eq(blossom_hash))
            .select(file_infos::id)
            .first::<i32>(&mut *conn)
            .optional()?;
        Ok(found.is_some())
    }

    /// Records a new file attachment row and its tags in one transaction.
    pub async fn record_file_info(
        &self,
        author: &str,
        blossom_hash: &str,
        event_id: &str,
        size_bytes: i64,
        created_at: i64,
        tags: &[(String, String)],
    ) -> Result<FileInfoRow, StatsError> {
        let mut conn = self.event_kind.lock().await;
        conn.transaction(|conn| {
            let row = NewFileInfoRow {
                author,
                blossom_hash,
                event_id,
                size_bytes,
                created_at,
            };
            diesel::insert_into(file_infos::table)
                .values(&row)
                .execute(conn)?;
            let info: FileInfoRow = file_infos::table
                .filter(file_infos::author.eq(author))
                .filter(file_infos::blossom_hash.eq(blossom_hash))
                .order(file_infos::id.desc())
                .first(conn)?;
            for (name, value) in tags {
                diesel::insert_into(file_tags::table)
                    .values(NewFileTagRow {
                        file_info_id: info.id,
                        tag_name: name,
                        tag_value: value,
                    })
                    .execute(conn)?;
            }
            Ok(info)
        })
    }

    // --- paid subscribers (address lock) ---

    pub async fn get_paid_subscriber(
        &self,
        pubkey: &str,
    ) -> Result<PaidSubscriberRow, StatsError> {
        let mut conn = self.address.lock().await;
        paid_subscribers::table
            .find(pubkey)
            .first(&mut *conn)
            .map_err(StatsError::from)
    }

    pub async fn upsert_paid_subscriber(
        &self,
        pubkey: &str,
        tier_name: &str,
        expiration_ts: i64,
        address: Option<&str>,
    ) -> Result<(), StatsError> {
        let mut conn = self.address.lock().await;
        let row = PaidSubscriberRow {
            pubkey: pubkey.to_string(),
            tier_name: tier_name.to_string(),
            expiration_ts,
            address: address.map(str::to_string),
        };
        with_retry(RETRY_ATTEMPTS, RETRY_BASE_DELAY, || {
            diesel::insert_into(paid_subscribers::table)
                .values(&row)
                .on_conflict(paid_subscribers::pubkey)
                .do_update()
                .set(&row)
                .execute(&mut *conn)
                .map_err(StatsError::from)
                .map(|_| ())
        })
        .await
    }

    /// Allocates the lowest-numbered available wallet address to `pubkey`,
    /// idempotently: a pubkey with an existing allocation gets the same
    /// address back rather than a fresh one. Returns `NoAddresses` once the
    /// pool is exhausted. Retried with exponential back-off on lock
    /// contention (spec §4.3/§5).
    pub async fn allocate_address(
        &self,
        pubkey: &str,
        now: i64,
    ) -> Result<WalletAddressRow, StatsError> {
        let mut conn = self.address.lock().await;
        with_retry(RETRY_ATTEMPTS, RETRY_BASE_DELAY, || {
            conn.transaction(|conn| {
                if let Some(existing_id) = subscriber_addresses::table
                    .filter(subscriber_addresses::pubkey.eq(pubkey))
                    .select(subscriber_addresses::address_id)
                    .first::<i32>(conn)
                    .optional()?
                {
                    return wallet_addresses::table
                        .find(existing_id)
                        .first::<WalletAddressRow>(conn);
                }

                let free_id = wallet_addresses::table
                    .filter(wallet_addresses::status.eq("available"))
                    .order(wallet_addresses::id.asc())
                    .select(wallet_addresses::id)
                    .first::<i32>(conn)
                    .optional()?
                    .ok_or(diesel::result::Error::NotFound)?;

                diesel::update(wallet_addresses::table.find(free_id))
                    .set((
                        wallet_addresses::status.eq("allocated"),
                        wallet_addresses::npub.eq(Some(pubkey)),
                        wallet_addresses::allocated_at.eq(Some(now)),
                    ))
                    .execute(conn)?;

                diesel::insert_into(subscriber_addresses::table)
                    .values((
                        subscriber_addresses::pubkey.eq(pubkey),
                        subscriber_addresses::address_id.eq(free_id),
                    ))
                    .execute(conn)?;

                wallet_addresses::table.find(free_id).first(conn)
            })
            .map_err(|e| match e {
                diesel::result::Error::NotFound => StatsError::NoAddresses,
                other => StatsError::from(other),
            })
        })
        .await
    }

    // --- allow-lists (access lock) ---

    pub async fn add_allowed_read(
        &self,
        pubkey: &str,
        tier_name: Option<&str>,
        created_by: &str,
        now: i64,
    ) -> Result<(), StatsError> {
        let mut conn = self.access.lock().await;
        let row = AllowedReadRow {
            pubkey: pubkey.to_string(),
            tier_name: tier_name.map(str::to_string),
            created_by: created_by.to_string(),
            added_at: now,
        };
        with_retry(RETRY_ATTEMPTS, RETRY_BASE_DELAY, || {
            diesel::insert_into(allowed_read_npubs::table)
                .values(&row)
                .on_conflict(allowed_read_npubs::pubkey)
                .do_update()
                .set(&row)
                .execute(&mut *conn)
                .map_err(StatsError::from)
                .map(|_| ())
        })
        .await
    }

    pub async fn remove_allowed_read(&self, pubkey: &str) -> Result<(), StatsError> {
        let mut conn = self.access.lock().await;
        with_retry(RETRY_ATTEMPTS, RETRY_BASE_DELAY, || {
            diesel::delete(allowed_read_npubs::table.find(pubkey))
                .execute(&mut *conn)
                .map_err(StatsError::from)
                .map(|_| ())
        })
        .await
    }

    pub async fn bulk_import_allowed_read(
        &self,
        entries: &[(String, Option<String>, String, i64)],
    ) -> Result<(), StatsError> {
        let mut conn = self.access.lock().await;
        with_retry(RETRY_ATTEMPTS, RETRY_BASE_DELAY, || {
            conn.transaction(|conn| {
                for (pubkey, tier_name, created_by, added_at) in entries {
                    let row = AllowedReadRow {
                        pubkey: pubkey.clone(),
                        tier_name: tier_name.clone(),
                        created_by: created_by.clone(),
                        added_at: *added_at,
                    };
                    diesel::insert_into(allowed_read_npubs::table)
                        .values(&row)
                        .on_conflict(allowed_read_npubs::pubkey)
                        .do_update()
                        .set(&row)
                        .execute(conn)?;
                }
                Ok(())
            })
            .map_err(StatsError::from)
        })
        .await
    }

    pub async fn is_allowed_read(&self, pubkey: &str) -> Result<bool, StatsError> {
        let mut conn = self.access.lock().await;
        let found = allowed_read_npubs::table
            .find(pubkey)
            .first::<AllowedReadRow>(&mut *conn)
            .optional()?;
        Ok(found.is_some())
    }

    pub async fn add_allowed_write(
        &self,
        pubkey: &str,
        tier_name: Option<&str>,
        created_by: &str,
        now: i64,
    ) -> Result<(), StatsError> {
        let mut conn = self.access.lock().await;
        let row = AllowedWriteRow {
            pubkey: pubkey.to_string(),
            tier_name: tier_name.map(str::to_string),
            created_by: created_by.to_string(),
            added_at: now,
        };
        with_retry(RETRY_ATTEMPTS, RETRY_BASE_DELAY, || {
            diesel::insert_into(allowed_write_npubs::table)
                .values(&row)
                .on_conflict(allowed_write_npubs::pubkey)
                .do_update()
                .set(&row)
                .execute(&mut *conn)
                .map_err(StatsError::from)
                .map(|_| ())
        })
        .await
    }

    pub async fn remove_allowed_write(&self, pubkey: &str) -> Result<(), StatsError> {
        let mut conn = self.access.lock().await;
        with_retry(RETRY_ATTEMPTS, RETRY_BASE_DELAY, || {
            diesel::delete(allowed_write_npubs::table.find(pubkey))
                .execute(&mut *conn)
                .map_err(StatsError::from)
                .map(|_| ())
        })
        .await
    }

    pub async fn bulk_import_allowed_write(
        &self,
        entries: &[(String, Option<String>, String, i64)],
    ) -> Result<(), StatsError> {
        let mut conn = self.access.lock().await;
        with_retry(RETRY_ATTEMPTS, RETRY_BASE_DELAY, || {
            conn.transaction(|conn| {
                for (pubkey, tier_name, created_by, added_at) in entries {
                    let row = AllowedWriteRow {
                        pubkey: pubkey.clone(),
                        tier_name: tier_name.clone(),
                        created_by: created_by.clone(),
                        added_at: *added_at,
                    };
                    diesel::insert_into(allowed_write_npubs::table)
                        .values(&row)
                        .on_conflict(allowed_write_npubs::pubkey)
                        .do_update()
                        .set(&row)
                        .execute(conn)?;
                }
                Ok(())
            })
            .map_err(StatsError::from)
        })
        .await
    }

    pub async fn is_allowed_write(&self, pubkey: &str) -> Result<bool, StatsError> {
        let mut conn = self.access.lock().await;
        let found = allowed_write_npubs::table
            .find(pubkey)
            .first::<AllowedWriteRow>(&mut *conn)
            .optional()?;
        Ok(found.is_some())
    }

    // --- relay ownership (access lock) ---

    pub async fn get_relay_owner(&self) -> Result<RelayOwnerRow, StatsError> {
        let mut conn = self.access.lock().await;
        relay_owner::table
            .order(relay_owner::id.desc())
            .first(&mut *conn)
            .map_err(StatsError::from)
    }

    pub async fn set_relay_owner(&self, pubkey: &str) -> Result<(), StatsError> {
        let mut conn = self.access.lock().await;
        with_retry(RETRY_ATTEMPTS, RETRY_BASE_DELAY, || {
            diesel::insert_into(relay_owner::table)
                .values(relay_owner::pubkey.eq(pubkey))
                .execute(&mut *conn)
                .map_err(StatsError::from)
                .map(|_| ())
        })
        .await
    }

    // --- notifications (access lock) ---

    pub async fn insert_moderation_notification(
        &self,
        pubkey: &str,
        message: &str,
        created_at: i64,
    ) -> Result<(), StatsError> {
        let mut conn = self.access.lock().await;
        with_retry(RETRY_ATTEMPTS, RETRY_BASE_DELAY, || {
            diesel::insert_into(moderation_notifications::table)
                .values((
                    moderation_notifications::pubkey.eq(pubkey),
                    moderation_notifications::message.eq(message),
                    moderation_notifications::read.eq(false),
                    moderation_notifications::created_at.eq(created_at),
                ))
                .execute(&mut *conn)
                .map_err(StatsError::from)
                .map(|_| ())
        })
        .await
    }

    pub async fn list_moderation_notifications(
        &self,
        pubkey: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ModerationNotificationRow>, StatsError> {
        let mut conn = self.access.lock().await;
        moderation_notifications::table
            .filter(moderation_notifications::pubkey.eq(pubkey))
            .order(moderation_notifications::created_at.desc())
            .limit(limit)
            .offset(offset)
            .load(&mut *conn)
            .map_err(StatsError::from)
    }

    pub async fn mark_moderation_notification_read(&self, id: i32) -> Result<(), StatsError> {
        let mut conn = self.access.lock().await;
        with_retry(RETRY_ATTEMPTS, RETRY_BASE_DELAY, || {
            diesel::update(moderation_notifications::table.find(id))
                .set(moderation_notifications::read.eq(true))
                .execute(&mut *conn)
                .map_err(StatsError::from)
                .map(|_| ())
        })
        .await
    }

    pub async fn insert_payment_notification(
        &self,
        pubkey: &str,
        amount_sats: i64,
        tier_name: &str,
        created_at: i64,
    ) -> Result<(), StatsError> {
        let mut conn = self.access.lock().await;
        with_retry(RETRY_ATTEMPTS, RETRY_BASE_DELAY, || {
            diesel::insert_into(payment_notifications::table)
                .values((
                    payment_notifications::pubkey.eq(pubkey),
                    payment_notifications::amount_sats.eq(amount_sats),
                    payment_notifications::tier_name.eq(tier_name),
                    payment_notifications::read.eq(false),
                    payment_notifications::created_at.eq(created_at),
                ))
                .execute(&mut *conn)
                .map_err(StatsError::from)
                .map(|_| ())
        })
        .await
    }

    pub async fn list_payment_notifications(
        &self,
        pubkey: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PaymentNotificationRow>, StatsError> {
        let mut conn = self.access.lock().await;
        payment_notifications::table
            .filter(payment_notifications::pubkey.eq(pubkey))
            .order(payment_notifications::created_at.desc())
            .limit(limit)
            .offset(offset)
            .load(&mut *conn)
            .map_err(StatsError::from)
    }

    pub async fn mark_payment_notification_read(&self, id: i32) -> Result<(), StatsError> {
        let mut conn = self.access.lock().await;
        with_retry(RETRY_ATTEMPTS, RETRY_BASE_DELAY, || {
            diesel::update(payment_notifications::table.find(id))
                .set(payment_notifications::read.eq(true))
                .execute(&mut *conn)
                .map_err(StatsError::from)
                .map(|_| ())
        })
        .await
    }

    pub async fn insert_report_notification(
        &self,
        reporter_pubkey: &str,
        target_event_id: &str,
        reason: &str,
        created_at: i64,
    ) -> Result<(), StatsError> {
        let mut conn = self.access.lock().await;
        with_retry(RETRY_ATTEMPTS, RETRY_BASE_DELAY, || {
            diesel::insert_into(report_notifications::table)
                .values((
                    report_notifications::reporter_pubkey.eq(reporter_pubkey),
                    report_notifications::target_event_id.eq(target_event_id),
                    report_notifications::reason.eq(reason),
                    report_notifications::read.eq(false),
                    report_notifications::created_at.eq(created_at),
                ))
                .execute(&mut *conn)
                .map_err(StatsError::from)
                .map(|_| ())
        })
        .await
    }

    pub async fn list_report_notifications(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ReportNotificationRow>, StatsError> {
        let mut conn = self.access.lock().await;
        report_notifications::table
            .order(report_notifications::created_at.desc())
            .limit(limit)
            .offset(offset)
            .load(&mut *conn)
            .map_err(StatsError::from)
    }

    pub async fn mark_report_notification_read(&self, id: i32) -> Result<(), StatsError> {
        let mut conn = self.access.lock().await;
        with_retry(RETRY_ATTEMPTS, RETRY_BASE_DELAY, || {
            diesel::update(report_notifications::table.find(id))
                .set(report_notifications::read.eq(true))
                .execute(&mut *conn)
                .map_err(StatsError::from)
                .map(|_| ())
        })
        .await
    }

    // --- wallet balance / bitcoin rate / wallet tx (dedicated locks) ---

    pub async fn get_balance_sats(&self, pubkey: &str) -> Result<i64, StatsError> {
        use crate::schema::wallet_balances;
        let mut conn = self.balance.lock().await;
        wallet_balances::table
            .find(pubkey)
            .select(wallet_balances::balance_sats)
            .first(&mut *conn)
            .map_err(StatsError::from)
    }

    pub async fn set_balance_sats(
        &self,
        pubkey: &str,
        balance_sats: i64,
        updated_at: i64,
    ) -> Result<(), StatsError> {
        use crate::schema::wallet_balances;
        let mut conn = self.balance.lock().await;
        diesel::insert_into(wallet_balances::table)
            .values((
                wallet_balances::pubkey.eq(pubkey),
                wallet_balances::balance_sats.eq(balance_sats),
                wallet_balances::updated_at.eq(updated_at),
            ))
            .on_conflict(wallet_balances::pubkey)
            .do_update()
            .set((
                wallet_balances::balance_sats.eq(balance_sats),
                wallet_balances::updated_at.eq(updated_at),
            ))
            .execute(&mut *conn)?;
        Ok(())
    }

    pub async fn record_bitcoin_rate(
        &self,
        usd_per_btc: f64,
        observed_at: i64,
    ) -> Result<(), StatsError> {
        use crate::schema::bitcoin_rates;
        let mut conn = self.bitcoin_rate.lock().await;
        diesel::insert_into(bitcoin_rates::table)
            .values((
                bitcoin_rates::usd_per_btc.eq(usd_per_btc),
                bitcoin_rates::observed_at.eq(observed_at),
            ))
            .execute(&mut *conn)?;
        Ok(())
    }

    pub async fn latest_bitcoin_rate(&self) -> Result<f64, StatsError> {
        use crate::schema::bitcoin_rates;
        let mut conn = self.bitcoin_rate.lock().await;
        bitcoin_rates::table
            .order(bitcoin_rates::observed_at.desc())
            .select(bitcoin_rates::usd_per_btc)
            .first(&mut *conn)
            .map_err(StatsError::from)
    }

    pub async fn record_wallet_transaction(
        &self,
        pubkey: &str,
        amount_sats: i64,
        direction: &str,
        memo: Option<&str>,
        created_at: i64,
    ) -> Result<(), StatsError> {
        use crate::schema::wallet_transactions;
        let mut conn = self.wallet_tx.lock().await;
        diesel::insert_into(wallet_transactions::table)
            .values((
                wallet_transactions::pubkey.eq(pubkey),
                wallet_transactions::amount_sats.eq(amount_sats),
                wallet_transactions::direction.eq(direction),
                wallet_transactions::memo.eq(memo),
                wallet_transactions::created_at.eq(created_at),
            ))
            .execute(&mut *conn)?;
        Ok(())
    }

    pub async fn list_wallet_transactions(
        &self,
        pubkey: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<i64>, StatsError> {
        use crate::schema::wallet_transactions;
        let mut conn = self.wallet_tx.lock().await;
        wallet_transactions::table
            .filter(wallet_transactions::pubkey.eq(pubkey))
            .order(wallet_transactions::created_at.desc())
            .limit(limit)
            .offset(offset)
            .select(wallet_transactions::amount_sats)
            .load(&mut *conn)
            .map_err(StatsError::from)
    }
}

/// Derives the `(lightning_addr, dht_key)` profile flags from a kind-0
/// metadata content blob: presence of a Lightning address field (`lud16` or
/// `lud06`) and presence of a `dht_key` field, respectively. Malformed JSON
/// yields `(false, false)` rather than an error -- profile flags are
/// best-effort derived data, not validated input.
fn derive_profile_flags(content: &str) -> (bool, bool) {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(content) else {
        return (false, false);
    };
    let Some(obj) = value.as_object() else {
        return (false, false);
    };
    let lightning_addr = obj.contains_key("lud16") || obj.contains_key("lud06");
    let dht_key = obj.contains_key("dht_key");
    (lightning_addr, dht_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn record_event_kind_skips_unaccountable_kinds() {
        let store = StatsStore::open_in_memory().unwrap();
        store
            .record_event_kind("id1", "author1", 99, "{}", 10, 1_700_000_000, &[0, 1])
            .await
            .unwrap();
        let stats = store.stats_by_kind(99).await.unwrap();
        assert_eq!(stats.event_count, 0);
    }

    #[tokio::test]
    async fn record_event_kind_upserts_profile_on_kind_zero() {
        let store = StatsStore::open_in_memory().unwrap();
        store
            .record_event_kind(
                "id1",
                "author1",
                0,
                r#"{"name":"alice","lud16":"alice@example.com"}"#,
                40,
                1_700_000_000,
                &[0],
            )
            .await
            .unwrap();
        let profile = store.get_user_profile("author1").await.unwrap();
        assert!(profile.lightning_addr);
        assert!(!profile.dht_key);
    }

    #[tokio::test]
    async fn paid_subscriber_not_found_is_distinct() {
        let store = StatsStore::open_in_memory().unwrap();
        let err = store.get_paid_subscriber("nobody").await.unwrap_err();
        assert!(matches!(err, StatsError::NotFound));
    }

    #[tokio::test]
    async fn paid_subscriber_upsert_is_idempotent() {
        let store = StatsStore::open_in_memory().unwrap();
        store
            .upsert_paid_subscriber("pub1", "gold", 1_800_000_000, None)
            .await
            .unwrap();
        store
            .upsert_paid_subscriber("pub1", "platinum", 1_900_000_000, Some("addr1"))
            .await
            .unwrap();
        let row = store.get_paid_subscriber("pub1").await.unwrap();
        assert_eq!(row.tier_name, "platinum");
    }

    #[tokio::test]
    async fn allowed_read_add_remove_round_trips() {
        let store = StatsStore::open_in_memory().unwrap();
        store
            .add_allowed_read("pub1", None, "admin", 1_700_000_000)
            .await
            .unwrap();
        assert!(store.is_allowed_read("pub1").await.unwrap());
        store.remove_allowed_read("pub1").await.unwrap();
        assert!(!store.is_allowed_read("pub1").await.unwrap());
    }

    #[tokio::test]
    async fn address_allocation_is_idempotent_per_pubkey() {
        let store = StatsStore::open_in_memory().unwrap();
        diesel::sql_query(
            "INSERT INTO wallet_addresses (address, status) VALUES ('addr-a', 'available')",
        )
        .execute(&mut *store.address.lock().await)
        .unwrap();

        let first = store.allocate_address("pub1", 1_700_000_000).await.unwrap();
        let second = store.allocate_address("pub1", 1_700_000_001).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.address, "addr-a");
    }

    #[tokio::test]
    async fn address_allocation_exhaustion_returns_no_addresses() {
        let store = StatsStore::open_in_memory().unwrap();
        let err = store.allocate_address("pub1", 1_700_000_000).await.unwrap_err();
        assert!(matches!(err, StatsError::NoAddresses));
    }

    #[tokio::test]
    async fn notifications_mark_read_round_trip() {
        let store = StatsStore::open_in_memory().unwrap();
        store
            .insert_moderation_notification("pub1", "flagged", 1_700_000_000)
            .await
            .unwrap();
        let list = store
            .list_moderation_notifications("pub1", 10, 0)
            .await
            .unwrap();
        assert_eq!(list.len(), 1);
        assert!(!list[0].read);
        store
            .mark_moderation_notification_read(list[0].id)
            .await
            .unwrap();
        let list = store
            .list_moderation_notifications("pub1", 10, 0)
            .await
            .unwrap();
        assert!(list[0].read);
    }
}
