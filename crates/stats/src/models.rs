// Path: crates/stats/src/models.rs
use diesel::prelude::*;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = kinds)]
pub struct KindRow {
    pub id: i32,
    pub event_id: String,
    pub author: String,
    pub kind: i64,
    pub size_bytes: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = kinds)]
pub struct NewKindRow<'a> {
    pub event_id: &'a str,
    pub author: &'a str,
    pub kind: i64,
    pub size_bytes: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = user_profiles)]
pub struct UserProfileRow {
    pub pubkey: String,
    pub content: String,
    pub lightning_addr: bool,
    pub dht_key: bool,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = allowed_read_npubs)]
pub struct AllowedReadRow {
    pub pubkey: String,
    pub tier_name: Option<String>,
    pub created_by: String,
    pub added_at: i64,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = allowed_write_npubs)]
pub struct AllowedWriteRow {
    pub pubkey: String,
    pub tier_name: Option<String>,
    pub created_by: String,
    pub added_at: i64,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = paid_subscribers)]
pub struct PaidSubscriberRow {
    pub pubkey: String,
    pub tier_name: String,
    pub expiration_ts: i64,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = file_infos)]
pub struct FileInfoRow {
    pub id: i32,
    pub author: String,
    pub blossom_hash: String,
    pub event_id: String,
    pub size_bytes: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = file_infos)]
pub struct NewFileInfoRow<'a> {
    pub author: &'a str,
    pub blossom_hash: &'a str,
    pub event_id: &'a str,
    pub size_bytes: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = file_tags)]
pub struct FileTagRow {
    pub id: i32,
    pub file_info_id: i32,
    pub tag_name: String,
    pub tag_value: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = file_tags)]
pub struct NewFileTagRow<'a> {
    pub file_info_id: i32,
    pub tag_name: &'a str,
    pub tag_value: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = wallet_addresses)]
pub struct WalletAddressRow {
    pub id: i32,
    pub address: String,
    pub status: String,
    pub npub: Option<String>,
    pub allocated_at: Option<i64>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = relay_owner)]
pub struct RelayOwnerRow {
    pub id: i32,
    pub pubkey: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = moderation_notifications)]
pub struct ModerationNotificationRow {
    pub id: i32,
    pub pubkey: String,
    pub message: String,
    pub read: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = payment_notifications)]
pub struct PaymentNotificationRow {
    pub id: i32,
    pub pubkey: String,
    pub amount_sats: i64,
    pub tier_name: String,
    pub read: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = report_notifications)]
pub struct ReportNotificationRow {
    pub id: i32,
    pub reporter_pubkey: String,
    pub target_event_id: String,
    pub reason: String,
    pub read: bool,
    pub created_at: i64,
}
