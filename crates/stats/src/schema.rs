// Path: crates/stats/src/schema.rs
diesel::table! {
    kinds (id) {
        id -> Integer,
        event_id -> Text,
        author -> Text,
        kind -> BigInt,
        size_bytes -> BigInt,
        created_at -> BigInt,
    }
}

diesel::table! {
    user_profiles (pubkey) {
        pubkey -> Text,
        content -> Text,
        lightning_addr -> Bool,
        dht_key -> Bool,
        updated_at -> BigInt,
    }
}

diesel::table! {
    file_infos (id) {
        id -> Integer,
        author -> Text,
        blossom_hash -> Text,
        event_id -> Text,
        size_bytes -> BigInt,
        created_at -> BigInt,
    }
}

diesel::table! {
    file_tags (id) {
        id -> Integer,
        file_info_id -> Integer,
        tag_name -> Text,
        tag_value -> Text,
    }
}

diesel::table! {
    admin_users (pubkey) {
        pubkey -> Text,
        added_at -> BigInt,
    }
}

diesel::table! {
    wallet_balances (pubkey) {
        pubkey -> Text,
        balance_sats -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::table! {
    wallet_transactions (id) {
        id -> Integer,
        pubkey -> Text,
        amount_sats -> BigInt,
        direction -> Text,
        memo -> Nullable<Text>,
        created_at -> BigInt,
    }
}

diesel::table! {
    bitcoin_rates (id) {
        id -> Integer,
        usd_per_btc -> Double,
        observed_at -> BigInt,
    }
}

diesel::table! {
    wallet_addresses (id) {
        id -> Integer,
        address -> Text,
        status -> Text,
        npub -> Nullable<Text>,
        allocated_at -> Nullable<BigInt>,
    }
}

diesel::table! {
    subscriber_addresses (pubkey) {
        pubkey -> Text,
        address_id -> Integer,
    }
}

diesel::table! {
    paid_subscribers (pubkey) {
        pubkey -> Text,
        tier_name -> Text,
        expiration_ts -> BigInt,
        address -> Nullable<Text>,
    }
}

diesel::table! {
    moderation_notifications (id) {
        id -> Integer,
        pubkey -> Text,
        message -> Text,
        read -> Bool,
        created_at -> BigInt,
    }
}

diesel::table! {
    payment_notifications (id) {
        id -> Integer,
        pubkey -> Text,
        amount_sats -> BigInt,
        tier_name -> Text,
        read -> Bool,
        created_at -> BigInt,
    }
}

diesel::table! {
    report_notifications (id) {
        id -> Integer,
        reporter_pubkey -> Text,
        target_event_id -> Text,
        reason -> Text,
        read -> Bool,
        created_at -> BigInt,
    }
}

diesel::table! {
    allowed_read_npubs (pubkey) {
        pubkey -> Text,
        tier_name -> Nullable<Text>,
        created_by -> Text,
        added_at -> BigInt,
    }
}

diesel::table! {
    allowed_write_npubs (pubkey) {
        pubkey -> Text,
        tier_name -> Nullable<Text>,
        created_by -> Text,
        added_at -> BigInt,
    }
}

diesel::table! {
    relay_owner (id) {
        id -> Integer,
        pubkey -> Text,
    }
}

diesel::table! {
    active_tokens (token) {
        token -> Text,
        pubkey -> Text,
        issued_at -> BigInt,
        expires_at -> BigInt,
    }
}

diesel::table! {
    user_challenges (pubkey) {
        pubkey -> Text,
        challenge -> Text,
        issued_at -> BigInt,
    }
}

diesel::joinable!(file_tags -> file_infos (file_info_id));
diesel::joinable!(subscriber_addresses -> wallet_addresses (address_id));

diesel::allow_tables_to_appear_in_same_query!(
    kinds,
    user_profiles,
    file_infos,
    file_tags,
    admin_users,
    wallet_balances,
    wallet_transactions,
    bitcoin_rates,
    wallet_addresses,
    subscriber_addresses,
    paid_subscribers,
    moderation_notifications,
    payment_notifications,
    report_notifications,
    allowed_read_npubs,
    allowed_write_npubs,
    relay_owner,
    active_tokens,
    user_challenges,
);
