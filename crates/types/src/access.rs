// Path: crates/types/src/access.rs
use serde::{Deserialize, Serialize};

/// The value of an `AccessSettings.read`/`.write` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    OnlyMe,
    AllowedUsers,
    PaidUsers,
    AllUsers,
}

/// The configured relay access mode. Determines how `AccessSettings` is
/// normalized (see `AccessSettings::normalize`). Deserialization never
/// fails on an unrecognized mode string — it maps to `Unknown`, which
/// `normalize` forces to all-`only-me`, matching spec §3's "any other mode
/// string" rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    OnlyMe,
    InviteOnly,
    Public,
    Subscription,
    Unknown,
}

impl Serialize for AccessMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let s = match self {
            AccessMode::OnlyMe => "only_me",
            AccessMode::InviteOnly => "invite_only",
            AccessMode::Public => "public",
            AccessMode::Subscription => "subscription",
            AccessMode::Unknown => "unknown",
        };
        serializer.serialize_str(s)
    }
}

impl<'de> Deserialize<'de> for AccessMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "only_me" | "only-me" => AccessMode::OnlyMe,
            "invite_only" | "invite-only" => AccessMode::InviteOnly,
            "public" => AccessMode::Public,
            "subscription" => AccessMode::Subscription,
            _ => AccessMode::Unknown,
        })
    }
}

/// `(mode, read, write)` as defined in spec §3. Constructed only through
/// `normalize`, which is the single place the five normalization rules are
/// applied, so a value of this type is always internally consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessSettings {
    pub mode: AccessMode,
    pub read: Scope,
    pub write: Scope,
}

impl AccessSettings {
    /// Applies the five normalization rules from spec §3 to a raw
    /// `(mode, read, write)` triple read from configuration or an admin
    /// mutation. This is the only constructor: an `AccessSettings` value can
    /// never be in a state the rules disallow.
    pub fn normalize(mode: AccessMode, read: Scope, write: Scope) -> Self {
        match mode {
            AccessMode::OnlyMe => AccessSettings {
                mode,
                write: Scope::OnlyMe,
                read: match read {
                    Scope::OnlyMe | Scope::AllUsers | Scope::AllowedUsers => read,
                    Scope::PaidUsers => Scope::OnlyMe,
                },
            },
            AccessMode::InviteOnly => AccessSettings {
                mode,
                write: Scope::AllowedUsers,
                read: match read {
                    Scope::AllUsers | Scope::AllowedUsers => read,
                    Scope::OnlyMe | Scope::PaidUsers => Scope::AllowedUsers,
                },
            },
            AccessMode::Public => AccessSettings {
                mode,
                read: Scope::AllUsers,
                write: Scope::AllUsers,
            },
            AccessMode::Subscription => AccessSettings {
                mode,
                write: Scope::PaidUsers,
                read: match read {
                    Scope::AllUsers | Scope::PaidUsers => read,
                    Scope::OnlyMe | Scope::AllowedUsers => Scope::PaidUsers,
                },
            },
            AccessMode::Unknown => AccessSettings {
                mode,
                read: Scope::OnlyMe,
                write: Scope::OnlyMe,
            },
        }
    }
}

/// A configured subscription tier, per spec §3. `price_sats == 0` marks a
/// free tier; any other value marks a paid tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub name: String,
    pub monthly_limit_bytes: u64,
    pub price_sats: u64,
}

impl Tier {
    pub fn is_paid(&self) -> bool {
        self.price_sats > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_me_forces_write_and_rejects_paid_read() {
        let s = AccessSettings::normalize(AccessMode::OnlyMe, Scope::PaidUsers, Scope::AllUsers);
        assert_eq!(s.write, Scope::OnlyMe);
        assert_eq!(s.read, Scope::OnlyMe);
    }

    #[test]
    fn invite_only_forces_allowed_write() {
        let s = AccessSettings::normalize(AccessMode::InviteOnly, Scope::AllUsers, Scope::AllUsers);
        assert_eq!(s.write, Scope::AllowedUsers);
        assert_eq!(s.read, Scope::AllUsers);
    }

    #[test]
    fn public_forces_all_users_both_ways() {
        let s = AccessSettings::normalize(AccessMode::Public, Scope::OnlyMe, Scope::OnlyMe);
        assert_eq!(s.read, Scope::AllUsers);
        assert_eq!(s.write, Scope::AllUsers);
    }

    #[test]
    fn subscription_forces_paid_write_and_read_fallback() {
        let s = AccessSettings::normalize(AccessMode::Subscription, Scope::OnlyMe, Scope::AllUsers);
        assert_eq!(s.write, Scope::PaidUsers);
        assert_eq!(s.read, Scope::PaidUsers);
    }

    #[test]
    fn unrecognized_mode_string_forces_only_me_throughout() {
        let mode: AccessMode = serde_json::from_str("\"whatever\"").unwrap();
        assert_eq!(mode, AccessMode::Unknown);
        let s = AccessSettings::normalize(mode, Scope::AllUsers, Scope::AllUsers);
        assert_eq!(s.read, Scope::OnlyMe);
        assert_eq!(s.write, Scope::OnlyMe);
    }
}
