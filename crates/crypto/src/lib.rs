// Path: crates/crypto/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! Identity and key utilities (C1): public-key canonicalization, Schnorr
//! event-signature verification, event-id computation, the relay's own
//! signing key, and Ed25519 verification for kind-11011 relay-lists.

pub mod error;
pub mod event;
pub mod pubkey;
pub mod relay_key;
pub mod relay_list;

pub mod prelude {
    pub use crate::error::CryptoError;
    pub use crate::event::{compute_event_id, verify_event_signature, verify_schnorr_signature};
    pub use crate::pubkey::{canonicalize, to_bech32};
    pub use crate::relay_key::RelayKeypair;
    pub use crate::relay_list::verify_relay_list_signature;
}
