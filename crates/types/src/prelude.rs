// Path: crates/types/src/prelude.rs
pub use crate::access::{AccessMode, AccessSettings, Scope, Tier};
pub use crate::config::RelayConfig;
pub use crate::error::{ErrorCode, TypesError};
pub use crate::event::{Event, Tag};
pub use crate::filter::Filter;
pub use crate::wire::{ClientMessage, RelayMessage};
