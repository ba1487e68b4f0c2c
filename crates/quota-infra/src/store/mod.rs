//! Counter store implementations - local fixed window and Redis sliding
//! window.
//!
//! The two backends deliberately use different algorithms (see the module
//! docs of each): the shared store blends the previous window for smoother
//! boundary behavior, the local fallback resets hard at the boundary. The
//! discrepancy is a documented trade-off, not an accident.

mod memory;

pub use memory::LocalCounterStore;

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::{RedisStoreConfig, SharedCounterStore};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in seconds.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Current unix time in milliseconds.
pub(crate) fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
