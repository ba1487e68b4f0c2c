//! # Quota Infra
//!
//! Infrastructure for the quota admission-control stack: the local
//! fixed-window counter store, the Redis-backed sliding-window store, the
//! availability monitor that decides which one is active, and the admission
//! gate that ties them together.

pub mod gate;
pub mod monitor;
pub mod store;

pub use gate::{AdmissionGate, GateDecision};
pub use monitor::AvailabilityMonitor;
pub use store::LocalCounterStore;

#[cfg(feature = "redis")]
pub use store::{RedisStoreConfig, SharedCounterStore};
