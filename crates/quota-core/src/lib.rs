//! # Quota Core
//!
//! The domain layer of the quota admission-control stack.
//! This crate contains policies, identifiers, the store port, and the
//! shared-store health state - with zero infrastructure dependencies.

pub mod error;
pub mod health;
pub mod identifier;
pub mod policy;
pub mod ports;

pub use error::RateLimitError;
pub use health::{SharedStoreHealth, StoreHealth};
pub use identifier::{CounterKey, Identifier};
pub use policy::{PolicyRegistry, RateLimitPolicy};
