//! Background tasks.

pub mod scheduler;

pub use scheduler::{Scheduler, SchedulerConfig};
