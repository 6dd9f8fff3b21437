//! Scheduling core for napcron: the due/retry policy, requirement gating,
//! bounded parallel execution, crash-safe state persistence, and the
//! single-instance lock.
//!
//! One call to [`Runner::run_once`] is one finite pass over the configured
//! task list; there is no internal timer. An external trigger (typically an
//! hourly cron entry) drives repetition.

pub mod clock;
pub mod due;
pub mod error;
pub mod exec;
pub mod lock;
pub mod power;
pub mod requirements;
pub mod service;
pub mod state;
pub mod types;

pub use {
    error::{Error, Result},
    service::{RunOptions, Runner},
};
