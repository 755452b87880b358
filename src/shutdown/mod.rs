//! Shutdown coordination
//!
//! This module bridges termination signals into a bounded drain of every
//! registered pool and driver.

pub mod coordinator;
pub mod report;

use std::time::Duration;

// Re-export main types
pub use coordinator::ShutdownCoordinator;
pub use report::{ShutdownOutcome, ShutdownReport, TargetReport};

/// Something the coordinator drains on shutdown.
///
/// Implemented by [`crate::pool::WorkerPool`] and
/// [`crate::tasks::RecurringTaskDriver`].
pub trait Drain: Send + Sync {
    fn name(&self) -> &str;

    /// Stop taking new work. Idempotent and non-blocking.
    fn initiate_shutdown(&self);

    /// Wait at most `timeout` for in-flight work; `true` when fully drained.
    fn await_termination(&self, timeout: Duration) -> bool;
}
