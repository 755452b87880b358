//! Drain Pool - graceful shutdown for a fixed-size worker pool
//!
//! This library provides a worker pool and a recurring task driver that stop
//! accepting work on a termination signal and let in-flight work finish
//! within a bounded grace period.

pub mod config;
pub mod error;
pub mod pool;
pub mod shutdown;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::{Config, Mode};
pub use error::{Error, Result, TaskError};
pub use pool::WorkerPool;
pub use shutdown::{Drain, ShutdownCoordinator, ShutdownOutcome, ShutdownReport};
pub use state::{PoolStats, ShutdownState};
pub use tasks::{DriverPhase, RecurringTaskDriver, Task, TaskId};
