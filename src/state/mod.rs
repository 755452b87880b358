//! State management module
//!
//! This module contains the lifecycle and bookkeeping structures shared by
//! the pool, the driver and the coordinator.

pub mod pool_state;
pub mod shutdown_state;

// Re-export main types
pub use pool_state::{PoolState, PoolStats, QueuedTask};
pub use shutdown_state::{ShutdownCell, ShutdownState};
