//! Fixed-size worker pool
//!
//! This module contains the thread pool that runs submitted tasks and drains
//! them on shutdown.

pub mod worker_pool;

// Re-export main types
pub use worker_pool::WorkerPool;
