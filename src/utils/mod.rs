//! Utility functions module
//!
//! This module contains utility functions used throughout the application.

pub mod panic;
pub mod signals;
pub mod wait;

// Re-export main functions
pub use panic::catch_panic;
pub use signals::{signal_name, termination_signals};
pub use wait::wait_for;
