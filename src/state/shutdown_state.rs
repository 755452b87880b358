//! Monotonic shutdown lifecycle

use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

/// Lifecycle of a pool or coordinator. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownState {
    Running = 0,
    ShuttingDown = 1,
    Terminated = 2,
}

impl ShutdownState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Running,
            1 => Self::ShuttingDown,
            _ => Self::Terminated,
        }
    }
}

impl std::fmt::Display for ShutdownState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Running => "running",
            Self::ShuttingDown => "shutting down",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Lock-free holder for a [`ShutdownState`]
#[derive(Debug)]
pub struct ShutdownCell(AtomicU8);

impl ShutdownCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(ShutdownState::Running as u8))
    }

    pub fn get(&self) -> ShutdownState {
        ShutdownState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Move forward to `next`.
    ///
    /// Returns `true` only for the single caller that performed the
    /// transition; `false` if the state was already at or past `next`.
    pub fn advance(&self, next: ShutdownState) -> bool {
        let previous = self.0.fetch_max(next as u8, Ordering::SeqCst);
        previous < next as u8
    }
}

impl Default for ShutdownCell {
    fn default() -> Self {
        Self::new()
    }
}
