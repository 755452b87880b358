//! Tasks and the runners that execute them
//!
//! A [`Task`] is a one-shot closure returning a typed result. The worker pool
//! runs a batch of them; the recurring driver re-enters a single body.

pub mod demo;
pub mod recurring;

use serde::Serialize;

use crate::{error::TaskError, utils::catch_panic};

// Re-export main types
pub use recurring::{DriverPhase, RecurringTaskDriver};

/// Unit of work accepted by the worker pool
pub type Task = Box<dyn FnOnce() -> Result<(), TaskError> + Send + 'static>;

/// Identifier handed out by the pool at submission time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TaskId(u64);

impl TaskId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Run a task body so that neither its error nor a panic escapes the caller
pub(crate) fn run_contained<F>(body: F) -> Result<(), TaskError>
where
    F: FnOnce() -> Result<(), TaskError>,
{
    catch_panic(body).unwrap_or_else(|message| Err(TaskError::new(format!("panicked: {message}"))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_displays_with_hash() {
        assert_eq!(TaskId::new(7).to_string(), "#7");
        assert_eq!(TaskId::new(7).get(), 7);
    }

    #[test]
    fn run_contained_passes_results_through() {
        assert!(run_contained(|| Ok(())).is_ok());
        let err = run_contained(|| Err(TaskError::new("boom"))).unwrap_err();
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn run_contained_turns_panics_into_errors() {
        let err = run_contained(|| panic!("exploded")).unwrap_err();
        assert_eq!(err.message(), "panicked: exploded");
    }
}
