//! Demo task bodies used by the binary

use std::{thread, time::Duration};
use tracing::{debug, info};

use crate::error::TaskError;

/// One-shot task that sleeps for `duration` and then completes or fails
pub fn sleeping_task(
    label: usize,
    duration: Duration,
    fail: bool,
) -> impl FnOnce() -> Result<(), TaskError> + Send + 'static {
    move || {
        debug!("Demo task {} working for {:?}", label, duration);
        thread::sleep(duration);
        if fail {
            return Err(TaskError::new(format!("demo task {} failed", label)));
        }
        info!("Task {} completed", label);
        Ok(())
    }
}

/// Recurring body that sleeps for `duration` on every invocation
pub fn heartbeat(duration: Duration) -> impl FnMut() -> Result<(), TaskError> + Send + 'static {
    let mut beats: u64 = 0;
    move || {
        beats += 1;
        debug!("Heartbeat {} started", beats);
        thread::sleep(duration);
        info!("Heartbeat {} completed", beats);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleeping_task_reports_requested_failure() {
        assert!(sleeping_task(0, Duration::ZERO, false)().is_ok());
        let err = sleeping_task(3, Duration::ZERO, true)().unwrap_err();
        assert_eq!(err.message(), "demo task 3 failed");
    }

    #[test]
    fn heartbeat_can_be_reentered() {
        let mut beat = heartbeat(Duration::ZERO);
        assert!(beat().is_ok());
        assert!(beat().is_ok());
    }
}
