//! Deadline-bounded condition variable waits

use std::time::Duration;

use parking_lot::{Condvar, MutexGuard};

/// Block on `condvar` until `done` holds or `timeout` elapses.
///
/// Thin wrapper over [`Condvar::wait_while_for`] that takes the completion
/// predicate rather than the keep-waiting one and reports whether `done`
/// held when the wait ended, which is what the drain APIs return.
pub fn wait_for<T>(
    condvar: &Condvar,
    guard: &mut MutexGuard<'_, T>,
    timeout: Duration,
    mut done: impl FnMut(&T) -> bool,
) -> bool {
    let result = condvar.wait_while_for(guard, |state| !done(state), timeout);
    !result.timed_out() || done(&**guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::{sync::Arc, thread, time::Instant};

    #[test]
    fn returns_immediately_when_already_done() {
        let lock = Mutex::new(true);
        let condvar = Condvar::new();
        let mut guard = lock.lock();
        assert!(wait_for(&condvar, &mut guard, Duration::ZERO, |ready| *ready));
    }

    #[test]
    fn times_out_within_bound() {
        let lock = Mutex::new(false);
        let condvar = Condvar::new();
        let mut guard = lock.lock();

        let started = Instant::now();
        assert!(!wait_for(&condvar, &mut guard, Duration::from_millis(50), |ready| *ready));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(150), "waited {:?}", elapsed);
    }

    #[test]
    fn wakes_when_predicate_flips() {
        let shared = Arc::new((Mutex::new(false), Condvar::new()));
        let notifier = Arc::clone(&shared);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            *notifier.0.lock() = true;
            notifier.1.notify_all();
        });

        let mut guard = shared.0.lock();
        assert!(wait_for(&shared.1, &mut guard, Duration::from_secs(5), |ready| *ready));
        drop(guard);
        handle.join().unwrap();
    }
}
