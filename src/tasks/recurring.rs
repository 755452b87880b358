//! Recurring task driver
//!
//! Re-invokes a single task body a fixed delay after the previous invocation
//! ends. Invocations never overlap, and `stop()` only prevents the next one.

use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::{
    error::{Error, Result, TaskError},
    shutdown::Drain,
    tasks::run_contained,
    utils::wait_for,
};

/// Driver lifecycle: `Idle -> Running -> Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverPhase {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug)]
struct DriverState {
    phase: DriverPhase,
    stop_requested: bool,
    /// An invocation of the body is executing right now
    invoking: bool,
    invocation_count: u64,
    failures: u64,
}

struct Shared {
    name: String,
    delay: Duration,
    state: Mutex<DriverState>,
    /// Cuts the inter-invocation delay short on stop
    wake: Condvar,
    /// Signalled when the driver reaches `Stopped`
    settled: Condvar,
}

impl Shared {
    fn mark_stopped(&self) {
        let mut state = self.state.lock();
        state.phase = DriverPhase::Stopped;
        let invocations = state.invocation_count;
        drop(state);

        self.settled.notify_all();
        info!("Recurring task '{}' stopped after {} invocations", self.name, invocations);
    }
}

pub struct RecurringTaskDriver {
    shared: Arc<Shared>,
}

impl RecurringTaskDriver {
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                delay,
                state: Mutex::new(DriverState {
                    phase: DriverPhase::Idle,
                    stop_requested: false,
                    invoking: false,
                    invocation_count: 0,
                    failures: 0,
                }),
                wake: Condvar::new(),
                settled: Condvar::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn delay(&self) -> Duration {
        self.shared.delay
    }

    pub fn phase(&self) -> DriverPhase {
        self.shared.state.lock().phase
    }

    pub fn invocation_count(&self) -> u64 {
        self.shared.state.lock().invocation_count
    }

    pub fn failures(&self) -> u64 {
        self.shared.state.lock().failures
    }

    pub fn is_invoking(&self) -> bool {
        self.shared.state.lock().invoking
    }

    /// Spawn the driver thread and run the first invocation immediately
    pub fn start<F>(&self, body: F) -> Result<()>
    where
        F: FnMut() -> std::result::Result<(), TaskError> + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        match state.phase {
            DriverPhase::Idle => state.phase = DriverPhase::Running,
            DriverPhase::Running => return Err(Error::AlreadyStarted(self.shared.name.clone())),
            DriverPhase::Stopped => {
                return Err(Error::RejectedSubmission(self.shared.name.clone()))
            }
        }
        drop(state);

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("{}-driver", self.shared.name))
            .spawn(move || drive(shared, body));

        if let Err(e) = spawned {
            self.shared.mark_stopped();
            return Err(Error::Spawn(e));
        }

        info!(
            "Recurring task '{}' started with {:?} between invocations",
            self.shared.name, self.shared.delay
        );
        Ok(())
    }

    /// Prevent any further invocation.
    ///
    /// The invocation in progress, if any, runs to completion. A pending
    /// delay is abandoned at once. Returns `true` for the call that requested
    /// the stop.
    pub fn stop(&self) -> bool {
        let mut state = self.shared.state.lock();
        if state.stop_requested || state.phase == DriverPhase::Stopped {
            return false;
        }
        state.stop_requested = true;
        let never_started = state.phase == DriverPhase::Idle;
        if never_started {
            state.phase = DriverPhase::Stopped;
        }
        let invoking = state.invoking;
        drop(state);

        self.shared.wake.notify_all();
        if never_started {
            self.shared.settled.notify_all();
        }
        info!(
            "Stop requested for recurring task '{}' (invocation in progress: {})",
            self.shared.name, invoking
        );
        true
    }

    /// Wait for the driver to leave `Running`, at most `timeout`
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let mut state = self.shared.state.lock();
        wait_for(&self.shared.settled, &mut state, timeout, |s| {
            s.phase != DriverPhase::Running
        })
    }
}

impl Drain for RecurringTaskDriver {
    fn name(&self) -> &str {
        RecurringTaskDriver::name(self)
    }

    fn initiate_shutdown(&self) {
        self.stop();
    }

    fn await_termination(&self, timeout: Duration) -> bool {
        RecurringTaskDriver::await_termination(self, timeout)
    }
}

impl Drop for RecurringTaskDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

fn drive<F>(shared: Arc<Shared>, mut body: F)
where
    F: FnMut() -> std::result::Result<(), TaskError>,
{
    loop {
        let invocation = {
            let mut state = shared.state.lock();
            if state.stop_requested {
                break;
            }
            state.invoking = true;
            state.invocation_count += 1;
            state.invocation_count
        };

        info!("Recurring task '{}' invocation {} started", shared.name, invocation);
        let started = Instant::now();
        let result = run_contained(&mut body);

        match &result {
            Ok(()) => info!(
                "Recurring task '{}' invocation {} finished in {:?}",
                shared.name,
                invocation,
                started.elapsed()
            ),
            Err(e) => error!(
                "Recurring task '{}' invocation {}: {}",
                shared.name,
                invocation,
                Error::TaskInternalFailure(e.clone())
            ),
        }

        let mut state = shared.state.lock();
        state.invoking = false;
        if result.is_err() {
            state.failures += 1;
        }

        // Sleep out the delay unless a stop arrives first
        if wait_for(&shared.wake, &mut state, shared.delay, |s| s.stop_requested) {
            debug!("Recurring task '{}' delay interrupted by stop", shared.name);
            break;
        }
    }

    shared.mark_stopped();
}
