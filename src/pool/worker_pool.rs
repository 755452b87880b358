//! Worker pool with a FIFO queue and bounded-wait termination

use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info};

use crate::{
    error::{Error, Result, TaskError},
    shutdown::Drain,
    state::{PoolState, PoolStats, QueuedTask, ShutdownCell, ShutdownState},
    tasks::{run_contained, TaskId},
    utils::wait_for,
};

/// State shared between the pool handle and its worker threads
struct Shared {
    name: String,
    workers: usize,
    state: Mutex<PoolState>,
    /// Signalled on submission and when the pool stops accepting
    task_ready: Condvar,
    /// Signalled whenever the last in-flight task finishes with an empty queue
    drained: Condvar,
    lifecycle: ShutdownCell,
}

impl Shared {
    /// Stop accepting submissions. Returns `true` for the call that did it.
    fn close(&self) -> bool {
        let mut state = self.state.lock();
        if !state.accepting {
            return false;
        }
        state.accepting = false;
        self.lifecycle.advance(ShutdownState::ShuttingDown);
        let queued = state.queued.len();
        let in_flight = state.in_flight;
        drop(state);

        // Idle workers re-check the queue and exit once it is empty
        self.task_ready.notify_all();
        info!(
            "Pool '{}' stopped accepting tasks ({} queued, {} in flight)",
            self.name, queued, in_flight
        );
        true
    }
}

/// A fixed number of worker threads pulling tasks from one FIFO queue.
///
/// The `accepting` check and the enqueue happen under the same lock as
/// [`WorkerPool::initiate_shutdown`], so no submission can land after
/// shutdown has begun.
pub struct WorkerPool {
    shared: Arc<Shared>,
}

impl WorkerPool {
    /// Create the pool and start `workers` threads
    pub fn new(name: impl Into<String>, workers: usize) -> Result<Self> {
        let name = name.into();
        if workers == 0 {
            return Err(Error::InvalidConfig(format!(
                "pool '{}' needs at least one worker",
                name
            )));
        }

        let shared = Arc::new(Shared {
            name,
            workers,
            state: Mutex::new(PoolState::new()),
            task_ready: Condvar::new(),
            drained: Condvar::new(),
            lifecycle: ShutdownCell::new(),
        });

        for worker_id in 0..workers {
            let worker_shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("{}-worker-{}", shared.name, worker_id))
                .spawn(move || worker_loop(worker_id, worker_shared));

            if let Err(e) = spawned {
                // Let the workers that did start exit instead of idling forever
                shared.close();
                return Err(Error::Spawn(e));
            }
        }

        info!("Worker pool '{}' started with {} workers", shared.name, workers);
        Ok(Self { shared })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn workers(&self) -> usize {
        self.shared.workers
    }

    pub fn state(&self) -> ShutdownState {
        self.shared.lifecycle.get()
    }

    pub fn stats(&self) -> PoolStats {
        self.shared
            .state
            .lock()
            .snapshot(&self.shared.name, self.shared.workers)
    }

    /// Queue a task for execution.
    ///
    /// Fails with [`Error::RejectedSubmission`] once shutdown has begun; the
    /// task is dropped without running.
    pub fn submit<F>(&self, task: F) -> Result<TaskId>
    where
        F: FnOnce() -> std::result::Result<(), TaskError> + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        if !state.accepting {
            debug!("Pool '{}' rejected a submission during shutdown", self.shared.name);
            return Err(Error::RejectedSubmission(self.shared.name.clone()));
        }
        let id = state.enqueue(Box::new(task));
        drop(state);

        self.shared.task_ready.notify_one();
        debug!("Task {} queued on pool '{}'", id, self.shared.name);
        Ok(id)
    }

    /// Stop accepting new tasks. Running and queued tasks still complete.
    ///
    /// Idempotent: returns `true` only for the call that closed the pool.
    pub fn initiate_shutdown(&self) -> bool {
        self.shared.close()
    }

    /// Wait until nothing is queued or in flight, or until `timeout` elapses.
    ///
    /// Returns `true` when the pool drained in time.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let mut state = self.shared.state.lock();
        let drained = wait_for(&self.shared.drained, &mut state, timeout, PoolState::is_drained);

        if drained && !state.accepting && self.shared.lifecycle.advance(ShutdownState::Terminated) {
            info!("Pool '{}' terminated", self.shared.name);
        }
        drained
    }
}

impl Drain for WorkerPool {
    fn name(&self) -> &str {
        WorkerPool::name(self)
    }

    fn initiate_shutdown(&self) {
        WorkerPool::initiate_shutdown(self);
    }

    fn await_termination(&self, timeout: Duration) -> bool {
        WorkerPool::await_termination(self, timeout)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shared.close();
    }
}

/// Run tasks one at a time until the pool is closed and the queue is empty
fn worker_loop(worker_id: usize, shared: Arc<Shared>) {
    debug!("[{}/worker-{}] started", shared.name, worker_id);

    loop {
        let next = {
            let mut state = shared.state.lock();
            loop {
                if let Some(next) = state.start_next() {
                    break Some(next);
                }
                if !state.accepting {
                    break None;
                }
                shared.task_ready.wait(&mut state);
            }
        };

        let Some(QueuedTask { id, task }) = next else {
            break;
        };

        info!("[{}/worker-{}] Task {} started", shared.name, worker_id, id);
        let started = Instant::now();
        let result = run_contained(task);

        match &result {
            Ok(()) => info!(
                "[{}/worker-{}] Task {} finished in {:?}",
                shared.name,
                worker_id,
                id,
                started.elapsed()
            ),
            Err(e) => error!(
                "[{}/worker-{}] Task {}: {}",
                shared.name,
                worker_id,
                id,
                Error::TaskInternalFailure(e.clone())
            ),
        }

        let mut state = shared.state.lock();
        state.finish(result.is_ok());
        if state.is_drained() {
            shared.drained.notify_all();
        }
    }

    debug!("[{}/worker-{}] exiting", shared.name, worker_id);
}
