//! Worker pool bookkeeping guarded by the pool mutex

use std::collections::VecDeque;

use serde::Serialize;

use crate::tasks::{Task, TaskId};

/// A submitted task waiting for a worker slot
pub struct QueuedTask {
    pub id: TaskId,
    pub task: Task,
}

/// Mutable pool state. Every field is read and written under the pool lock.
pub struct PoolState {
    /// Whether new submissions are allowed
    pub accepting: bool,
    /// FIFO of tasks not yet picked up by a worker
    pub queued: VecDeque<QueuedTask>,
    /// Tasks currently executing; never exceeds the worker count
    pub in_flight: usize,
    pub peak_in_flight: usize,
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
}

impl PoolState {
    pub fn new() -> Self {
        Self {
            accepting: true,
            queued: VecDeque::new(),
            in_flight: 0,
            peak_in_flight: 0,
            submitted: 0,
            completed: 0,
            failed: 0,
        }
    }

    /// Queue a task and hand out its id
    pub fn enqueue(&mut self, task: Task) -> TaskId {
        self.submitted += 1;
        let id = TaskId::new(self.submitted);
        self.queued.push_back(QueuedTask { id, task });
        id
    }

    /// No task queued and none executing
    pub fn is_drained(&self) -> bool {
        self.in_flight == 0 && self.queued.is_empty()
    }

    /// Take the next task and count it as in flight
    pub fn start_next(&mut self) -> Option<QueuedTask> {
        let next = self.queued.pop_front()?;
        self.in_flight += 1;
        self.peak_in_flight = self.peak_in_flight.max(self.in_flight);
        Some(next)
    }

    /// Record the end of an in-flight task
    pub fn finish(&mut self, succeeded: bool) {
        self.in_flight -= 1;
        if succeeded {
            self.completed += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn snapshot(&self, name: &str, workers: usize) -> PoolStats {
        PoolStats {
            name: name.to_string(),
            workers,
            accepting: self.accepting,
            queued: self.queued.len(),
            in_flight: self.in_flight,
            peak_in_flight: self.peak_in_flight,
            submitted: self.submitted,
            completed: self.completed,
            failed: self.failed,
        }
    }
}

impl Default for PoolState {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of a pool, safe to log or serialize
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub name: String,
    pub workers: usize,
    pub accepting: bool,
    pub queued: usize,
    pub in_flight: usize,
    pub peak_in_flight: usize,
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_accepting_and_drained() {
        let state = PoolState::new();
        assert!(state.accepting);
        assert!(state.is_drained());
    }

    #[test]
    fn start_next_is_fifo_and_tracks_peak() {
        let mut state = PoolState::new();
        assert_eq!(state.enqueue(Box::new(|| Ok(()))), TaskId::new(1));
        assert_eq!(state.enqueue(Box::new(|| Ok(()))), TaskId::new(2));

        assert_eq!(state.start_next().map(|t| t.id), Some(TaskId::new(1)));
        assert_eq!(state.start_next().map(|t| t.id), Some(TaskId::new(2)));
        assert!(state.start_next().is_none());
        assert_eq!(state.in_flight, 2);
        assert_eq!(state.peak_in_flight, 2);
        assert!(!state.is_drained());

        state.finish(true);
        state.finish(false);
        assert!(state.is_drained());
        assert_eq!((state.completed, state.failed), (1, 1));
        assert_eq!(state.peak_in_flight, 2);
    }

    #[test]
    fn snapshot_serializes_counters() {
        let mut state = PoolState::new();
        state.accepting = false;
        let json = serde_json::to_value(state.snapshot("pool", 2)).unwrap();
        assert_eq!(json["name"], "pool");
        assert_eq!(json["workers"], 2);
        assert_eq!(json["accepting"], false);
    }
}
