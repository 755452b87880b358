//! Shutdown report structures

use std::{process::ExitCode, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// How a shutdown run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownOutcome {
    /// Every target drained inside the grace period
    Drained,
    /// The grace period expired with work still in flight
    TimedOut,
    /// The handler hit a fault; drain state is unknown
    Faulted,
}

impl ShutdownOutcome {
    /// Process exit status for this outcome
    pub fn exit_status(self) -> u8 {
        match self {
            Self::Drained => 0,
            Self::TimedOut => 2,
            Self::Faulted => 3,
        }
    }
}

/// Drain result of a single target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetReport {
    pub name: String,
    pub drained: bool,
}

/// Outcome of a shutdown run, logged and printed on exit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShutdownReport {
    pub outcome: ShutdownOutcome,
    pub trigger: String,
    pub grace_period_ms: u64,
    pub elapsed_ms: u64,
    pub started_at: DateTime<Utc>,
    pub targets: Vec<TargetReport>,
    pub faults: Vec<String>,
}

impl ShutdownReport {
    pub fn new(
        trigger: &str,
        grace_period: Duration,
        started_at: DateTime<Utc>,
        elapsed: Duration,
        targets: Vec<TargetReport>,
        faults: Vec<String>,
    ) -> Self {
        let outcome = if !faults.is_empty() {
            ShutdownOutcome::Faulted
        } else if targets.iter().all(|t| t.drained) {
            ShutdownOutcome::Drained
        } else {
            ShutdownOutcome::TimedOut
        };

        Self {
            outcome,
            trigger: trigger.to_string(),
            grace_period_ms: millis(grace_period),
            elapsed_ms: millis(elapsed),
            started_at,
            targets,
            faults,
        }
    }

    /// Report for a handler that died before it could finish draining
    pub fn faulted(trigger: &str, grace_period: Duration, fault: String) -> Self {
        Self::new(trigger, grace_period, Utc::now(), Duration::ZERO, Vec::new(), vec![fault])
    }

    pub fn is_drained(&self) -> bool {
        self.outcome == ShutdownOutcome::Drained
    }

    /// Names of targets that still had work when the grace period ran out
    pub fn abandoned(&self) -> impl Iterator<Item = &str> {
        self.targets
            .iter()
            .filter(|t| !t.drained)
            .map(|t| t.name.as_str())
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.outcome.exit_status())
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
