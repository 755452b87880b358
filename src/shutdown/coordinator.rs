//! Turns a termination signal into exactly one bounded drain

use std::{
    os::raw::c_int,
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::Utc;
use futures::stream::{Stream, StreamExt};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{error, info, warn};

use super::{Drain, ShutdownReport, TargetReport};
use crate::{
    error::{Error, Result},
    state::{ShutdownCell, ShutdownState},
    utils::{catch_panic, signal_name, termination_signals},
};

/// Owns the pools and drivers to drain and runs the shutdown sequence once.
///
/// Built and wired explicitly at startup; the OS handler is attached with a
/// single call to [`ShutdownCoordinator::install_signal_handler`].
pub struct ShutdownCoordinator {
    targets: Vec<Arc<dyn Drain>>,
    grace_period: Duration,
    state: ShutdownCell,
    report_tx: watch::Sender<Option<ShutdownReport>>,
}

impl ShutdownCoordinator {
    pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);

    pub fn new(grace_period: Duration) -> Self {
        let (report_tx, _) = watch::channel(None);
        Self {
            targets: Vec::new(),
            grace_period,
            state: ShutdownCell::new(),
            report_tx,
        }
    }

    /// Add a pool or driver to drain. Targets drain in registration order.
    pub fn with_target(mut self, target: Arc<dyn Drain>) -> Self {
        self.targets.push(target);
        self
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    pub fn state(&self) -> ShutdownState {
        self.state.get()
    }

    /// Report of the finished shutdown run, if any
    pub fn report(&self) -> Option<ShutdownReport> {
        self.report_tx.borrow().clone()
    }

    /// Register for SIGTERM/SIGINT and spawn the listener task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn install_signal_handler(self: &Arc<Self>) -> Result<JoinHandle<()>> {
        let signals = termination_signals().map_err(Error::SignalRegistration)?;
        info!("Signal handler installed for SIGTERM and SIGINT");
        Ok(tokio::spawn(Arc::clone(self).listen(signals)))
    }

    /// Consume a stream of signal numbers, starting the shutdown on the first.
    ///
    /// The drain runs on a blocking thread so the listener keeps draining the
    /// stream; repeated signals are logged and ignored.
    pub async fn listen<S>(self: Arc<Self>, mut signals: S)
    where
        S: Stream<Item = c_int> + Unpin + Send + 'static,
    {
        while let Some(signal) = signals.next().await {
            let trigger = signal_name(signal);
            info!("Received signal: {}", trigger);

            if self.state() != ShutdownState::Running {
                info!("Shutdown already in progress, ignoring {}", trigger);
                continue;
            }

            let coordinator = Arc::clone(&self);
            let handler = tokio::task::spawn_blocking(move || coordinator.shutdown(trigger));
            tokio::spawn(Arc::clone(&self).supervise(trigger, handler));
        }
    }

    /// Run the shutdown sequence. Only the first call does anything.
    ///
    /// Blocks for at most the grace period (plus scheduling slack). Returns
    /// `None` when another call already started the shutdown.
    pub fn shutdown(&self, trigger: &str) -> Option<ShutdownReport> {
        if !self.state.advance(ShutdownState::ShuttingDown) {
            info!("Shutdown already in progress, ignoring {}", trigger);
            return None;
        }

        info!(
            "Shutting down ({}), waiting up to {:?} for in-flight work",
            trigger, self.grace_period
        );
        let started_at = Utc::now();
        let started = Instant::now();
        let deadline = started.checked_add(self.grace_period);
        let mut faults = Vec::new();

        // Close every target before waiting on any of them
        for target in &self.targets {
            if let Err(message) = catch_panic(|| target.initiate_shutdown()) {
                faults.push(Self::fault(target.name(), message));
            }
        }

        let mut targets = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            let remaining = deadline.map_or(self.grace_period, |deadline| {
                deadline.saturating_duration_since(Instant::now())
            });
            let drained = match catch_panic(|| target.await_termination(remaining)) {
                Ok(drained) => drained,
                Err(message) => {
                    faults.push(Self::fault(target.name(), message));
                    false
                }
            };
            if !drained {
                warn!(
                    "'{}' still has work in flight: {}",
                    target.name(),
                    Error::ShutdownTimeout(self.grace_period)
                );
            }
            targets.push(TargetReport {
                name: target.name().to_string(),
                drained,
            });
        }

        let report = ShutdownReport::new(
            trigger,
            self.grace_period,
            started_at,
            started.elapsed(),
            targets,
            faults,
        );
        if report.is_drained() {
            info!("Shutdown complete, all work drained in {} ms", report.elapsed_ms);
        } else {
            warn!(
                "Shutdown finished without a full drain ({:?}), abandoning remaining work",
                report.outcome
            );
        }

        self.finish(report.clone());
        Some(report)
    }

    /// Wait until a shutdown run has finished and return its report
    pub async fn terminated(&self) -> ShutdownReport {
        let mut rx = self.report_tx.subscribe();
        loop {
            if let Some(report) = rx.borrow_and_update().clone() {
                return report;
            }
            // The sender lives in `self`, so `changed` cannot fail while we borrow it
            let _ = rx.changed().await;
        }
    }

    /// Log a join failure of the blocking handler and still publish a report
    async fn supervise(
        self: Arc<Self>,
        trigger: &'static str,
        handler: JoinHandle<Option<ShutdownReport>>,
    ) {
        if let Err(e) = handler.await {
            self.handler_failed(trigger, &e);
        }
    }

    /// Publish a faulted report for a handler that died before finishing
    fn handler_failed(&self, trigger: &str, cause: &dyn std::error::Error) {
        let fault = Error::SignalHandlerFault(cause.to_string());
        error!("{}", fault);
        self.finish(ShutdownReport::faulted(trigger, self.grace_period, fault.to_string()));
    }

    fn finish(&self, report: ShutdownReport) {
        self.state.advance(ShutdownState::Terminated);
        self.report_tx.send_replace(Some(report));
    }

    fn fault(target: &str, message: String) -> String {
        let fault = Error::SignalHandlerFault(format!("'{}' panicked: {}", target, message));
        error!("{}", fault);
        fault.to_string()
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_GRACE_PERIOD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::ShutdownOutcome;
    use signal_hook::consts::{SIGINT, SIGTERM};
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        thread,
    };

    /// Drain target that records calls and sleeps instead of draining
    struct FakeTarget {
        name: &'static str,
        busy_for: Duration,
        panics: bool,
        initiated: AtomicUsize,
        timeouts: parking_lot::Mutex<Vec<Duration>>,
    }

    impl FakeTarget {
        fn new(name: &'static str, busy_for: Duration) -> Arc<Self> {
            Arc::new(Self {
                name,
                busy_for,
                panics: false,
                initiated: AtomicUsize::new(0),
                timeouts: parking_lot::Mutex::new(Vec::new()),
            })
        }

        fn panicking(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                busy_for: Duration::ZERO,
                panics: true,
                initiated: AtomicUsize::new(0),
                timeouts: parking_lot::Mutex::new(Vec::new()),
            })
        }
    }

    impl Drain for FakeTarget {
        fn name(&self) -> &str {
            self.name
        }

        fn initiate_shutdown(&self) {
            self.initiated.fetch_add(1, Ordering::SeqCst);
        }

        fn await_termination(&self, timeout: Duration) -> bool {
            self.timeouts.lock().push(timeout);
            if self.panics {
                panic!("drain blew up");
            }
            thread::sleep(self.busy_for.min(timeout));
            self.busy_for <= timeout
        }
    }

    #[test]
    fn shutdown_runs_exactly_once() {
        let target = FakeTarget::new("pool", Duration::ZERO);
        let coordinator =
            ShutdownCoordinator::new(Duration::from_secs(1)).with_target(target.clone());

        let report = coordinator.shutdown("test").unwrap();
        assert!(report.is_drained());
        assert!(coordinator.shutdown("test").is_none());
        assert!(coordinator.shutdown("test").is_none());

        assert_eq!(target.initiated.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.state(), ShutdownState::Terminated);
        assert_eq!(coordinator.report(), Some(report));
    }

    #[test]
    fn targets_share_one_deadline() {
        let slow = FakeTarget::new("slow", Duration::from_secs(10));
        let fast = FakeTarget::new("fast", Duration::ZERO);
        let coordinator = ShutdownCoordinator::new(Duration::from_millis(200))
            .with_target(slow.clone())
            .with_target(fast.clone());

        let started = Instant::now();
        let report = coordinator.shutdown("test").unwrap();
        assert!(started.elapsed() < Duration::from_millis(300));

        assert_eq!(report.outcome, ShutdownOutcome::TimedOut);
        assert_eq!(report.abandoned().collect::<Vec<_>>(), vec!["slow"]);
        // `fast` only got what `slow` left over
        assert!(fast.timeouts.lock()[0] < Duration::from_millis(50));
        assert_eq!(fast.initiated.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_target_is_reported_and_others_still_drain() {
        let broken = FakeTarget::panicking("broken");
        let healthy = FakeTarget::new("healthy", Duration::ZERO);
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(1))
            .with_target(broken)
            .with_target(healthy.clone());

        let report = coordinator.shutdown("test").unwrap();
        assert_eq!(report.outcome, ShutdownOutcome::Faulted);
        assert_eq!(report.faults.len(), 1);
        assert!(report.faults[0].contains("drain blew up"));
        assert!(report.targets[1].drained);
        assert_eq!(coordinator.state(), ShutdownState::Terminated);
    }

    #[tokio::test]
    async fn repeated_signals_start_one_shutdown() {
        let target = FakeTarget::new("pool", Duration::from_millis(50));
        let coordinator = Arc::new(
            ShutdownCoordinator::new(Duration::from_secs(1)).with_target(target.clone()),
        );

        let signals = futures::stream::iter(vec![SIGTERM, SIGTERM, SIGINT]);
        Arc::clone(&coordinator).listen(signals).await;

        let report = coordinator.terminated().await;
        assert_eq!(report.trigger, "SIGTERM");
        assert!(report.is_drained());
        assert_eq!(target.initiated.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_failure_publishes_faulted_report() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(1));
        let cause = std::io::Error::new(std::io::ErrorKind::Other, "handler thread lost");

        coordinator.handler_failed("SIGTERM", &cause);

        let report = coordinator.report().unwrap();
        assert_eq!(report.outcome, ShutdownOutcome::Faulted);
        assert_eq!(report.trigger, "SIGTERM");
        assert_eq!(report.faults.len(), 1);
        assert!(report.faults[0].starts_with("shutdown handler fault"));
        assert!(report.faults[0].contains("handler thread lost"));
        assert_eq!(coordinator.state(), ShutdownState::Terminated);
    }

    #[tokio::test]
    async fn panicked_handler_thread_still_terminates() {
        let coordinator = Arc::new(ShutdownCoordinator::new(Duration::from_secs(1)));
        let handler = tokio::task::spawn_blocking(|| -> Option<ShutdownReport> {
            panic!("handler died mid-drain")
        });

        Arc::clone(&coordinator).supervise("SIGINT", handler).await;

        let report = tokio::time::timeout(Duration::from_secs(5), coordinator.terminated())
            .await
            .unwrap();
        assert_eq!(report.outcome, ShutdownOutcome::Faulted);
        assert_eq!(report.trigger, "SIGINT");
        assert_eq!(report.outcome.exit_status(), 3);
    }

    #[tokio::test]
    async fn terminated_waits_for_a_direct_shutdown() {
        let coordinator = Arc::new(ShutdownCoordinator::default());
        assert_eq!(coordinator.grace_period(), Duration::from_secs(30));

        let runner = Arc::clone(&coordinator);
        tokio::task::spawn_blocking(move || runner.shutdown("manual"));

        let report = tokio::time::timeout(Duration::from_secs(5), coordinator.terminated())
            .await
            .unwrap();
        assert_eq!(report.trigger, "manual");
        assert!(report.is_drained());
    }
}
