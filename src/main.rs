//! Drain Pool - run demo work until SIGTERM, then drain within the grace period
//!
//! This is the main entry point for the drain-pool application.

use std::{process::ExitCode, sync::Arc};
use tracing::info;

use drain_pool::{
    config::{Config, Mode},
    pool::WorkerPool,
    shutdown::{Drain, ShutdownCoordinator},
    tasks::{demo, RecurringTaskDriver},
};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("drain_pool={}", config.log_level()))
        .init();

    info!("Starting drain-pool v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: mode={:?}, workers={}, grace={}s",
        config.mode, config.workers, config.grace
    );

    let target = start_work(&config)?;
    let coordinator = Arc::new(ShutdownCoordinator::new(config.grace_period()).with_target(target));
    coordinator.install_signal_handler()?;

    info!(
        "Started, send a SIGTERM to shut down: kill -15 {}",
        std::process::id()
    );

    // Suspend until the shutdown handler has drained (or given up on) the work
    let report = coordinator.terminated().await;
    println!("{}", serde_json::to_string(&report)?);

    info!("Exiting with {:?}", report.outcome);
    Ok(report.exit_code())
}

/// Start the configured variant and return it as a drain target
fn start_work(config: &Config) -> anyhow::Result<Arc<dyn Drain>> {
    match config.mode {
        Mode::Pool => {
            let pool = WorkerPool::new("pool", config.workers)?;
            for i in 0..config.tasks {
                let fail = config.fail_task == Some(i);
                let id = pool.submit(demo::sleeping_task(i, config.task_duration(), fail))?;
                info!("Submitted demo task {} as {}", i, id);
            }
            Ok(Arc::new(pool))
        }
        Mode::Recurring => {
            let driver = RecurringTaskDriver::new("heartbeat", config.recurring_delay());
            driver.start(demo::heartbeat(config.task_duration()))?;
            Ok(Arc::new(driver))
        }
    }
}
