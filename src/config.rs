//! Configuration and CLI argument handling

use std::time::Duration;

use clap::{Parser, ValueEnum};

/// Which variant the binary demonstrates
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Run a fixed batch of tasks once on the worker pool
    Pool,
    /// Re-run a single task body on a fixed delay until shutdown
    Recurring,
}

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "drain-pool")]
#[command(about = "A worker pool that drains in-flight work on SIGTERM")]
#[command(version)]
pub struct Config {
    /// Variant to run
    #[arg(short, long, value_enum, default_value = "pool")]
    pub mode: Mode,

    /// Number of worker threads in the pool
    #[arg(short, long, default_value = "2")]
    pub workers: usize,

    /// Grace period in seconds to wait for in-flight work on shutdown
    #[arg(short, long, default_value = "30")]
    pub grace: u64,

    /// Number of demo tasks submitted to the pool
    #[arg(short = 'n', long, default_value = "3")]
    pub tasks: usize,

    /// Duration of each demo task in seconds
    #[arg(long, default_value = "10")]
    pub task_secs: u64,

    /// Delay between recurring invocations in milliseconds
    #[arg(long, default_value = "1000")]
    pub delay_ms: u64,

    /// Index of a demo task that should fail instead of completing
    #[arg(long)]
    pub fail_task: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace)
    }

    pub fn task_duration(&self) -> Duration {
        Duration::from_secs(self.task_secs)
    }

    pub fn recurring_delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}
