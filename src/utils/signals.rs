//! Signal handling for graceful shutdown

use std::os::raw::c_int;

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;

/// Signals that request a graceful shutdown
pub const TERMINATION_SIGNALS: [c_int; 2] = [SIGTERM, SIGINT];

/// Register for termination signals (SIGTERM, SIGINT).
///
/// Must be called from within a tokio runtime.
pub fn termination_signals() -> std::io::Result<Signals> {
    Signals::new(TERMINATION_SIGNALS)
}

/// Human readable name used in log lines and shutdown reports
pub fn signal_name(signal: c_int) -> &'static str {
    match signal {
        SIGTERM => "SIGTERM",
        SIGINT => "SIGINT",
        _ => "unknown signal",
    }
}
