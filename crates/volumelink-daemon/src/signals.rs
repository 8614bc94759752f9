//! Signal handling for graceful shutdown.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use signal_hook::consts::TERM_SIGNALS;
use tracing::debug;

/// Set up signal handlers for graceful shutdown.
///
/// Returns a flag that becomes true once a termination signal (SIGTERM,
/// SIGINT, and SIGQUIT where available) is received. The control loop polls
/// it every tick, so the terminal is restored on the way out.
pub fn register_stop_flag() -> Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));

    for &signal in TERM_SIGNALS {
        signal_hook::flag::register(signal, Arc::clone(&flag))
            .with_context(|| format!("Failed to register handler for signal {signal}"))?;
    }
    debug!(count = TERM_SIGNALS.len(), "Termination signal handlers registered");

    Ok(flag)
}
