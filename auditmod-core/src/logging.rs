//! Structured logging using **tracing**.
//!
//! Core passes emit events (`debug!` for dropped declarations, `warn!` for
//! skipped units, `info!` for pass summaries). The JSON subscriber writes to
//! stderr so stdout stays reserved for reports.

use tracing::{info, warn};

/// Initializes the global tracing subscriber.
///
/// Call once at program start. Output is JSON on stderr.
///
/// # Environment Variables
/// - `RUST_LOG`: Controls log filtering (e.g., `RUST_LOG=auditmod_core=debug`)
pub fn init_structured_logging() {
    // try_init: a second call (tests, embedding) must not panic
    let _ = tracing_subscriber::fmt()
        .json()
        .with_ansi(false)
        .with_level(true)
        .with_target(true)
        .with_current_span(true)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

/// Logs a warning event.
pub fn log_warn(message: &str) {
    warn!(detail = %message);
}

/// Logs an info event.
pub fn log_info(message: &str) {
    info!(detail = %message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_does_not_panic() {
        init_structured_logging();
        init_structured_logging();
        log_info("logging initialized");
        log_warn("second init ignored");
    }
}
