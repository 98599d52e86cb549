//! Tracing initialization for tests and binaries.
//!
//! Provides centralized tracing setup with environment-based filtering.

#[cfg(test)]
use once_cell::sync::Lazy;

/// Initialize tracing for tests with environment-based filtering.
///
/// Uses RUST_LOG environment variable to control output:
/// - `RUST_LOG=hfreceiver=debug` - Show all debug output
/// - `RUST_LOG=hfreceiver::sync=trace` - Trace specific module
/// - `RUST_LOG=hfreceiver=debug,hfreceiver::sync=trace` - Mixed levels
///
/// Call this once at the start of each test that needs tracing.
/// Multiple calls are safe (uses once_cell).
#[cfg(test)]
pub fn init_test_tracing() {
    static TRACING: Lazy<()> = Lazy::new(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("hfreceiver=warn"));

        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_line_number(true)
            .with_test_writer()
            .init();
    });

    Lazy::force(&TRACING);
}

/// Initialize tracing for the daemon binary: timestamped, leveled lines on
/// stderr, filtered by `log_level` unless RUST_LOG overrides it.
///
/// Call this early in main() to enable tracing throughout the application.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("hfreceiver={log_level}")));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
