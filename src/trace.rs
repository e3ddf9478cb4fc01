//! Tracing initialization.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install a process-wide subscriber writing to stderr.
///
/// Intended for embedders and test binaries; the engine itself only emits
/// events and never depends on a subscriber being present. Safe to call
/// multiple times.
pub fn init() {
    INIT.call_once(|| {
        let under_test = std::env::var_os("NEXTEST").is_some()
            || std::env::var_os("CARGO_TARGET_TMPDIR").is_some();
        let level = if under_test {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };
        let filter = EnvFilter::from_default_env().add_directive(level.into());

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_target(true)
            .compact();

        let result = if under_test {
            builder.with_test_writer().try_init()
        } else {
            builder.with_writer(std::io::stderr).try_init()
        };
        if let Err(error) = result {
            eprintln!("failed to initialize tracing: {error}");
        }
    });
}
