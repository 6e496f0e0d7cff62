//! Logger registration

use std::io::IsTerminal as _;

use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Installs the global tracing subscriber: INFO by default, overridable
/// through `RUST_LOG`.
pub fn register_logger() {
    let log_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}
