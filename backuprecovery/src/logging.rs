//! Log setup for the plugin binary
//!
//! Everything goes to stderr; stdout carries the plugin handshake.

use tfplug::LogLevel;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `RUST_LOG` wins over the level Terraform asked for through `TF_LOG`
pub fn filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Installs the global subscriber
///
/// Returns false when one was already installed.
pub fn init(level: LogLevel) -> bool {
    tracing_subscriber::registry()
        .with(filter(level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn rust_log_overrides_terraform_level() {
        std::env::set_var("RUST_LOG", "backuprecovery=trace");
        assert_eq!(filter(LogLevel::Warn).to_string(), "backuprecovery=trace");
        std::env::remove_var("RUST_LOG");

        assert_eq!(filter(LogLevel::Debug).to_string(), "debug");
    }
}
