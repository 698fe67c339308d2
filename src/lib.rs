pub mod config;
pub mod credentials;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod pricing;
pub mod storage;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogFormat;

/// Initialize tracing/logging on stderr
///
/// `RUST_LOG` wins when set. Otherwise only warnings are shown, or
/// everything from this crate at debug level when `verbose` is set.
///
/// Note: This function can only be called once.
pub fn init_tracing(verbose: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("warn,falgen=debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}
