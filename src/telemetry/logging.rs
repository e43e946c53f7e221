use std::backtrace::Backtrace;

use tracing::error;
use tracing_subscriber::EnvFilter;

/// Log level for a `-v` count when `RUST_LOG` is not set
pub fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Install the global fmt subscriber
pub fn init_logging(verbose: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose))),
        )
        .init();
}

/// Route panics through `tracing` with a captured backtrace.
///
/// Handler panics are turned into 500 responses by the router; this hook makes
/// sure the panic site itself ends up in the logs.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = Backtrace::force_capture();
        error!("{}\n{}", info, backtrace);
    }));
}
