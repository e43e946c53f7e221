//! Logging setup and HTTP metrics

pub mod http_metrics;
pub mod logging;

pub use http_metrics::{HttpMetrics, UNMATCHED_PATH, UPKEEP_INTERVAL};
pub use logging::{init_logging, install_panic_hook};
