//! # Companion Telemetry
//!
//! Logging and metrics for the Companion-Sync workspace.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` with `EnvFilter`, pretty or JSON output
//! - **Metrics**: Prometheus counters, gauges and histograms in a crate
//!   registry, exposed as text via [`encode_metrics`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use companion_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_telemetry(&TelemetryConfig::from_env())?;
//!     // Logs and metrics are now being collected
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CS_SERVICE_NAME` | `companion-sync` | Service name in logs |
//! | `CS_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` also honoured) |
//! | `CS_JSON_LOGS` | `false` | JSON log output |
//! | `CS_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `CS_METRICS` | `true` | Register Prometheus metrics |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{env_filter, init_logging};
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, CHANGE_EVENTS, CHANNEL_DEGRADED,
    EXISTENCE_ATTEMPTS, LOADS, MUTATIONS, ROLLBACKS, SESSION_INIT, SESSION_INIT_DURATION,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and (optionally) metrics registration.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    if config.metrics_enabled {
        register_metrics()?;
    }
    init_logging(config)
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
