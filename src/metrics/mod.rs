//! Built-in metrics for the watch-reload-notify cycle.
//!
//! Provides OpenTelemetry metrics tracking:
//! - Reparse attempts/success/failures
//! - Reparse duration
//! - Failed stats of the watched file
//! - Pushes per listener role
//!
//! # Examples
//!
//! ```rust,no_run
//! use doorbell_config::prelude::*;
//! use opentelemetry::global;
//!
//! # fn example() -> Result<()> {
//! let meter = global::meter("doorbell");
//!
//! let watcher = ConfigWatcher::builder()
//!     .with_file("/etc/doorbell/doorbell.conf")
//!     .with_metrics(meter)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

mod watcher_metrics;

pub use watcher_metrics::WatcherMetrics;
