//! Watcher metrics tracking using OpenTelemetry.

use crate::core::ListenerRole;
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use std::time::Instant;

/// Metrics collector for watcher ticks.
///
/// # Examples
///
/// ```rust,no_run
/// use doorbell_config::metrics::WatcherMetrics;
/// use opentelemetry::global;
///
/// let meter = global::meter("doorbell-config");
/// let metrics = WatcherMetrics::new(meter);
///
/// let timer = metrics.start_reparse();
/// // ... parse the file ...
/// metrics.record_reparse_success(timer);
/// ```
#[derive(Clone)]
pub struct WatcherMetrics {
    reparse_attempts: Counter<u64>,
    reparse_success: Counter<u64>,
    reparse_failures: Counter<u64>,
    reparse_duration: Histogram<f64>,
    stat_failures: Counter<u64>,
    listener_pushes: Counter<u64>,
}

impl WatcherMetrics {
    /// Create a new metrics collector with the provided meter.
    pub fn new(meter: Meter) -> Self {
        let reparse_attempts = meter
            .u64_counter("doorbell_config.reparse.attempts")
            .with_description("Total number of reparse attempts")
            .build();

        let reparse_success = meter
            .u64_counter("doorbell_config.reparse.success")
            .with_description("Number of successful reparses")
            .build();

        let reparse_failures = meter
            .u64_counter("doorbell_config.reparse.failures")
            .with_description("Number of failed reparses")
            .build();

        let reparse_duration = meter
            .f64_histogram("doorbell_config.reparse.duration")
            .with_description("Duration of reparse operations in seconds")
            .with_unit("s")
            .build();

        let stat_failures = meter
            .u64_counter("doorbell_config.stat.failures")
            .with_description("Ticks where the watched file could not be stat'ed")
            .build();

        let listener_pushes = meter
            .u64_counter("doorbell_config.listener.pushes")
            .with_description("Configuration pushes delivered to listeners")
            .build();

        Self {
            reparse_attempts,
            reparse_success,
            reparse_failures,
            reparse_duration,
            stat_failures,
            listener_pushes,
        }
    }

    /// Start a reparse timer.
    ///
    /// Pass the returned `Instant` to `record_reparse_success` or
    /// `record_reparse_failure` when the parse completes.
    pub fn start_reparse(&self) -> Instant {
        self.reparse_attempts.add(1, &[]);
        Instant::now()
    }

    /// Record a successful reparse.
    pub fn record_reparse_success(&self, start: Instant) {
        self.reparse_success.add(1, &[]);
        self.reparse_duration.record(start.elapsed().as_secs_f64(), &[]);
    }

    /// Record a failed reparse.
    pub fn record_reparse_failure(&self, start: Instant) {
        self.reparse_failures.add(1, &[]);
        self.reparse_duration.record(start.elapsed().as_secs_f64(), &[]);
    }

    /// Record a tick where the file could not be stat'ed.
    pub fn record_stat_failure(&self) {
        self.stat_failures.add(1, &[]);
    }

    /// Record the roles that received a push.
    pub fn record_pushes(&self, roles: &[ListenerRole]) {
        for role in roles {
            self.listener_pushes
                .add(1, &[KeyValue::new("role", role.to_string())]);
        }
    }
}
