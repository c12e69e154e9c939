//! Builder for constructing ConfigWatcher instances.

use crate::core::ConfigWatcher;
use crate::core::watcher::{DEFAULT_POLL_INTERVAL, Shared};
use crate::error::{ConfigError, Result};
use crate::sources::{ConfigSource, IniFileSource};
use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "metrics")]
use crate::metrics::WatcherMetrics;

/// Builder for constructing a `ConfigWatcher`.
///
/// # Examples
///
/// ```rust,no_run
/// use doorbell_config::prelude::*;
/// use std::time::Duration;
///
/// # fn example() -> Result<()> {
/// let watcher = ConfigWatcher::builder()
///     .with_file("/etc/doorbell/doorbell.conf")
///     .with_poll_interval(Duration::from_millis(250))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ConfigWatcherBuilder {
    file_path: Option<PathBuf>,
    custom_source: Option<Box<dyn ConfigSource>>,
    poll_interval: Duration,
    #[cfg(feature = "file-watch")]
    file_events: bool,
    #[cfg(feature = "metrics")]
    metrics: Option<WatcherMetrics>,
}

impl ConfigWatcherBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            file_path: None,
            custom_source: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            #[cfg(feature = "file-watch")]
            file_events: true,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Watch the INI file at `path`.
    ///
    /// Replaces any source set earlier with `with_source`.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self.custom_source = None;
        self
    }

    /// Watch a custom configuration source.
    ///
    /// Replaces any file set earlier with `with_file`.
    pub fn with_source<S: ConfigSource + 'static>(mut self, source: S) -> Self {
        self.custom_source = Some(Box::new(source));
        self.file_path = None;
        self
    }

    /// Set the period between ticks. Defaults to one second.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Enable or disable filesystem-event wakeups (enabled by default).
    ///
    /// When enabled, a write to the watched file cuts the current sleep short. The
    /// modification time check still decides whether anything is reparsed.
    #[cfg(feature = "file-watch")]
    pub fn with_file_events(mut self, enabled: bool) -> Self {
        self.file_events = enabled;
        self
    }

    /// Record OpenTelemetry metrics for every tick.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, meter: opentelemetry::metrics::Meter) -> Self {
        self.metrics = Some(WatcherMetrics::new(meter));
        self
    }

    /// Build the watcher. Nothing is read until the first tick.
    ///
    /// # Errors
    ///
    /// Returns an error if no source was given or the poll interval is zero.
    pub fn build(self) -> Result<ConfigWatcher> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::WatchError(
                "poll interval must be greater than zero".to_string(),
            ));
        }

        let source: Box<dyn ConfigSource> = match (self.custom_source, self.file_path) {
            (Some(source), _) => source,
            (None, Some(path)) => Box::new(IniFileSource::new(path)),
            (None, None) => return Err(ConfigError::MissingSource),
        };

        #[allow(unused_mut)]
        let mut shared = Shared::new(source);
        #[cfg(feature = "metrics")]
        shared.set_metrics(self.metrics);

        #[allow(unused_mut)]
        let mut watcher = ConfigWatcher::from_parts(shared, self.poll_interval);
        #[cfg(feature = "file-watch")]
        watcher.set_file_events(self.file_events);

        Ok(watcher)
    }
}

impl Default for ConfigWatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
