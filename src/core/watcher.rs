//! The polling watcher: detect a changed file, reparse it, push to listeners.

use crate::core::listeners::{
    DingListener, DongListener, HomeAutomationInformer, ListenerRole, ListenerSlots,
};
use crate::core::{ConfigStore, ConfigWatcherBuilder};
use crate::error::{ConfigError, Result};
use crate::sources::{ConfigSource, IniFileSource};
use arc_swap::{ArcSwap, ArcSwapOption};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

#[cfg(feature = "file-watch")]
use crate::notify::ChangeSignal;

#[cfg(feature = "metrics")]
use crate::metrics::WatcherMetrics;

/// Period between two ticks unless configured otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

const FILE_EVENT_SETTLE: Duration = Duration::from_millis(100);

/// What a single tick did.
#[derive(Debug)]
pub enum TickOutcome {
    /// The modification time matched the last successful parse, or the last
    /// failed one. Nothing was parsed or pushed.
    Unchanged,
    /// The file was reparsed and the new store published.
    Reloaded {
        /// Roles that received a push, in push order.
        notified: Vec<ListenerRole>,
    },
    /// The file could not be stat'ed or parsed. The previous store is kept.
    Failed(ConfigError),
}

impl TickOutcome {
    /// Whether this tick published a new store.
    pub fn is_reloaded(&self) -> bool {
        matches!(self, Self::Reloaded { .. })
    }
}

/// A successfully parsed store and the modification time it was parsed at.
struct Snapshot {
    store: Arc<ConfigStore>,
    modified: SystemTime,
}

/// Bookkeeping only touched while a tick is running.
#[derive(Default)]
struct TickState {
    /// Modification time of a revision that failed to parse.
    failed_at: Option<SystemTime>,
    /// Whether the previous tick failed to stat the file.
    stat_failing: bool,
}

/// State shared between the handle and the background task.
pub(crate) struct Shared {
    source: Box<dyn ConfigSource>,
    snapshot: ArcSwapOption<Snapshot>,
    listeners: ArcSwap<ListenerSlots>,
    tick_state: Mutex<TickState>,
    #[cfg(feature = "metrics")]
    metrics: Option<WatcherMetrics>,
}

impl Shared {
    pub(crate) fn new(source: Box<dyn ConfigSource>) -> Self {
        Self {
            source,
            snapshot: ArcSwapOption::empty(),
            listeners: ArcSwap::from_pointee(ListenerSlots::default()),
            tick_state: Mutex::new(TickState::default()),
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    #[cfg(feature = "metrics")]
    pub(crate) fn set_metrics(&mut self, metrics: Option<WatcherMetrics>) {
        self.metrics = metrics;
    }

    fn tick(&self) -> TickOutcome {
        // Serialises manual polls with the background loop
        let mut state = self
            .tick_state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let modified = match self.source.modified() {
            Ok(modified) => modified,
            Err(e) => {
                #[cfg(feature = "metrics")]
                if let Some(metrics) = &self.metrics {
                    metrics.record_stat_failure();
                }
                if state.stat_failing {
                    debug!(source = %self.source.name(), error = %e, "configuration still unavailable");
                } else {
                    warn!(source = %self.source.name(), error = %e, "cannot stat configuration, retrying next tick");
                    state.stat_failing = true;
                }
                return TickOutcome::Failed(e);
            }
        };

        if state.stat_failing {
            info!(source = %self.source.name(), "configuration is reachable again");
            state.stat_failing = false;
        }

        let unchanged = self
            .snapshot
            .load()
            .as_ref()
            .is_some_and(|snapshot| snapshot.modified == modified);
        if unchanged || state.failed_at == Some(modified) {
            debug!(source = %self.source.name(), "configuration unchanged");
            return TickOutcome::Unchanged;
        }

        #[cfg(feature = "metrics")]
        let timer = self.metrics.as_ref().map(WatcherMetrics::start_reparse);

        let store = match self.source.load() {
            Ok(store) => Arc::new(store),
            Err(e) => {
                #[cfg(feature = "metrics")]
                if let (Some(metrics), Some(timer)) = (&self.metrics, timer) {
                    metrics.record_reparse_failure(timer);
                }
                warn!(source = %self.source.name(), error = %e, "failed to parse configuration, keeping previous values");
                state.failed_at = Some(modified);
                return TickOutcome::Failed(e);
            }
        };

        #[cfg(feature = "metrics")]
        if let (Some(metrics), Some(timer)) = (&self.metrics, timer) {
            metrics.record_reparse_success(timer);
        }

        self.snapshot.store(Some(Arc::new(Snapshot {
            store: Arc::clone(&store),
            modified,
        })));
        state.failed_at = None;
        info!(source = %self.source.name(), "(re)parsed configuration");

        let notified = self.listeners.load().push_all(&store);

        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_pushes(&notified);
        }

        TickOutcome::Reloaded { notified }
    }
}

/// Watches one configuration file and pushes its values to the registered listeners.
///
/// Every tick the watcher compares the file's modification time with the one seen
/// at the last successful parse. When it differs the whole file is reparsed into a
/// fresh [`ConfigStore`], published atomically, and the ding, dong and
/// home-automation listeners receive their values in that order. Every change is
/// pushed, even if a listener's own values are the same as before.
///
/// A missing, unreadable or malformed file is logged and retried on the next tick;
/// the previous values stay in place.
///
/// # Examples
///
/// ```rust,no_run
/// use doorbell_config::prelude::*;
///
/// # async fn example() -> Result<()> {
/// let watcher = ConfigWatcher::new("/etc/doorbell/doorbell.conf");
/// watcher.start()?;
///
/// // ... later
/// if watcher.ready() {
///     let timeout = watcher.get_int("ha", "timeout")?;
///     println!("timeout: {timeout}s");
/// }
///
/// watcher.stop();
/// # Ok(())
/// # }
/// ```
pub struct ConfigWatcher {
    shared: Arc<Shared>,
    poll_interval: Duration,
    #[cfg(feature = "file-watch")]
    file_events: bool,
    running: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConfigWatcher {
    /// Create a watcher for the INI file at `path` with default settings.
    ///
    /// Nothing is read until the first tick.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::from_parts(
            Shared::new(Box::new(IniFileSource::new(path))),
            DEFAULT_POLL_INTERVAL,
        )
    }

    /// Create a builder for a watcher with custom settings.
    pub fn builder() -> ConfigWatcherBuilder {
        ConfigWatcherBuilder::new()
    }

    pub(crate) fn from_parts(shared: Shared, poll_interval: Duration) -> Self {
        let (running, _) = watch::channel(true);
        Self {
            shared: Arc::new(shared),
            poll_interval,
            #[cfg(feature = "file-watch")]
            file_events: true,
            running,
            task: Mutex::new(None),
        }
    }

    #[cfg(feature = "file-watch")]
    pub(crate) fn set_file_events(&mut self, enabled: bool) {
        self.file_events = enabled;
    }

    /// Start the polling loop on a background tokio task.
    ///
    /// The first tick runs immediately. If the watcher was already stopped the task
    /// exits without polling.
    ///
    /// # Errors
    ///
    /// Returns `NoRuntime` when called outside a tokio runtime and
    /// `AlreadyStarted` when called twice.
    pub fn start(&self) -> Result<()> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;

        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            return Err(ConfigError::AlreadyStarted);
        }

        let wakeup = self.wakeup();
        let shared = Arc::clone(&self.shared);
        let running = self.running.subscribe();
        let poll_interval = self.poll_interval;

        *task = Some(handle.spawn(run(shared, poll_interval, running, wakeup)));
        Ok(())
    }

    /// Ask the polling loop to exit.
    ///
    /// A parse that is already running completes, but no further tick starts.
    /// Calling this more than once has no further effect.
    pub fn stop(&self) {
        let stopped = self.running.send_if_modified(|running| std::mem::replace(running, false));
        if stopped {
            debug!(source = %self.shared.source.name(), "stop requested");
        }
    }

    /// Wait for the background task to finish. Returns immediately if it was never started.
    pub async fn join(&self) {
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(error = %e, "configuration watcher task failed");
            }
        }
    }

    /// Whether the loop has been started and not yet asked to stop.
    pub fn is_running(&self) -> bool {
        let started = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished());
        started && *self.running.borrow()
    }

    /// Run a single tick on the calling thread.
    ///
    /// This is what the background loop does once per period.
    pub fn poll_once(&self) -> TickOutcome {
        self.shared.tick()
    }

    /// Replace all three listener slots at once.
    ///
    /// Listeners are held weakly; a listener that has been dropped is skipped. A newly
    /// registered listener receives values on the next detected change, not immediately.
    pub fn register_listeners(
        &self,
        ding: Option<Arc<dyn DingListener>>,
        dong: Option<Arc<dyn DongListener>>,
        ha_informer: Option<Arc<dyn HomeAutomationInformer>>,
    ) {
        let slots = ListenerSlots::new(ding, dong, ha_informer);
        debug!(roles = ?slots.live_roles(), "registered listeners");
        self.shared.listeners.store(Arc::new(slots));
    }

    /// Whether at least one parse has succeeded.
    pub fn ready(&self) -> bool {
        self.shared.snapshot.load().is_some()
    }

    /// The store from the last successful parse, if any.
    pub fn snapshot(&self) -> Option<Arc<ConfigStore>> {
        self.shared
            .snapshot
            .load()
            .as_ref()
            .map(|snapshot| Arc::clone(&snapshot.store))
    }

    /// Modification time of the file at the last successful parse.
    pub fn last_modified(&self) -> Option<SystemTime> {
        self.shared
            .snapshot
            .load()
            .as_ref()
            .map(|snapshot| snapshot.modified)
    }

    /// The watched file, when the source is file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.shared.source.path()
    }

    /// The configured period between ticks.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Get an option from the current store as an integer.
    ///
    /// # Errors
    ///
    /// Returns `MissingSection` or `MissingOption` if the value is absent (including
    /// before the first successful parse) and `InvalidValue` if it is not an integer.
    pub fn get_int(&self, section: &str, option: &str) -> Result<i64> {
        self.with_store(|store| store.get_int(section, option))
    }

    /// Get an option from the current store as a boolean.
    pub fn get_bool(&self, section: &str, option: &str) -> Result<bool> {
        self.with_store(|store| store.get_bool(section, option))
    }

    /// Get an option from the current store as a float.
    pub fn get_float(&self, section: &str, option: &str) -> Result<f64> {
        self.with_store(|store| store.get_float(section, option))
    }

    /// Get an option from the current store as a string.
    pub fn get_string(&self, section: &str, option: &str) -> Result<String> {
        self.with_store(|store| store.get_string(section, option).map(str::to_string))
    }

    fn with_store<T>(&self, f: impl FnOnce(&ConfigStore) -> Result<T>) -> Result<T> {
        match self.shared.snapshot.load().as_ref() {
            Some(snapshot) => f(&snapshot.store),
            None => f(&ConfigStore::new()),
        }
    }

    #[cfg(feature = "file-watch")]
    fn wakeup(&self) -> Wakeup {
        if !self.file_events {
            return None;
        }
        let path = self.shared.source.path()?;
        match ChangeSignal::new(path) {
            Ok(signal) => Some(signal),
            Err(e) => {
                warn!(error = %e, "file events unavailable, relying on polling only");
                None
            }
        }
    }

    #[cfg(not(feature = "file-watch"))]
    fn wakeup(&self) -> Wakeup {}
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(feature = "file-watch")]
type Wakeup = Option<ChangeSignal>;

#[cfg(not(feature = "file-watch"))]
type Wakeup = ();

#[cfg(feature = "file-watch")]
async fn next_wakeup(wakeup: &mut Wakeup) {
    if let Some(signal) = wakeup.as_mut() {
        if signal.changed().await.is_some() {
            return;
        }
        *wakeup = None;
    }
    std::future::pending::<()>().await
}

#[cfg(not(feature = "file-watch"))]
async fn next_wakeup(_wakeup: &mut Wakeup) {
    std::future::pending::<()>().await
}

async fn run(
    shared: Arc<Shared>,
    poll_interval: Duration,
    mut running: watch::Receiver<bool>,
    mut wakeup: Wakeup,
) {
    info!(source = %shared.source.name(), ?poll_interval, "configuration watcher started");

    while *running.borrow_and_update() {
        let tick_shared = Arc::clone(&shared);
        if let Err(e) = tokio::task::spawn_blocking(move || tick_shared.tick()).await {
            error!(error = %e, "configuration tick panicked");
        }

        tokio::select! {
            _ = sleep(poll_interval) => {}
            changed = running.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = next_wakeup(&mut wakeup) => {
                debug!("woken early by filesystem event");
                // Let the writer finish before stat'ing
                sleep(FILE_EVENT_SETTLE).await;
            }
        }
    }

    info!(source = %shared.source.name(), "configuration watcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory source whose contents and timestamp are set by the test.
    struct MemorySource {
        state: Mutex<Option<(SystemTime, String)>>,
        loads: AtomicUsize,
    }

    impl MemorySource {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                state: Mutex::new(None),
                loads: AtomicUsize::new(0),
            })
        }

        fn write(&self, secs: u64, text: &str) {
            let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(secs);
            *self.state.lock().unwrap() = Some((modified, text.to_string()));
        }
    }

    impl ConfigSource for Arc<MemorySource> {
        fn modified(&self) -> Result<SystemTime> {
            self.state
                .lock()
                .unwrap()
                .as_ref()
                .map(|(modified, _)| *modified)
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound).into())
        }

        fn load(&self) -> Result<ConfigStore> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            let text = self
                .state
                .lock()
                .unwrap()
                .as_ref()
                .map(|(_, text)| text.clone())
                .ok_or_else(|| ConfigError::from(std::io::Error::from(std::io::ErrorKind::NotFound)))?;
            ConfigStore::from_ini_str(&text)
        }

        fn name(&self) -> String {
            "memory".to_string()
        }
    }

    fn watcher_for(source: &Arc<MemorySource>) -> ConfigWatcher {
        ConfigWatcher::builder()
            .with_source(Arc::clone(source))
            .build()
            .unwrap()
    }

    #[test]
    fn test_not_ready_before_first_parse() {
        let source = MemorySource::new();
        let watcher = watcher_for(&source);

        assert!(!watcher.ready());
        assert!(watcher.last_modified().is_none());
        assert!(watcher.get_int("ha", "timeout").unwrap_err().is_lookup_failure());
    }

    #[test]
    fn test_unchanged_timestamp_skips_reparse() {
        let source = MemorySource::new();
        source.write(10, "[ha]\ntimeout = 5\n");
        let watcher = watcher_for(&source);

        assert!(watcher.poll_once().is_reloaded());
        assert!(matches!(watcher.poll_once(), TickOutcome::Unchanged));
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_changed_timestamp_is_recorded() {
        let source = MemorySource::new();
        source.write(10, "[ha]\ntimeout = 5\n");
        let watcher = watcher_for(&source);
        watcher.poll_once();

        source.write(20, "[ha]\ntimeout = 7\n");
        assert!(watcher.poll_once().is_reloaded());
        assert_eq!(
            watcher.last_modified(),
            Some(SystemTime::UNIX_EPOCH + Duration::from_secs(20))
        );
        assert_eq!(watcher.get_int("ha", "timeout").unwrap(), 7);
    }

    #[test]
    fn test_older_timestamp_also_counts_as_change() {
        let source = MemorySource::new();
        source.write(20, "[ha]\ntimeout = 5\n");
        let watcher = watcher_for(&source);
        watcher.poll_once();

        source.write(10, "[ha]\ntimeout = 1\n");
        assert!(watcher.poll_once().is_reloaded());
        assert_eq!(watcher.get_int("ha", "timeout").unwrap(), 1);
    }

    #[test]
    fn test_missing_file_is_retried() {
        let source = MemorySource::new();
        let watcher = watcher_for(&source);

        assert!(matches!(
            watcher.poll_once(),
            TickOutcome::Failed(ConfigError::IoError(_))
        ));
        assert!(!watcher.ready());

        source.write(5, "[ha]\ntimeout = 5\n");
        assert!(watcher.poll_once().is_reloaded());
        assert!(watcher.ready());
    }

    #[test]
    fn test_malformed_revision_keeps_previous_store() {
        let source = MemorySource::new();
        source.write(10, "[ha]\ntimeout = 5\n");
        let watcher = watcher_for(&source);
        watcher.poll_once();

        source.write(20, "timeout = 6\n");
        assert!(matches!(
            watcher.poll_once(),
            TickOutcome::Failed(ConfigError::ParseError(_))
        ));
        assert_eq!(watcher.get_int("ha", "timeout").unwrap(), 5);
        assert_eq!(
            watcher.last_modified(),
            Some(SystemTime::UNIX_EPOCH + Duration::from_secs(10))
        );

        // Same broken revision is not parsed again
        assert!(matches!(watcher.poll_once(), TickOutcome::Unchanged));
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);

        source.write(30, "[ha]\ntimeout = 6\n");
        assert!(watcher.poll_once().is_reloaded());
        assert_eq!(watcher.get_int("ha", "timeout").unwrap(), 6);
    }

    #[test]
    fn test_store_replaced_wholesale() {
        let source = MemorySource::new();
        source.write(10, "[ha]\ntimeout = 5\n[hass]\nentity_id = bell\n");
        let watcher = watcher_for(&source);
        watcher.poll_once();

        let before = watcher.snapshot().unwrap();
        source.write(20, "[ha]\ntimeout = 5\n");
        watcher.poll_once();

        assert!(before.has_section("hass"));
        assert!(!watcher.snapshot().unwrap().has_section("hass"));
    }

    #[test]
    fn test_start_requires_runtime() {
        let watcher = watcher_for(&MemorySource::new());
        assert!(matches!(watcher.start(), Err(ConfigError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_start_twice() {
        let source = MemorySource::new();
        source.write(1, "[ha]\ntimeout = 5\n");
        let watcher = watcher_for(&source);

        watcher.start().unwrap();
        assert!(matches!(watcher.start(), Err(ConfigError::AlreadyStarted)));

        watcher.stop();
        watcher.join().await;
        assert!(!watcher.is_running());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let watcher = watcher_for(&MemorySource::new());
        watcher.stop();
        watcher.stop();
        assert!(!watcher.is_running());
    }
}
