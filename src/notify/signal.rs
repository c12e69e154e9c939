//! Change signal driven by the `notify` crate.

use crate::error::{ConfigError, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Signals when the filesystem reports a change to one file.
///
/// The parent directory is watched rather than the file itself so that editors
/// which save by writing a temporary file and renaming it are still noticed.
/// Bursts of events collapse into a single pending signal.
///
/// # Examples
///
/// ```rust,no_run
/// use doorbell_config::notify::ChangeSignal;
///
/// # async fn example() -> doorbell_config::error::Result<()> {
/// let mut signal = ChangeSignal::new("/etc/doorbell/doorbell.conf")?;
///
/// while signal.changed().await.is_some() {
///     println!("doorbell.conf touched");
/// }
/// # Ok(())
/// # }
/// ```
pub struct ChangeSignal {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<()>,
    watched_dir: PathBuf,
}

impl ChangeSignal {
    /// Start watching the directory containing `path` for events on that file.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory does not exist or cannot be watched.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file_name: OsString = path
            .file_name()
            .ok_or_else(|| {
                ConfigError::WatchError(format!("{} does not name a file", path.display()))
            })?
            .to_os_string();

        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let watched_dir = parent.canonicalize().map_err(|e| {
            ConfigError::WatchError(format!("Failed to resolve {}: {}", parent.display(), e))
        })?;

        // Capacity 1: one pending wakeup is as good as many
        let (tx, rx) = mpsc::channel(1);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if !matches!(
                        event.kind,
                        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                    ) {
                        return;
                    }

                    let ours = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().is_some_and(|n| n == file_name));
                    if ours {
                        debug!(kind = ?event.kind, "filesystem event on watched file");
                        let _ = tx.try_send(());
                    }
                }
                Err(e) => warn!(error = %e, "filesystem watcher error"),
            }
        })
        .map_err(|e| ConfigError::WatchError(format!("Failed to create file watcher: {}", e)))?;

        watcher
            .watch(&watched_dir, RecursiveMode::NonRecursive)
            .map_err(|e| {
                ConfigError::WatchError(format!(
                    "Failed to watch {}: {}",
                    watched_dir.display(),
                    e
                ))
            })?;

        Ok(Self {
            _watcher: watcher,
            rx,
            watched_dir,
        })
    }

    /// Wait for the next change. Returns `None` once the underlying watcher has shut down.
    pub async fn changed(&mut self) -> Option<()> {
        self.rx.recv().await
    }

    /// The directory being watched.
    pub fn watched_dir(&self) -> &Path {
        &self.watched_dir
    }
}
