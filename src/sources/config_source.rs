//! Configuration source trait.

use crate::core::ConfigStore;
use crate::error::Result;
use std::path::Path;
use std::time::SystemTime;

/// Trait for configuration sources the watcher can poll.
///
/// The watcher calls [`modified`](ConfigSource::modified) every tick and only calls
/// [`load`](ConfigSource::load) when the returned timestamp differs from the one
/// recorded at the last successful load.
pub trait ConfigSource: Send + Sync {
    /// Current modification timestamp of the source.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is missing or cannot be inspected.
    fn modified(&self) -> Result<SystemTime>;

    /// Read and parse the whole source into a fresh store.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or parsed.
    fn load(&self) -> Result<ConfigStore>;

    /// Get a human-readable name for this source (for logging/debugging).
    fn name(&self) -> String;

    /// Filesystem path backing this source, if any. Used for file-event wakeups.
    fn path(&self) -> Option<&Path> {
        None
    }
}
