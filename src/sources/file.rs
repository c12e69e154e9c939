//! INI file configuration source.

use super::ConfigSource;
use crate::core::ConfigStore;
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// INI file configuration source.
///
/// The file is re-read from disk on every load; nothing is cached between calls.
///
/// # Examples
///
/// ```rust,no_run
/// use doorbell_config::sources::{ConfigSource, IniFileSource};
///
/// let source = IniFileSource::new("/etc/doorbell/doorbell.conf");
/// let store = source.load().unwrap();
/// println!("{:?}", store.get_string("sound", "ding_soundfile"));
/// ```
#[derive(Debug, Clone)]
pub struct IniFileSource {
    path: PathBuf,
}

impl IniFileSource {
    /// Create a new source for the file at `path`. The file does not need to exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigSource for IniFileSource {
    fn modified(&self) -> Result<SystemTime> {
        Ok(fs::metadata(&self.path)?.modified()?)
    }

    fn load(&self) -> Result<ConfigStore> {
        let text = fs::read_to_string(&self.path)?;
        ConfigStore::from_ini_str(&text)
    }

    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}
