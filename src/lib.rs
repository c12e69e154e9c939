//! # doorbell-config
//!
//! Watches a doorbell's INI configuration file and pushes reparsed values to the
//! components that play sounds and inform home-automation systems.
//!
//! ## Overview
//!
//! A [`ConfigWatcher`](core::ConfigWatcher) polls the file's modification time on a
//! fixed period (one second by default). When it changes, the whole file is reparsed
//! into an immutable [`ConfigStore`](core::ConfigStore), published atomically with
//! `arc-swap`, and each registered listener receives the values it consumes:
//!
//! - **ding**: `[sound] ding_soundfile`, `noise_location`
//! - **dong**: `[sound] dong_soundfile`, `noise_location`, `dong_delay`
//! - **home-automation informer**: `[openhab]`, `[hass]` endpoints and `[ha]` timing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doorbell_config::prelude::*;
//! use std::sync::Arc;
//!
//! struct Chime;
//!
//! impl DingListener for Chime {
//!     fn set_sound_file(&self, path: &str) {
//!         println!("ding sound: {path}");
//!     }
//!
//!     fn set_location(&self, place: &str) {
//!         println!("ding location: {place}");
//!     }
//! }
//!
//! # async fn example() -> doorbell_config::error::Result<()> {
//! let watcher = ConfigWatcher::new("/etc/doorbell/doorbell.conf");
//!
//! let chime: Arc<dyn DingListener> = Arc::new(Chime);
//! watcher.register_listeners(Some(chime.clone()), None, None);
//! watcher.start()?;
//!
//! // Lock-free reads of the last good parse
//! if watcher.ready() {
//!     println!("timeout: {}", watcher.get_int("ha", "timeout")?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `file-watch` (default): wake the poll loop early on filesystem events
//! - `metrics`: OpenTelemetry counters for reparses and listener pushes

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod sources;

#[cfg(feature = "file-watch")]
pub mod notify;

#[cfg(feature = "metrics")]
pub mod metrics;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{
        ConfigStore, ConfigWatcher, ConfigWatcherBuilder, DingListener, DongListener,
        HomeAutomationInformer, ListenerRole, TickOutcome,
    };
    pub use crate::error::{ConfigError, Result};
}
