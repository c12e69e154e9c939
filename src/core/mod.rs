//! Core watcher types: the parsed store, listener roles and the polling loop.

mod builder;
pub mod listeners;
mod store;
mod watcher;

pub use builder::ConfigWatcherBuilder;
pub use listeners::{
    DingListener, DongListener, HomeAutomationInformer, ListenerRole, ListenerSlots,
};
pub use store::{ConfigStore, DEFAULT_SECTION};
pub use watcher::{ConfigWatcher, DEFAULT_POLL_INTERVAL, TickOutcome};
