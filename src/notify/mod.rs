//! Filesystem-event wakeups for the polling loop.
//!
//! The watcher still decides whether the file changed by comparing modification
//! times; an event only cuts the current sleep short.

pub mod signal;

pub use signal::ChangeSignal;
