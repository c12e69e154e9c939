//! Listener roles and the values pushed to them after a reparse.

use crate::core::ConfigStore;
use crate::error::{ConfigError, Result};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, warn};

/// Receives sound settings for the immediate "ding" chime.
pub trait DingListener: Send + Sync {
    /// Path of the sound file to play.
    fn set_sound_file(&self, path: &str);

    /// Where the sound should be played.
    fn set_location(&self, place: &str);
}

/// Receives sound settings for the delayed "dong" chime.
pub trait DongListener: Send + Sync {
    /// Path of the sound file to play.
    fn set_sound_file(&self, path: &str);

    /// Where the sound should be played.
    fn set_location(&self, place: &str);

    /// Delay between the ding and the dong.
    fn set_delay(&self, delay: Duration);
}

/// Receives home-automation endpoints and timing.
pub trait HomeAutomationInformer: Send + Sync {
    /// openHAB REST base URL and the item to update.
    fn set_openhab(&self, base_url: &str, item_name: &str);

    /// Home Assistant base URL and the entity to update.
    fn set_hass(&self, base_url: &str, entity_id: &str);

    /// Request timeout for calls to either system.
    fn set_timeout(&self, timeout: Duration);

    /// Window within which repeated button presses are collapsed into one.
    fn set_collapse_interval(&self, interval: Duration);
}

/// The three fixed consumer categories, in push order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerRole {
    /// Immediate chime.
    Ding,
    /// Delayed chime.
    Dong,
    /// Home-automation notifier.
    HomeAutomation,
}

impl fmt::Display for ListenerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ding => write!(f, "ding"),
            Self::Dong => write!(f, "dong"),
            Self::HomeAutomation => write!(f, "home-automation"),
        }
    }
}

/// Weakly held listener references, one optional slot per role.
///
/// Slots are replaced together; a watcher never sees a mix of old and new
/// registrations within one tick.
#[derive(Clone, Default)]
pub struct ListenerSlots {
    ding: Option<Weak<dyn DingListener>>,
    dong: Option<Weak<dyn DongListener>>,
    ha_informer: Option<Weak<dyn HomeAutomationInformer>>,
}

impl ListenerSlots {
    /// Downgrade the given listeners into a new set of slots.
    pub fn new(
        ding: Option<Arc<dyn DingListener>>,
        dong: Option<Arc<dyn DongListener>>,
        ha_informer: Option<Arc<dyn HomeAutomationInformer>>,
    ) -> Self {
        Self {
            ding: ding.as_ref().map(Arc::downgrade),
            dong: dong.as_ref().map(Arc::downgrade),
            ha_informer: ha_informer.as_ref().map(Arc::downgrade),
        }
    }

    /// Roles whose listener is registered and still alive.
    pub fn live_roles(&self) -> Vec<ListenerRole> {
        let mut roles = Vec::with_capacity(3);
        if self.ding.as_ref().is_some_and(|w| w.strong_count() > 0) {
            roles.push(ListenerRole::Ding);
        }
        if self.dong.as_ref().is_some_and(|w| w.strong_count() > 0) {
            roles.push(ListenerRole::Dong);
        }
        if self.ha_informer.as_ref().is_some_and(|w| w.strong_count() > 0) {
            roles.push(ListenerRole::HomeAutomation);
        }
        roles
    }

    /// Push the relevant values from `store` to every live listener, in role order.
    ///
    /// Each role's values are read in full before its first setter call, so a
    /// listener gets all of its update or none of it. A failure for one role is
    /// logged and does not stop the others. Returns the roles that were updated.
    pub fn push_all(&self, store: &ConfigStore) -> Vec<ListenerRole> {
        let mut notified = Vec::with_capacity(3);

        if let Some(ding) = self.ding.as_ref().and_then(Weak::upgrade) {
            record(&mut notified, ListenerRole::Ding, push_ding(ding.as_ref(), store));
        }
        if let Some(dong) = self.dong.as_ref().and_then(Weak::upgrade) {
            record(&mut notified, ListenerRole::Dong, push_dong(dong.as_ref(), store));
        }
        if let Some(informer) = self.ha_informer.as_ref().and_then(Weak::upgrade) {
            record(
                &mut notified,
                ListenerRole::HomeAutomation,
                push_ha_informer(informer.as_ref(), store),
            );
        }

        notified
    }
}

impl fmt::Debug for ListenerSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSlots")
            .field("live_roles", &self.live_roles())
            .finish()
    }
}

fn record(notified: &mut Vec<ListenerRole>, role: ListenerRole, result: Result<()>) {
    match result {
        Ok(()) => {
            debug!(%role, "pushed configuration to listener");
            notified.push(role);
        }
        Err(e) => warn!(%role, error = %e, "could not push configuration to listener"),
    }
}

fn push_ding(listener: &dyn DingListener, store: &ConfigStore) -> Result<()> {
    let sound_file = store.get_string("sound", "ding_soundfile")?;
    let location = store.get_string("sound", "noise_location")?;

    listener.set_sound_file(sound_file);
    listener.set_location(location);
    Ok(())
}

fn push_dong(listener: &dyn DongListener, store: &ConfigStore) -> Result<()> {
    let sound_file = store.get_string("sound", "dong_soundfile")?;
    let location = store.get_string("sound", "noise_location")?;
    let delay = float_seconds(store, "sound", "dong_delay")?;

    listener.set_sound_file(sound_file);
    listener.set_location(location);
    listener.set_delay(delay);
    Ok(())
}

fn push_ha_informer(listener: &dyn HomeAutomationInformer, store: &ConfigStore) -> Result<()> {
    let openhab_url = store.get_string("openhab", "openhab_base_URL")?;
    let item_name = store.get_string("openhab", "item_name")?;
    let hass_url = store.get_string("hass", "ha_base_URL")?;
    let entity_id = store.get_string("hass", "entity_id")?;
    let timeout = int_seconds(store, "ha", "timeout")?;
    let collapse_interval = int_seconds(store, "ha", "button_press_collapse_interval")?;

    listener.set_openhab(openhab_url, item_name);
    listener.set_hass(hass_url, entity_id);
    listener.set_timeout(timeout);
    listener.set_collapse_interval(collapse_interval);
    Ok(())
}

fn float_seconds(store: &ConfigStore, section: &str, option: &str) -> Result<Duration> {
    let secs = store.get_float(section, option)?;
    Duration::try_from_secs_f64(secs)
        .map_err(|e| ConfigError::invalid_value(section, option, format!("{} seconds: {}", secs, e)))
}

fn int_seconds(store: &ConfigStore, section: &str, option: &str) -> Result<Duration> {
    let secs = store.get_int(section, option)?;
    u64::try_from(secs)
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::invalid_value(section, option, format!("{} seconds is negative", secs)))
}
