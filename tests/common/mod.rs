//! Shared fixtures for integration tests.

#![allow(dead_code)]

use doorbell_config::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

pub const FULL_CONFIG: &str = r#"
[sound]
ding_soundfile = bell.wav
noise_location = kitchen
dong_soundfile = dong.wav
dong_delay = 1.5

[openhab]
openhab_base_URL = http://openhab.local:8080
item_name = FrontDoor

[hass]
ha_base_URL = http://hass.local:8123
entity_id = binary_sensor.doorbell

[ha]
timeout = 5
button_press_collapse_interval = 2
"#;

/// Write `text` to `path` and pin its modification time to `secs` after the epoch.
pub fn write_config(path: &Path, text: &str, secs: u64) {
    fs::write(path, text).unwrap();
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(mtime(secs))
        .unwrap();
}

pub fn mtime(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DingState {
    pub pushes: usize,
    pub sound_file: String,
    pub location: String,
}

#[derive(Default)]
pub struct RecordingDing {
    pub state: Mutex<DingState>,
}

impl RecordingDing {
    pub fn snapshot(&self) -> DingState {
        self.state.lock().unwrap().clone()
    }
}

impl DingListener for RecordingDing {
    fn set_sound_file(&self, path: &str) {
        let mut state = self.state.lock().unwrap();
        state.pushes += 1;
        state.sound_file = path.to_string();
    }

    fn set_location(&self, place: &str) {
        self.state.lock().unwrap().location = place.to_string();
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DongState {
    pub pushes: usize,
    pub sound_file: String,
    pub location: String,
    pub delay: Duration,
}

#[derive(Default)]
pub struct RecordingDong {
    pub state: Mutex<DongState>,
}

impl RecordingDong {
    pub fn snapshot(&self) -> DongState {
        self.state.lock().unwrap().clone()
    }
}

impl DongListener for RecordingDong {
    fn set_sound_file(&self, path: &str) {
        let mut state = self.state.lock().unwrap();
        state.pushes += 1;
        state.sound_file = path.to_string();
    }

    fn set_location(&self, place: &str) {
        self.state.lock().unwrap().location = place.to_string();
    }

    fn set_delay(&self, delay: Duration) {
        self.state.lock().unwrap().delay = delay;
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct InformerState {
    pub pushes: usize,
    pub openhab: (String, String),
    pub hass: (String, String),
    pub timeout: Duration,
    pub collapse_interval: Duration,
}

#[derive(Default)]
pub struct RecordingInformer {
    pub state: Mutex<InformerState>,
}

impl RecordingInformer {
    pub fn snapshot(&self) -> InformerState {
        self.state.lock().unwrap().clone()
    }
}

impl HomeAutomationInformer for RecordingInformer {
    fn set_openhab(&self, base_url: &str, item_name: &str) {
        let mut state = self.state.lock().unwrap();
        state.pushes += 1;
        state.openhab = (base_url.to_string(), item_name.to_string());
    }

    fn set_hass(&self, base_url: &str, entity_id: &str) {
        self.state.lock().unwrap().hass = (base_url.to_string(), entity_id.to_string());
    }

    fn set_timeout(&self, timeout: Duration) {
        self.state.lock().unwrap().timeout = timeout;
    }

    fn set_collapse_interval(&self, interval: Duration) {
        self.state.lock().unwrap().collapse_interval = interval;
    }
}
