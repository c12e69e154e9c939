//! Example wiring the watcher to console listeners.
//!
//! This example shows how to:
//! - Implement the three listener roles
//! - Register them and start the background watcher
//! - Read typed values while the file is being edited
//!
//! Run with: cargo run --example doorbell -- path/to/doorbell.conf
//!
//! While running, edit the file and watch the listeners receive new values.

use doorbell_config::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

struct ConsoleDing;

impl DingListener for ConsoleDing {
    fn set_sound_file(&self, path: &str) {
        println!("[ding] sound file = {}", path);
    }

    fn set_location(&self, place: &str) {
        println!("[ding] location = {}", place);
    }
}

struct ConsoleDong;

impl DongListener for ConsoleDong {
    fn set_sound_file(&self, path: &str) {
        println!("[dong] sound file = {}", path);
    }

    fn set_location(&self, place: &str) {
        println!("[dong] location = {}", place);
    }

    fn set_delay(&self, delay: Duration) {
        println!("[dong] delay = {:?}", delay);
    }
}

struct ConsoleInformer;

impl HomeAutomationInformer for ConsoleInformer {
    fn set_openhab(&self, base_url: &str, item_name: &str) {
        println!("[ha] openHAB = {} item {}", base_url, item_name);
    }

    fn set_hass(&self, base_url: &str, entity_id: &str) {
        println!("[ha] Home Assistant = {} entity {}", base_url, entity_id);
    }

    fn set_timeout(&self, timeout: Duration) {
        println!("[ha] timeout = {:?}", timeout);
    }

    fn set_collapse_interval(&self, interval: Duration) {
        println!("[ha] collapse interval = {:?}", interval);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "doorbell.conf".to_string());

    if !std::path::Path::new(&config_path).exists() {
        std::fs::write(
            &config_path,
            r#"[sound]
ding_soundfile = sounds/ding.wav
dong_soundfile = sounds/dong.wav
noise_location = hallway
dong_delay = 0.8

[openhab]
openhab_base_URL = http://localhost:8080
item_name = Doorbell

[hass]
ha_base_URL = http://localhost:8123
entity_id = input_boolean.doorbell

[ha]
timeout = 5
button_press_collapse_interval = 2
"#,
        )?;
        println!("Created {}", config_path);
    }

    let watcher = ConfigWatcher::new(&config_path);

    // The watcher only holds weak references; keep the listeners alive here
    let ding: Arc<dyn DingListener> = Arc::new(ConsoleDing);
    let dong: Arc<dyn DongListener> = Arc::new(ConsoleDong);
    let informer: Arc<dyn HomeAutomationInformer> = Arc::new(ConsoleInformer);
    watcher.register_listeners(Some(ding.clone()), Some(dong.clone()), Some(informer.clone()));

    watcher.start()?;
    println!("Watching {} (Ctrl+C to exit)\n", config_path);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_secs(10)) => {
                if watcher.ready() {
                    match watcher.get_int("ha", "timeout") {
                        Ok(timeout) => println!("current timeout: {}s", timeout),
                        Err(e) => println!("timeout unavailable: {}", e),
                    }
                }
            }
        }
    }

    watcher.stop();
    watcher.join().await;
    println!("Stopped");
    Ok(())
}
