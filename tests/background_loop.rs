//! Integration tests for the background polling task.

#![cfg(feature = "file-watch")]

mod common;

use common::*;
use doorbell_config::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::{sleep, timeout};

fn fast_watcher(path: &std::path::Path) -> ConfigWatcher {
    ConfigWatcher::builder()
        .with_file(path)
        .with_poll_interval(Duration::from_millis(20))
        .with_file_events(false)
        .build()
        .unwrap()
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !condition() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

#[tokio::test]
async fn test_background_loop_parses_and_pushes() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("doorbell.conf");
    write_config(&config_path, FULL_CONFIG, 100);

    let watcher = fast_watcher(&config_path);
    let ding = Arc::new(RecordingDing::default());
    watcher.register_listeners(Some(ding.clone()), None, None);

    watcher.start().unwrap();
    assert!(watcher.is_running());

    wait_until(|| watcher.ready()).await;
    assert_eq!(watcher.get_int("ha", "timeout").unwrap(), 5);
    wait_until(|| ding.snapshot().pushes == 1).await;

    write_config(&config_path, &FULL_CONFIG.replace("bell.wav", "gong.wav"), 200);
    wait_until(|| ding.snapshot().pushes == 2).await;
    assert_eq!(ding.snapshot().sound_file, "gong.wav");

    watcher.stop();
    watcher.join().await;
    assert!(!watcher.is_running());
}

#[tokio::test]
async fn test_stop_during_sleep_prevents_further_reparse() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("doorbell.conf");
    write_config(&config_path, FULL_CONFIG, 100);

    let watcher = fast_watcher(&config_path);
    let ding = Arc::new(RecordingDing::default());
    watcher.register_listeners(Some(ding.clone()), None, None);

    watcher.start().unwrap();
    wait_until(|| ding.snapshot().pushes == 1).await;

    watcher.stop();
    watcher.join().await;

    write_config(&config_path, &FULL_CONFIG.replace("timeout = 5", "timeout = 8"), 200);
    sleep(Duration::from_millis(100)).await;

    assert_eq!(ding.snapshot().pushes, 1);
    assert_eq!(watcher.get_int("ha", "timeout").unwrap(), 5);
    assert_eq!(watcher.last_modified(), Some(mtime(100)));
}

#[tokio::test]
async fn test_stop_wakes_a_long_sleep() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("doorbell.conf");
    write_config(&config_path, FULL_CONFIG, 100);

    let watcher = ConfigWatcher::builder()
        .with_file(&config_path)
        .with_poll_interval(Duration::from_secs(3600))
        .with_file_events(false)
        .build()
        .unwrap();

    watcher.start().unwrap();
    wait_until(|| watcher.ready()).await;

    watcher.stop();
    timeout(Duration::from_secs(2), watcher.join())
        .await
        .expect("watcher did not exit after stop");
}

#[tokio::test]
async fn test_missing_file_is_retried_by_loop() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("doorbell.conf");

    let watcher = fast_watcher(&config_path);
    watcher.start().unwrap();

    sleep(Duration::from_millis(60)).await;
    assert!(!watcher.ready());
    assert!(watcher.is_running());

    write_config(&config_path, FULL_CONFIG, 100);
    wait_until(|| watcher.ready()).await;

    watcher.stop();
    watcher.join().await;
}

#[tokio::test]
async fn test_stop_before_start_never_polls() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("doorbell.conf");
    write_config(&config_path, FULL_CONFIG, 100);

    let watcher = fast_watcher(&config_path);
    watcher.stop();
    watcher.start().unwrap();
    watcher.join().await;

    assert!(!watcher.ready());
}
