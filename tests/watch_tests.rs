//! Watch loop behavior with injected and real filesystem events

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use expmvc::config::WatchConfig;
use expmvc::watch::{ChangeKind, FileWatcher, WatchEvent};
use expmvc::ExpmvcError;
use notify::event::{CreateKind, DataChange, ModifyKind};
use notify::{Event, EventKind};

type Seen = Arc<Mutex<Vec<WatchEvent>>>;

fn modified(path: &Path) -> Event {
    Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content))).add_path(path.to_path_buf())
}

fn created(path: &Path) -> Event {
    Event::new(EventKind::Create(CreateKind::File)).add_path(path.to_path_buf())
}

/// Spawn a watcher over a fresh directory that records every processed event
fn recording_watcher(config: WatchConfig) -> (tempfile::TempDir, PathBuf, Seen, expmvc::WatchHandle) {
    let dir = tempfile::tempdir().unwrap();
    let watcher = FileWatcher::new(dir.path(), config);
    let root = watcher.root().to_path_buf();
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handle = watcher
        .spawn(move |event| {
            sink.lock().unwrap().push(event.clone());
            Ok(())
        })
        .unwrap();
    (dir, root, seen, handle)
}

fn wait_for(seen: &Seen, count: usize, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if seen.lock().unwrap().len() >= count {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    false
}

#[test]
fn test_events_within_quiet_window_process_once() {
    let (_dir, root, seen, handle) = recording_watcher(WatchConfig::default());
    let file = root.join("src/app.js");

    handle.inject(modified(&file));
    thread::sleep(Duration::from_millis(500));
    handle.inject(modified(&file));

    assert!(wait_for(&seen, 1, Duration::from_secs(3)));
    thread::sleep(Duration::from_millis(1500));

    let events = seen.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].path, file);
    assert_eq!(events[0].kind, ChangeKind::Changed);
}

#[test]
fn test_event_inside_cooldown_is_dropped() {
    let config = WatchConfig {
        debounce_ms: 100,
        ..Default::default()
    };
    let (_dir, root, seen, handle) = recording_watcher(config);
    let file = root.join("server.js");

    handle.inject(created(&file));
    assert!(wait_for(&seen, 1, Duration::from_secs(2)));

    thread::sleep(Duration::from_millis(100));
    handle.inject(modified(&file));
    thread::sleep(Duration::from_millis(600));

    assert_eq!(seen.lock().unwrap().len(), 1);
    assert_eq!(seen.lock().unwrap()[0].kind, ChangeKind::Added);
}

#[test]
fn test_paths_debounce_independently() {
    let config = WatchConfig {
        debounce_ms: 300,
        ..Default::default()
    };
    let (_dir, root, seen, handle) = recording_watcher(config);

    handle.inject(modified(&root.join("a.js")));
    // keep b.js busy; a.js must still settle on its own
    for _ in 0..4 {
        thread::sleep(Duration::from_millis(150));
        handle.inject(modified(&root.join("b.js")));
    }

    assert!(wait_for(&seen, 2, Duration::from_secs(3)));
    let paths: Vec<PathBuf> = seen.lock().unwrap().iter().map(|e| e.path.clone()).collect();
    assert_eq!(paths, vec![root.join("a.js"), root.join("b.js")]);
}

#[test]
fn test_ignored_and_unwatched_paths_never_process() {
    let config = WatchConfig {
        debounce_ms: 50,
        ignore: vec!["dist/".to_string()],
        ..Default::default()
    };
    let (_dir, root, seen, handle) = recording_watcher(config);

    handle.inject(modified(&root.join("node_modules/express/index.js")));
    handle.inject(modified(&root.join("package-lock.json")));
    handle.inject(modified(&root.join("npm-debug.log")));
    handle.inject(modified(&root.join("src/app.js.swp")));
    handle.inject(modified(&root.join("dist/bundle.js")));
    handle.inject(modified(&root.join("README.md")));
    handle.inject(modified(&root.join("src/views/home.ejs")));

    assert!(wait_for(&seen, 1, Duration::from_secs(2)));
    thread::sleep(Duration::from_millis(300));
    let events = seen.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].path, root.join("src/views/home.ejs"));
}

#[test]
fn test_real_file_change_is_observed() {
    let config = WatchConfig {
        debounce_ms: 100,
        ..Default::default()
    };
    let (_dir, root, seen, handle) = recording_watcher(config);

    fs::write(root.join("index.js"), "require('express');").unwrap();

    assert!(wait_for(&seen, 1, Duration::from_secs(5)));
    assert_eq!(seen.lock().unwrap()[0].path, root.join("index.js"));
    handle.stop();
}

#[test]
fn test_failed_processing_keeps_loop_running() {
    let config = WatchConfig {
        debounce_ms: 100,
        ..Default::default()
    };
    let dir = tempfile::tempdir().unwrap();
    let watcher = FileWatcher::new(dir.path(), config);
    let root = watcher.root().to_path_buf();
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handle = watcher
        .spawn(move |event| {
            sink.lock().unwrap().push(event.clone());
            if event.path.ends_with("a.js") {
                return Err(ExpmvcError::InstallFailure {
                    command: "npm install --save left-pad".to_string(),
                    status: "exit status: 1".to_string(),
                });
            }
            Ok(())
        })
        .unwrap();

    handle.inject(modified(&root.join("a.js")));
    assert!(wait_for(&seen, 1, Duration::from_secs(2)));
    handle.inject(modified(&root.join("b.js")));
    assert!(wait_for(&seen, 2, Duration::from_secs(2)));

    assert!(handle.is_running());
    let paths: Vec<PathBuf> = seen.lock().unwrap().iter().map(|e| e.path.clone()).collect();
    assert_eq!(paths, vec![root.join("a.js"), root.join("b.js")]);
}

#[test]
fn test_stop_ends_processing() {
    let config = WatchConfig {
        debounce_ms: 200,
        ..Default::default()
    };
    let (_dir, root, seen, handle) = recording_watcher(config);
    assert!(handle.is_running());

    handle.inject(modified(&root.join("late.js")));
    handle.stop();

    thread::sleep(Duration::from_millis(400));
    assert!(seen.lock().unwrap().is_empty());
}
