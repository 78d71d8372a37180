//! File Watch Loop
//!
//! A notify observer feeds filesystem events into a single loop thread.
//! The loop filters them, debounces per path and hands each settled path to
//! a processor (in the CLI: scan that file, install what is missing).
//! Processor failures are logged and the loop keeps going.

pub mod debounce;
pub mod filter;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::config::WatchConfig;
use crate::error::Result;

pub use debounce::{Debouncer, Disposition};
pub use filter::WatchFilter;

/// How long the loop sleeps when nothing is pending
const IDLE_WAIT: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Changed,
}

impl ChangeKind {
    /// Removals, access and metadata-less events are not interesting
    pub fn from_event_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(ChangeKind::Added),
            EventKind::Modify(_) => Some(ChangeKind::Changed),
            _ => None,
        }
    }
}

/// A settled change handed to the processor
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
    /// When the last event for this path arrived
    pub observed_at: DateTime<Utc>,
}

enum WatchMessage {
    Fs(notify::Result<Event>),
    Stop,
}

// =============================================================================
// Loop
// =============================================================================

struct WatchLoop {
    filter: WatchFilter,
    debouncer: Debouncer,
    observed: HashMap<PathBuf, DateTime<Utc>>,
    running: Arc<AtomicBool>,
}

impl WatchLoop {
    fn run<F>(mut self, rx: Receiver<WatchMessage>, mut processor: F)
    where
        F: FnMut(&WatchEvent) -> Result<()>,
    {
        while self.running.load(Ordering::SeqCst) {
            let wait = self
                .debouncer
                .next_deadline()
                .map(|d| d.saturating_duration_since(Instant::now()))
                .unwrap_or(IDLE_WAIT);

            match rx.recv_timeout(wait) {
                Ok(WatchMessage::Fs(Ok(event))) => self.on_event(event),
                Ok(WatchMessage::Fs(Err(e))) => warn!("Watch error: {}", e),
                Ok(WatchMessage::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }

            for (path, kind) in self.debouncer.take_due(Instant::now()) {
                let event = WatchEvent {
                    observed_at: self.observed.remove(&path).unwrap_or_else(Utc::now),
                    path,
                    kind,
                };
                debug!("Processing {:?} {}", event.kind, event.path.display());
                if let Err(e) = processor(&event) {
                    warn!("Processing {} failed: {}", event.path.display(), e);
                }
                self.debouncer.complete(&event.path, Instant::now());
            }
        }
        self.running.store(false, Ordering::SeqCst);
        debug!("Watch loop stopped");
    }

    fn on_event(&mut self, event: Event) {
        let Some(kind) = ChangeKind::from_event_kind(&event.kind) else {
            return;
        };
        let now = Instant::now();
        for path in event.paths {
            if !self.filter.accepts(&path) {
                continue;
            }
            match self.debouncer.on_event(&path, kind, now) {
                Disposition::Cooldown => debug!("Cooldown, dropping event for {}", path.display()),
                disposition => {
                    debug!("{:?} {}", disposition, path.display());
                    self.observed.insert(path, Utc::now());
                }
            }
        }
    }
}

// =============================================================================
// Watcher
// =============================================================================

pub struct FileWatcher {
    root: PathBuf,
    config: WatchConfig,
}

impl FileWatcher {
    pub fn new(root: &Path, config: WatchConfig) -> Self {
        // notify reports canonical paths
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        Self { root, config }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start observing the root recursively; `processor` runs on the loop thread
    pub fn spawn<F>(self, processor: F) -> Result<WatchHandle>
    where
        F: FnMut(&WatchEvent) -> Result<()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let fs_tx = tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = fs_tx.send(WatchMessage::Fs(res));
            },
            Config::default(),
        )?;
        watcher.watch(&self.root, RecursiveMode::Recursive)?;
        info!(
            "Watching {} (debounce {}ms, cooldown {}ms)",
            self.root.display(),
            self.config.debounce_ms,
            self.config.cooldown_ms
        );

        let running = Arc::new(AtomicBool::new(true));
        let event_loop = WatchLoop {
            filter: WatchFilter::new(&self.root, &self.config),
            debouncer: Debouncer::new(self.config.debounce(), self.config.cooldown()),
            observed: HashMap::new(),
            running: Arc::clone(&running),
        };
        let thread = thread::Builder::new()
            .name("expmvc-watch".to_string())
            .spawn(move || event_loop.run(rx, processor))?;

        Ok(WatchHandle {
            tx,
            running,
            thread: Some(thread),
            watcher: Some(watcher),
        })
    }
}

/// Owner of a running watch loop
pub struct WatchHandle {
    tx: Sender<WatchMessage>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    watcher: Option<RecommendedWatcher>,
}

impl WatchHandle {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Feed an event as if the observer had reported it
    pub fn inject(&self, event: Event) {
        let _ = self.tx.send(WatchMessage::Fs(Ok(event)));
    }

    /// Close the observer and stop the loop. A processor already running is
    /// allowed to finish; this call waits for it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    /// Block on the loop thread; returns only once something else stops it
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    fn shutdown(&mut self) {
        self.watcher.take();
        self.running.store(false, Ordering::SeqCst);
        let _ = self.tx.send(WatchMessage::Stop);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    #[test]
    fn test_change_kind_mapping() {
        assert_eq!(
            ChangeKind::from_event_kind(&EventKind::Create(CreateKind::File)),
            Some(ChangeKind::Added)
        );
        assert_eq!(
            ChangeKind::from_event_kind(&EventKind::Modify(ModifyKind::Any)),
            Some(ChangeKind::Changed)
        );
        assert_eq!(ChangeKind::from_event_kind(&EventKind::Remove(RemoveKind::File)), None);
    }
}
