//! Per-path debounce and cooldown
//!
//! Each path moves `Idle → PendingDebounce → Processing → Idle`. A new event
//! for a pending path pushes only that path's deadline back, so bursts on one
//! file never delay another. Time is passed in explicitly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::ChangeKind;

/// What the debouncer did with an incoming event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Path was idle and now waits for its quiet interval
    Scheduled,
    /// Path was already pending; its deadline moved
    Rescheduled,
    /// Path finished processing within the cooldown; event discarded
    Cooldown,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    kind: ChangeKind,
    deadline: Instant,
}

#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    cooldown: Duration,
    pending: HashMap<PathBuf, Pending>,
    completed: HashMap<PathBuf, Instant>,
}

impl Debouncer {
    pub fn new(quiet: Duration, cooldown: Duration) -> Self {
        Self {
            quiet,
            cooldown,
            pending: HashMap::new(),
            completed: HashMap::new(),
        }
    }

    pub fn on_event(&mut self, path: &Path, kind: ChangeKind, now: Instant) -> Disposition {
        if let Some(done) = self.completed.get(path) {
            if now.saturating_duration_since(*done) <= self.cooldown {
                return Disposition::Cooldown;
            }
        }

        let deadline = now + self.quiet;
        match self.pending.insert(path.to_path_buf(), Pending { kind, deadline }) {
            Some(_) => Disposition::Rescheduled,
            None => Disposition::Scheduled,
        }
    }

    /// Earliest deadline among pending paths
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Remove and return every path whose quiet interval has elapsed, earliest first
    pub fn take_due(&mut self, now: Instant) -> Vec<(PathBuf, ChangeKind)> {
        let mut due: Vec<(PathBuf, Pending)> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(path, p)| (path.clone(), *p))
            .collect();
        due.sort_by(|a, b| a.1.deadline.cmp(&b.1.deadline).then_with(|| a.0.cmp(&b.0)));

        for (path, _) in &due {
            self.pending.remove(path);
        }
        due.into_iter().map(|(path, p)| (path, p.kind)).collect()
    }

    /// Record that processing of `path` finished at `now`
    pub fn complete(&mut self, path: &Path, now: Instant) {
        let cooldown = self.cooldown;
        self.completed
            .retain(|_, done| now.saturating_duration_since(*done) <= cooldown);
        self.completed.insert(path.to_path_buf(), now);
    }

    pub fn is_pending(&self, path: &Path) -> bool {
        self.pending.contains_key(path)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
