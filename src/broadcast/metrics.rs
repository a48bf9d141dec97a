/// Hub-level delivery counters
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct HubMetrics {
    /// Observers ever registered
    total_observers: AtomicU64,
    active_observers: AtomicUsize,
    events_published: AtomicU64,
    /// Successful per-observer enqueues
    deliveries: AtomicU64,
    /// Per-observer enqueues skipped because the queue was full
    dropped_full: AtomicU64,
    /// Observers removed because their channel was closed
    pruned: AtomicU64,
    /// Sockets closed by the keep-alive policy (idle or unanswered ping)
    timed_out: AtomicU64,
}

impl HubMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn observer_joined(&self) {
        self.total_observers.fetch_add(1, Ordering::Relaxed);
        self.active_observers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observer_left(&self) {
        // saturating: shutdown clears observers in bulk
        let _ = self
            .active_observers
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn observers_cleared(&self) {
        self.active_observers.store(0, Ordering::Relaxed);
    }

    pub fn event_published(&self) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivered(&self, count: u64) {
        self.deliveries.fetch_add(count, Ordering::Relaxed);
    }

    pub fn dropped_full(&self, count: u64) {
        self.dropped_full.fetch_add(count, Ordering::Relaxed);
    }

    pub fn observer_pruned(&self) {
        self.pruned.fetch_add(1, Ordering::Relaxed);
        self.observer_left();
    }

    pub fn observer_timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn active_observers(&self) -> usize {
        self.active_observers.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> HubMetricsSnapshot {
        HubMetricsSnapshot {
            total_observers: self.total_observers.load(Ordering::Relaxed),
            active_observers: self.active_observers.load(Ordering::Relaxed),
            events_published: self.events_published.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            dropped_full: self.dropped_full.load(Ordering::Relaxed),
            pruned: self.pruned.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
        }
    }
}

/// Hub metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubMetricsSnapshot {
    pub total_observers: u64,
    pub active_observers: usize,
    pub events_published: u64,
    pub deliveries: u64,
    pub dropped_full: u64,
    pub pruned: u64,
    pub timed_out: u64,
}
