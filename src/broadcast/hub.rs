/// Broadcast hub - fans device change events out to connected observers
///
/// The hub manages:
/// - The observer set (observer_id → bounded sender)
/// - A publish queue drained by a single dispatcher task
/// - Per-observer backpressure (full queue = event skipped for that observer)
/// - Hub-level metrics
///
/// Delivery is at-most-once, best-effort and ordered per observer. An observer
/// only receives events published after it registered.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify, RwLock};
use tokio::task::JoinHandle;

use crate::logger::{self, LogTag};

use super::event::DeviceEvent;
use super::metrics::HubMetrics;

// ============================================================================
// HUB TYPES
// ============================================================================

/// Observer ID (unique per registration)
pub type ObserverId = u64;

/// Items delivered to an observer's channel
pub type ObserverReceiver = mpsc::Receiver<Arc<DeviceEvent>>;

struct Observer {
    sender: mpsc::Sender<Arc<DeviceEvent>>,
    /// Publish sequence at registration; older events are never delivered
    joined_after: u64,
}

struct Queued {
    seq: u64,
    event: Arc<DeviceEvent>,
}

// ============================================================================
// BROADCAST HUB
// ============================================================================

pub struct BroadcastHub {
    observers: RwLock<HashMap<ObserverId, Observer>>,
    next_observer_id: AtomicU64,
    published_seq: AtomicU64,
    queue_tx: mpsc::UnboundedSender<Queued>,
    /// Taken by the dispatcher when it is spawned
    queue_rx: parking_lot::Mutex<Option<mpsc::UnboundedReceiver<Queued>>>,
    shutdown: Notify,
    closed: AtomicBool,
    metrics: Arc<HubMetrics>,
    /// Per-observer buffer size (from config)
    buffer_size: usize,
}

impl BroadcastHub {
    pub fn new(buffer_size: usize) -> Arc<Self> {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            observers: RwLock::new(HashMap::new()),
            next_observer_id: AtomicU64::new(1),
            published_seq: AtomicU64::new(0),
            queue_tx,
            queue_rx: parking_lot::Mutex::new(Some(queue_rx)),
            shutdown: Notify::new(),
            closed: AtomicBool::new(false),
            metrics: HubMetrics::new(),
            buffer_size: buffer_size.max(1),
        })
    }

    /// Start the dispatcher task. Returns None if it was already started.
    pub fn spawn_dispatcher(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let mut rx = self.queue_rx.lock().take()?;
        let hub = Arc::clone(self);

        Some(tokio::spawn(async move {
            logger::debug(LogTag::Broadcast, "Dispatcher started");
            loop {
                tokio::select! {
                    biased;

                    _ = hub.shutdown.notified() => break,

                    queued = rx.recv() => match queued {
                        Some(queued) => hub.deliver(queued).await,
                        None => break,
                    },
                }
            }
            logger::debug(LogTag::Broadcast, "Dispatcher stopped");
        }))
    }

    /// Register a new observer
    pub async fn register(&self) -> (ObserverId, ObserverReceiver) {
        let observer_id = self.next_observer_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(self.buffer_size);

        if self.closed.load(Ordering::SeqCst) {
            // tx dropped here: the receiver sees a closed channel
            return (observer_id, rx);
        }

        let mut observers = self.observers.write().await;
        // shutdown may have cleared the map while we waited for the lock
        if self.closed.load(Ordering::SeqCst) {
            return (observer_id, rx);
        }
        observers.insert(
            observer_id,
            Observer {
                sender: tx,
                joined_after: self.published_seq.load(Ordering::SeqCst),
            },
        );
        self.metrics.observer_joined();

        logger::debug(
            LogTag::Broadcast,
            &format!(
                "Observer {} registered (active={})",
                observer_id,
                observers.len()
            ),
        );

        (observer_id, rx)
    }

    /// Remove an observer; safe to call more than once
    pub async fn unregister(&self, observer_id: ObserverId) -> bool {
        let mut observers = self.observers.write().await;
        let removed = observers.remove(&observer_id).is_some();
        if removed {
            self.metrics.observer_left();
            logger::debug(
                LogTag::Broadcast,
                &format!(
                    "Observer {} unregistered (active={})",
                    observer_id,
                    observers.len()
                ),
            );
        }
        removed
    }

    /// Queue an event for delivery. Never blocks; returns false after shutdown.
    pub fn publish(&self, event: DeviceEvent) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }

        let seq = self.published_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let event_type = event.event_type();
        let queued = Queued {
            seq,
            event: Arc::new(event),
        };

        if self.queue_tx.send(queued).is_err() {
            logger::debug(
                LogTag::Broadcast,
                &format!("Dispatcher gone, dropped {} #{}", event_type, seq),
            );
            return false;
        }

        self.metrics.event_published();
        true
    }

    async fn deliver(&self, queued: Queued) {
        let mut sent = 0u64;
        let mut dropped = 0u64;
        let mut closed_ids = Vec::new();

        {
            let observers = self.observers.read().await;
            for (observer_id, observer) in observers.iter() {
                if queued.seq <= observer.joined_after {
                    continue;
                }
                match observer.sender.try_send(Arc::clone(&queued.event)) {
                    Ok(()) => sent += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        dropped += 1;
                        logger::debug(
                            LogTag::Broadcast,
                            &format!(
                                "Event #{} dropped for observer {} (queue full)",
                                queued.seq, observer_id
                            ),
                        );
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => closed_ids.push(*observer_id),
                }
            }
        }

        self.metrics.delivered(sent);
        self.metrics.dropped_full(dropped);

        if !closed_ids.is_empty() {
            let mut observers = self.observers.write().await;
            for observer_id in closed_ids {
                if observers.remove(&observer_id).is_some() {
                    self.metrics.observer_pruned();
                    logger::debug(
                        LogTag::Broadcast,
                        &format!("Pruned closed observer {}", observer_id),
                    );
                }
            }
        }

        logger::verbose(
            LogTag::Broadcast,
            &format!(
                "Event #{} {} for {} (sent={}, dropped={})",
                queued.seq,
                queued.event.event_type(),
                queued.event.device_id(),
                sent,
                dropped
            ),
        );
    }

    /// Stop the dispatcher and close every observer channel
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // notify_one stores a permit if the dispatcher is busy delivering
        self.shutdown.notify_one();

        let mut observers = self.observers.write().await;
        let count = observers.len();
        observers.clear();
        self.metrics.observers_cleared();

        logger::info(
            LogTag::Broadcast,
            &format!("Broadcast hub shut down ({} observers closed)", count),
        );
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn metrics(&self) -> Arc<HubMetrics> {
        Arc::clone(&self.metrics)
    }

    pub async fn observer_count(&self) -> usize {
        self.observers.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn deleted(id: &str) -> DeviceEvent {
        DeviceEvent::Deleted { id: id.to_string() }
    }

    async fn recv_id(rx: &mut ObserverReceiver) -> String {
        let event = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("channel closed");
        event.device_id().to_string()
    }

    #[tokio::test]
    async fn test_registration() {
        let hub = BroadcastHub::new(10);

        let (id1, _rx1) = hub.register().await;
        let (id2, _rx2) = hub.register().await;
        assert_ne!(id1, id2);
        assert_eq!(hub.observer_count().await, 2);

        assert!(hub.unregister(id1).await);
        assert!(!hub.unregister(id1).await);
        assert_eq!(hub.observer_count().await, 1);
        assert_eq!(hub.metrics().snapshot().active_observers, 1);
    }

    #[tokio::test]
    async fn test_fan_out_in_order() {
        let hub = BroadcastHub::new(10);
        let _dispatcher = hub.spawn_dispatcher();

        let (_a, mut rx_a) = hub.register().await;
        let (_b, mut rx_b) = hub.register().await;

        for id in ["d1", "d2", "d3"] {
            assert!(hub.publish(deleted(id)));
        }

        for rx in [&mut rx_a, &mut rx_b] {
            assert_eq!(recv_id(rx).await, "d1");
            assert_eq!(recv_id(rx).await, "d2");
            assert_eq!(recv_id(rx).await, "d3");
        }
    }

    #[tokio::test]
    async fn test_no_replay_for_late_observer() {
        let hub = BroadcastHub::new(10);

        // Queued before the dispatcher runs, so it is still pending at registration
        hub.publish(deleted("old"));
        let (_id, mut rx) = hub.register().await;
        hub.publish(deleted("new"));

        let _dispatcher = hub.spawn_dispatcher();
        assert_eq!(recv_id(&mut rx).await, "new");
        assert!(timeout(Duration::from_millis(50), rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn test_full_observer_does_not_block_others() {
        let hub = BroadcastHub::new(1);
        let _dispatcher = hub.spawn_dispatcher();

        let (_slow, mut slow_rx) = hub.register().await;
        let (_fast, mut fast_rx) = hub.register().await;

        hub.publish(deleted("e1"));
        assert_eq!(recv_id(&mut fast_rx).await, "e1");
        hub.publish(deleted("e2"));
        assert_eq!(recv_id(&mut fast_rx).await, "e2");

        // slow observer kept e1 and missed e2
        assert_eq!(recv_id(&mut slow_rx).await, "e1");
        assert!(timeout(Duration::from_millis(50), slow_rx.recv()).await.is_err());
        assert_eq!(hub.metrics().snapshot().dropped_full, 1);
    }

    #[tokio::test]
    async fn test_closed_observer_pruned() {
        let hub = BroadcastHub::new(4);
        let _dispatcher = hub.spawn_dispatcher();

        let (_gone, gone_rx) = hub.register().await;
        let (_live, mut live_rx) = hub.register().await;
        drop(gone_rx);

        hub.publish(deleted("x"));
        assert_eq!(recv_id(&mut live_rx).await, "x");

        assert_eq!(hub.observer_count().await, 1);
        assert_eq!(hub.metrics().snapshot().pruned, 1);
    }

    #[tokio::test]
    async fn test_unregistered_observer_gets_nothing() {
        let hub = BroadcastHub::new(4);
        let _dispatcher = hub.spawn_dispatcher();

        let (id, mut rx) = hub.register().await;
        hub.unregister(id).await;
        hub.publish(deleted("late"));

        // sender dropped on unregister: channel reports closed, not an event
        let next = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_closes_channels() {
        let hub = BroadcastHub::new(4);
        let dispatcher = hub.spawn_dispatcher().unwrap();
        assert!(hub.spawn_dispatcher().is_none());

        let (_id, mut rx) = hub.register().await;
        hub.shutdown().await;

        timeout(Duration::from_secs(1), dispatcher)
            .await
            .unwrap()
            .unwrap();
        assert!(rx.recv().await.is_none());
        assert!(!hub.publish(deleted("after")));
        assert!(hub.is_closed());

        let (_late, mut late_rx) = hub.register().await;
        assert!(late_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_register_waiting_on_lock_sees_shutdown() {
        let hub = BroadcastHub::new(4);

        // Hold the map so register passes its first check and then parks on the lock
        let mut observers = hub.observers.write().await;
        let pending = tokio::spawn({
            let hub = Arc::clone(&hub);
            async move { hub.register().await }
        });
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        // what shutdown does while register is parked
        hub.closed.store(true, Ordering::SeqCst);
        observers.clear();
        drop(observers);

        let (_id, mut rx) = pending.await.unwrap();
        assert!(rx.recv().await.is_none());
        assert_eq!(hub.observer_count().await, 0);
        assert_eq!(hub.metrics().active_observers(), 0);
    }
}
