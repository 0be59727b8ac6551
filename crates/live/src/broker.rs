//! The live broker

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use theia_filter::Filter;
use theia_protocol::{serialize_to_string, Event};

use crate::error::LiveError;
use crate::subscriber::{Delivery, Subscriber, SubscriptionId};
use crate::Result;

/// Maximum number of concurrent subscribers
const MAX_SUBSCRIBERS: usize = 1024;

/// Outbound buffer per subscriber (events)
const CHANNEL_BUFFER_SIZE: usize = 256;

/// How long a subscriber may stay congested before eviction
const CONGESTION_GRACE: Duration = Duration::from_secs(5);

/// Interval for the cleanup sweep of vanished subscribers
const CLEANUP_INTERVAL: Duration = Duration::from_secs(5);

/// Fan-out point between the push path and live clients.
///
/// `dispatch` runs on the push handler's task; membership changes come
/// from connection tasks. The set is read-mostly, so dispatch iterates
/// under a read lock and only eviction takes the write lock.
#[derive(Debug)]
pub struct Broker {
    subscribers: RwLock<Vec<Arc<Subscriber>>>,
    next_id: AtomicU64,
    /// Quick check flag for the hot path
    has_subscribers: AtomicBool,
    /// Total events offered to the broker
    dispatched: AtomicU64,
    /// Total deliveries enqueued on subscriber buffers
    delivered: AtomicU64,
    buffer_size: usize,
    grace: Duration,
}

impl Broker {
    /// Create a broker with the default buffer size and grace period
    pub fn new() -> Self {
        Self::with_limits(CHANNEL_BUFFER_SIZE, CONGESTION_GRACE)
    }

    /// Create a broker with a custom outbound buffer size and congestion
    /// grace period
    pub fn with_limits(buffer_size: usize, grace: Duration) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            has_subscribers: AtomicBool::new(false),
            dispatched: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            buffer_size,
            grace,
        }
    }

    /// Register a subscriber with a compiled filter.
    ///
    /// Returns the subscription id and the receiving end of its bounded
    /// outbound buffer; the connection task drains it.
    pub fn subscribe(&self, filter: Filter) -> Result<(SubscriptionId, mpsc::Receiver<Arc<str>>)> {
        let mut subscribers = self.subscribers.write();
        if subscribers.len() >= MAX_SUBSCRIBERS {
            return Err(LiveError::MaxSubscribers {
                max: MAX_SUBSCRIBERS,
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.buffer_size);
        subscribers.push(Arc::new(Subscriber::new(id, filter, sender)));
        self.has_subscribers.store(true, Ordering::Relaxed);

        debug!(id, total = subscribers.len(), "live subscriber added");
        Ok((id, receiver))
    }

    /// Remove a subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|s| s.id() != id);
        if subscribers.len() == before {
            return Err(LiveError::NotFound { id });
        }
        if subscribers.is_empty() {
            self.has_subscribers.store(false, Ordering::Relaxed);
        }
        debug!(id, "live subscriber removed");
        Ok(())
    }

    /// Relay one accepted event to every matching subscriber.
    ///
    /// Never blocks: deliveries are `try_send`s, and subscribers that stay
    /// congested past the grace period (or whose task is gone) are evicted
    /// here rather than stalling the producer.
    pub fn dispatch(&self, event: &Event) {
        if !self.has_subscribers.load(Ordering::Relaxed) {
            return;
        }
        self.dispatched.fetch_add(1, Ordering::Relaxed);

        // Serialize once; subscribers share the payload.
        let payload: Arc<str> = Arc::from(serialize_to_string(event));

        let mut evicted = Vec::new();
        {
            let subscribers = self.subscribers.read();
            for subscriber in subscribers.iter() {
                if !subscriber.matches(event) {
                    continue;
                }
                match subscriber.deliver(Arc::clone(&payload), self.grace) {
                    Delivery::Sent => {
                        self.delivered.fetch_add(1, Ordering::Relaxed);
                    }
                    Delivery::Congested => {
                        trace!(id = subscriber.id(), "subscriber congested, dropping event");
                    }
                    Delivery::Evict => evicted.push(subscriber.id()),
                }
            }
        }

        for id in evicted {
            warn!(id, "evicting unresponsive live subscriber");
            let _ = self.unsubscribe(id);
        }
    }

    /// Current number of subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Broker counters for logging
    pub fn stats(&self) -> BrokerStats {
        BrokerStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            subscriber_count: self.subscriber_count(),
        }
    }

    /// Drop subscribers whose consuming task is gone.
    pub fn cleanup_disconnected(&self) -> usize {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|s| s.is_connected());
        let removed = before - subscribers.len();
        if removed > 0 {
            debug!(removed, "cleaned up vanished subscribers");
            if subscribers.is_empty() {
                self.has_subscribers.store(false, Ordering::Relaxed);
            }
        }
        removed
    }

    /// Spawn the periodic cleanup sweep; stops when `shutdown` fires.
    pub fn spawn_maintenance(
        self: &Arc<Self>,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let broker = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        broker.cleanup_disconnected();
                    }
                    _ = shutdown.cancelled() => break,
                }
            }
        })
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time broker counters
#[derive(Debug, Clone, Copy)]
pub struct BrokerStats {
    /// Events offered to the broker
    pub dispatched: u64,
    /// Deliveries enqueued on subscriber buffers
    pub delivered: u64,
    /// Current subscriber count
    pub subscriber_count: usize,
}

#[cfg(test)]
#[path = "broker_test.rs"]
mod tests;
