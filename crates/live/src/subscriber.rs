//! Subscriber bookkeeping
//!
//! Each live client holds one `Subscriber`: its compiled filter, the
//! bounded channel feeding its connection task, and the congestion clock
//! used to decide eviction.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use theia_filter::Filter;
use theia_protocol::Event;

/// Identifies one live subscription
pub type SubscriptionId = u64;

/// Outcome of one delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// Enqueued on the subscriber's buffer
    Sent,
    /// Buffer full, still within the grace period
    Congested,
    /// Buffer full past the grace period, or channel closed
    Evict,
}

/// A single live subscriber (connected client)
#[derive(Debug)]
pub struct Subscriber {
    id: SubscriptionId,
    filter: Filter,
    sender: mpsc::Sender<Arc<str>>,
    created_at: Instant,
    /// Set when the buffer first rejects a send, cleared on success
    congested_since: Mutex<Option<Instant>>,
}

impl Subscriber {
    pub(crate) fn new(id: SubscriptionId, filter: Filter, sender: mpsc::Sender<Arc<str>>) -> Self {
        Self {
            id,
            filter,
            sender,
            created_at: Instant::now(),
            congested_since: Mutex::new(None),
        }
    }

    /// Subscription id
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// When the subscription was created
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Check the subscriber's filter against an event
    #[inline]
    pub fn matches(&self, event: &Event) -> bool {
        self.filter.matches(event)
    }

    /// Whether the consuming task is still around
    #[inline]
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Try to enqueue a serialized event without blocking.
    pub(crate) fn deliver(&self, payload: Arc<str>, grace: Duration) -> Delivery {
        match self.sender.try_send(payload) {
            Ok(()) => {
                *self.congested_since.lock() = None;
                Delivery::Sent
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Evict,
            Err(mpsc::error::TrySendError::Full(_)) => {
                let mut since = self.congested_since.lock();
                let first = *since.get_or_insert_with(Instant::now);
                if first.elapsed() >= grace {
                    Delivery::Evict
                } else {
                    Delivery::Congested
                }
            }
        }
    }
}
