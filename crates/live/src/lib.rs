//! Theia Live - real-time fan-out of incoming events
//!
//! The [`Broker`] holds the set of live subscribers, each with a compiled
//! filter, and relays every accepted push to the subscribers whose filter
//! matches. It implements these guarantees:
//!
//! - `dispatch` never blocks on a slow subscriber; a subscriber whose
//!   bounded outbound buffer stays full past a grace period is evicted
//! - each subscriber observes events in dispatch order
//! - zero cost when nobody is subscribed (inline flag check)
//!
//! Subscribers that vanish without traffic are reclaimed by a periodic
//! maintenance sweep.

mod broker;
mod error;
mod subscriber;

pub use broker::{Broker, BrokerStats};
pub use error::LiveError;
pub use subscriber::{Subscriber, SubscriptionId};

/// Result type for broker operations
pub type Result<T> = std::result::Result<T, LiveError>;
