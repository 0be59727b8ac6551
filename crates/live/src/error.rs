//! Broker error types

use thiserror::Error;

/// Errors raised by the live broker
#[derive(Debug, Error)]
pub enum LiveError {
    /// The subscriber limit was reached
    #[error("maximum subscribers reached ({max})")]
    MaxSubscribers { max: usize },

    /// No subscription with that id
    #[error("subscription not found: {id}")]
    NotFound { id: u64 },
}
