//! Shared application state

use std::sync::Arc;

use tracing::warn;

use theia_live::Broker;
use theia_protocol::{now_timestamp, parse_received};
use theia_store::{EventStore, StoreError};

/// Shared state for all collector connections: one store instance and one
/// broker instance, both created at startup.
pub struct AppState {
    store: Arc<dyn EventStore>,
    broker: Arc<Broker>,
}

/// Outcome of one push message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingest {
    /// Parsed, saved and handed to the broker
    Stored,
    /// Unparseable; logged and skipped, the channel stays open
    Rejected,
}

impl AppState {
    /// Create the state from the configured backends
    pub fn new(store: Arc<dyn EventStore>, broker: Arc<Broker>) -> Self {
        Self { store, broker }
    }

    /// The event store
    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    /// The live broker
    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }

    /// Handle one inbound push message.
    ///
    /// A message that fails to parse is dropped (a watcher may mis-frame a
    /// single event; the channel stays usable). A store failure is returned
    /// to the caller, which closes the channel without dispatching.
    pub async fn ingest(&self, payload: &[u8]) -> Result<Ingest, StoreError> {
        // The receive time only fills in for events without a producer
        // timestamp.
        let event = match parse_received(payload, now_timestamp()) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, len = payload.len(), "skipping unparseable event");
                return Ok(Ingest::Rejected);
            }
        };

        self.store.save(&event).await?;
        self.broker.dispatch(&event);
        Ok(Ingest::Stored)
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
