//! Theia Store - durable, append-only event storage keyed by time
//!
//! Two interchangeable backends implement the [`EventStore`] contract:
//!
//! - [`FileStore`] - one append-only segment file per fixed-width time
//!   bucket, framed records, no index file (the in-memory index is rebuilt
//!   from the directory listing at startup)
//! - [`RdbsStore`] - a single `events` table in an embedded SQL database
//!
//! `save` must not report success before the event is recoverable after a
//! process crash; each backend documents its fsync policy. `search` returns
//! a lazy stream of historical matches that never blocks waiting for future
//! events, and whose producer stops shortly after the receiver is dropped.

mod error;
mod file;
mod rdbs;
mod segment;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use theia_filter::FilterSpec;
use theia_protocol::Event;

pub use error::StoreError;
pub use file::FileStore;
pub use rdbs::RdbsStore;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// A stream of search results; ends with the last historical match or an
/// error item, never waits for future events.
pub type SearchStream = mpsc::Receiver<Result<Event>>;

/// The storage contract shared by all backends.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Durably append an event.
    async fn save(&self, event: &Event) -> Result<()>;

    /// Stream historical events matching `spec`, in the requested order.
    async fn search(&self, spec: &FilterSpec) -> Result<SearchStream>;

    /// Flush buffered writes and release all resources.
    async fn close(&self) -> Result<()>;
}

/// Which backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// File-per-bucket segments under a data directory
    File,
    /// Relational backend (embedded SQL database)
    Rdbs,
}

/// Open the configured store backend.
///
/// `data_dir` is used by the file backend; `db_url` by the relational one
/// (a filesystem path or `:memory:`, with an optional `sqlite://` prefix).
pub async fn open_store(
    kind: StoreKind,
    data_dir: &str,
    db_url: Option<&str>,
) -> Result<Arc<dyn EventStore>> {
    match kind {
        StoreKind::File => Ok(Arc::new(FileStore::open(data_dir)?)),
        StoreKind::Rdbs => {
            let url = db_url.unwrap_or(":memory:");
            Ok(Arc::new(RdbsStore::open(url).await?))
        }
    }
}
