//! Store error types

use thiserror::Error;

/// Errors raised by the event store backends
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying file I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The search filter did not compile
    #[error(transparent)]
    Filter(#[from] theia_filter::CompileError),

    /// Relational backend failure
    #[error("database error: {0}")]
    Database(#[from] turso::Error),
}
