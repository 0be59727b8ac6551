//! Protocol error types

use thiserror::Error;

/// Errors that can occur while parsing an event
#[derive(Debug, Error)]
pub enum ParseError {
    /// Zero-length input
    #[error("empty input")]
    Empty,

    /// The input is not valid UTF-8
    #[error("input is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// A required header was not present
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    /// The timestamp header value is not a decimal number
    #[error("non-numeric timestamp: {0:?}")]
    InvalidTimestamp(String),
}
