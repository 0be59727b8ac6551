//! Theia Protocol - Event model and wire codec for the Theia collector
//!
//! This crate provides the types that flow through the collector:
//! - `Event` - a single log event (id, timestamp, source, tags, content,
//!   extra headers)
//! - `serialize` / `parse` - the textual header wire format
//! - `frame` - per-record framing used by segment files on disk
//!
//! # Wire Format
//!
//! An event is a sequence of `name:value` header lines followed by the
//! content. The leading four headers are always emitted in the order
//! `id`, `timestamp`, `source`, `tags`; extra headers follow in insertion
//! order. The newline after the last header is the only separator before
//! the content:
//!
//! ```text
//! id:331c531d-6eb4-4fb5-84d3-ea6937b01fdd
//! timestamp:1509989630.6749051
//! source:/var/log/auth.log
//! tags:auth,host-1
//! Door has been unlocked.
//! ```
//!
//! Header values are single lines; serialization truncates them at the
//! first newline. The content may contain newlines and is emitted verbatim
//! with no trailing newline added.

mod decode;
mod encode;
mod error;
mod event;
pub mod frame;

pub use decode::{parse, parse_received};
pub use encode::{serialize, serialize_to_string};
pub use error::ParseError;
pub use event::Event;

// Re-export bytes for convenience
pub use bytes::Bytes;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ParseError>;

/// Current wall-clock time as fractional seconds since the epoch.
///
/// Used by the collector to stamp events whose producer supplied no
/// timestamp header.
pub fn now_timestamp() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) / 1e9
}
