//! Theia Filter - the filter language shared by the historical and live paths
//!
//! A filter arrives as a single JSON object ([`FilterSpec`]) and is compiled
//! once into a [`Filter`], a pure predicate over events that is safe to call
//! concurrently.
//!
//! # Filter Logic
//!
//! - All fields are optional (absent = match all)
//! - Present fields are AND'd together
//! - The `tags` list matches if **any** listed pattern matches **any** tag
//! - `start`/`end` are integer seconds compared inclusively against the
//!   floor of the event timestamp
//!
//! # Regex Flavor
//!
//! Patterns use the Rust `regex` crate: an RE2-style engine without
//! look-around or backreferences, where `.` does not match `\n`. Every
//! pattern is evaluated as an unanchored substring search.

mod compiled;
mod error;
mod spec;

pub use compiled::Filter;
pub use error::CompileError;
pub use spec::{FilterSpec, Order};

/// Result type for filter operations
pub type Result<T> = std::result::Result<T, CompileError>;
