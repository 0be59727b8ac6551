//! Filter error types

use thiserror::Error;

/// Errors raised while compiling a filter descriptor
#[derive(Debug, Error)]
pub enum CompileError {
    /// A pattern in the descriptor is not a valid regex
    #[error("invalid {field} pattern: {source}")]
    BadPattern {
        field: &'static str,
        #[source]
        source: regex::Error,
    },
}
