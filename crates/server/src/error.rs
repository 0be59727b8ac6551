//! Server error types

use thiserror::Error;

/// Why a `/find` or `/live` handshake was rejected.
///
/// The error's display form is sent to the client as a one-line message
/// before the channel is closed.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The first message was not a JSON filter object
    #[error("invalid filter JSON: {0}")]
    BadJson(#[from] serde_json::Error),

    /// The filter contained an invalid pattern
    #[error(transparent)]
    Compile(#[from] theia_filter::CompileError),

    /// The first message was binary but not UTF-8
    #[error("filter message is not valid UTF-8")]
    NotUtf8,
}
