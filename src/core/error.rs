//! Error types for wire decoding and request dispatch

use std::io;
use thiserror::Error;

/// Result type used throughout the crate
pub type WireResult<T> = Result<T, WireError>;

/// Error type covering the wire protocol and the dispatcher
///
/// Errors fall into two classes. Connection errors (`Io`,
/// `UnexpectedEof`, `Protocol`, `TimedOut`) mean the byte stream can no
/// longer be trusted and the connection must be discarded. The remaining
/// variants describe the outcome of a single request and leave the
/// connection usable.
#[derive(Error, Debug)]
pub enum WireError {
    /// IO error on the underlying transport
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The peer closed the stream in the middle of a frame
    #[error("Connection closed mid-frame")]
    UnexpectedEof,

    /// The byte stream violated the protocol grammar
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The response deadline elapsed before a full reply arrived
    #[error("Response timed out")]
    TimedOut,

    /// The server answered with an error reply
    #[error("Server error: {code} {message}")]
    Server {
        /// Leading word of the error line, e.g. `ERR` or `WRONGTYPE`
        code: String,
        /// Remainder of the error line
        message: String,
    },

    /// A reply could not be converted to the requested type
    #[error("Type conversion error: {0}")]
    Type(String),

    /// The dispatcher is no longer accepting or processing tasks
    #[error("Dispatcher is closed")]
    Closed,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl WireError {
    /// Whether this error invalidates the connection it occurred on
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::UnexpectedEof | Self::Protocol(_) | Self::TimedOut
        )
    }

    /// Make an equivalent copy of this error
    ///
    /// When a connection fails, every task waiting on it is completed
    /// with the same failure. `io::Error` is not `Clone`, so the copy
    /// preserves its kind and message.
    #[must_use]
    pub fn replicate(&self) -> Self {
        match self {
            Self::Io(e) => Self::Io(io::Error::new(e.kind(), e.to_string())),
            Self::UnexpectedEof => Self::UnexpectedEof,
            Self::Protocol(msg) => Self::Protocol(msg.clone()),
            Self::TimedOut => Self::TimedOut,
            Self::Server { code, message } => Self::Server {
                code: code.clone(),
                message: message.clone(),
            },
            Self::Type(msg) => Self::Type(msg.clone()),
            Self::Closed => Self::Closed,
            Self::Config(msg) => Self::Config(msg.clone()),
        }
    }
}
