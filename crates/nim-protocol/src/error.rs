//! Error types for the protocol layer.
//!
//! Each crate in this workspace defines its own error enum. This keeps
//! errors specific and meaningful — when you see a `ProtocolError`, you
//! know the problem is in framing or parsing, not in sockets or room
//! management.

/// Errors that can occur while parsing or validating wire text.
///
/// `#[derive(thiserror::Error)]` auto-generates the `std::error::Error`
/// trait implementation; `#[error("...")]` gives each variant a
/// human-readable message for logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The raw line was empty or exceeded the 512-byte message cap.
    #[error("message length {0} bytes is out of bounds")]
    LengthOutOfBounds(usize),

    /// A parameter exceeded the 128-byte per-field cap.
    #[error("parameter exceeds maximum length")]
    ParamTooLong,

    /// More than 10 parameters were present after the command name.
    #[error("too many parameters")]
    TooManyParams,

    /// The command name didn't match any known client command.
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}
