//! Unified error type for the Nim server.

use nim_protocol::ProtocolError;
use nim_room::RoomError;
use nim_session::SessionError;
use nim_transport::TransportError;

use crate::config::ConfigError;

/// Top-level error that wraps every sub-crate's error type.
///
/// The `#[from]` attribute on each variant auto-generates a `From`
/// impl, so `?` converts sub-crate errors automatically at call sites.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
