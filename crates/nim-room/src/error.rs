//! Error types for the room registry.

use nim_protocol::RoomId;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RoomError {
    /// No room slot was free (`max_rooms` already in use).
    #[error("no free room slots")]
    RegistryFull,

    /// A room with this name already exists.
    #[error("room name already taken")]
    NameTaken,

    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The room is full — both seats are already occupied.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The requested seat is not occupied by this player.
    #[error("player is not in room {0}")]
    NotInRoom(RoomId),
}
