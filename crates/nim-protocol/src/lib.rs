//! Wire protocol for the Nim game server.
//!
//! This crate defines the "language" that clients and the server
//! speak:
//!
//! - **Types** ([`ClientCommand`], [`ServerMessage`], [`ErrorCode`], …) —
//!   the message shapes that travel on the wire.
//! - **Codec** ([`parse_line`], [`validate_nickname`], [`validate_room_name`]) —
//!   how raw text becomes those shapes, and back.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while framing
//!   or parsing.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the
//! dispatcher (player state). It doesn't know about sockets or rooms —
//! it only knows how to tokenize and render wire text.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientCommand) → Dispatcher (player state)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{
    parse_line, trim_terminator, validate_nickname, validate_room_name,
    ParsedMessage, MAX_MESSAGE_LENGTH, MAX_NICKNAME_LENGTH, MAX_PARAMS,
    MAX_PARAM_LENGTH, MAX_ROOM_NAME_LENGTH,
};
pub use error::ProtocolError;
pub use types::{
    ClientCommand, ErrorCode, OpponentMove, PlayerStatus, RoomId,
    RoomListing, ServerMessage,
};
