//! Core protocol types for the Nim server's wire format.
//!
//! This module defines every type that travels "on the wire": the
//! commands a client can send, the messages a server can reply with,
//! and the error codes exchanged between the two. Unlike a JSON-based
//! protocol, every one of these has exactly one textual representation
//! — there is no separate serializer to configure, because the
//! representation *is* the type.

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A room's identity, equal to its slot index in the registry.
///
/// This is a "newtype wrapper" — a common Rust pattern where you wrap a
/// primitive type (here `usize`) in a named struct so that a `RoomId`
/// can never be accidentally passed where a raw count or some other
/// index was expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(pub usize);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// The fixed set of error codes exchanged on the wire.
///
/// Numeric values are part of the protocol — clients match on the
/// integer, not the variant name — so this enum is `#[repr(u8)]` and
/// the discriminants must never be renumbered once shipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    None = 0,
    InvalidFormat = 1,
    UnknownCommand = 2,
    InvalidParams = 3,
    NotLoggedIn = 4,
    AlreadyLoggedIn = 5,
    NicknameTaken = 6,
    NicknameInvalid = 7,
    RoomNotFound = 8,
    RoomFull = 9,
    RoomNameTaken = 10,
    NotInRoom = 11,
    NotInGame = 12,
    NotYourTurn = 13,
    InvalidMove = 14,
    NoSkipsLeft = 15,
    ServerFull = 16,
    MaxRooms = 17,
    GameInProgress = 18,
    Internal = 99,
}

impl ErrorCode {
    /// The canonical human-readable message for this code. Clients
    /// never see any other internal error text.
    pub fn reason(self) -> &'static str {
        match self {
            ErrorCode::None => "OK",
            ErrorCode::InvalidFormat => "Invalid message format",
            ErrorCode::UnknownCommand => "Unknown command",
            ErrorCode::InvalidParams => "Invalid parameters",
            ErrorCode::NotLoggedIn => "Not logged in",
            ErrorCode::AlreadyLoggedIn => "Already logged in",
            ErrorCode::NicknameTaken => "Nickname already taken",
            ErrorCode::NicknameInvalid => "Invalid nickname",
            ErrorCode::RoomNotFound => "Room not found",
            ErrorCode::RoomFull => "Room is full",
            ErrorCode::RoomNameTaken => "Room name already taken",
            ErrorCode::NotInRoom => "Not in a room",
            ErrorCode::NotInGame => "Not in a game",
            ErrorCode::NotYourTurn => "Not your turn",
            ErrorCode::InvalidMove => "Invalid move",
            ErrorCode::NoSkipsLeft => "No skips remaining",
            ErrorCode::ServerFull => "Server is full",
            ErrorCode::MaxRooms => "Maximum number of rooms reached",
            ErrorCode::GameInProgress => "Game already in progress",
            ErrorCode::Internal => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

// ---------------------------------------------------------------------------
// Client commands
// ---------------------------------------------------------------------------

/// A command a client may send, with its parameters already split out.
///
/// This is a Rust `enum` — unlike enums in most languages (just named
/// integers), Rust enums carry data per variant, making this a tagged
/// union. Field validation (nickname shape, integer parsing of `TAKE`'s
/// count, …) is deliberately *not* done here: different invalid shapes
/// map to different wire error codes depending on which command they
/// arrived on, and only the dispatcher has that context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Login { nickname: String },
    ListRooms,
    CreateRoom { name: String },
    JoinRoom { raw_id: String },
    LeaveRoom,
    Take { raw_count: String },
    Skip,
    Ping,
    Pong,
    Logout,
}

impl ClientCommand {
    /// Maps a command name and its raw parameters onto a
    /// [`ClientCommand`]. Returns [`ProtocolError::UnknownCommand`] for
    /// anything outside the fixed command set.
    pub fn from_parts(
        command: &str,
        params: &[String],
    ) -> Result<Self, crate::ProtocolError> {
        use crate::ProtocolError::UnknownCommand;

        let first = |idx: usize| params.get(idx).cloned().unwrap_or_default();

        Ok(match command {
            "LOGIN" => ClientCommand::Login { nickname: first(0) },
            "LIST_ROOMS" => ClientCommand::ListRooms,
            "CREATE_ROOM" => ClientCommand::CreateRoom { name: first(0) },
            "JOIN_ROOM" => ClientCommand::JoinRoom { raw_id: first(0) },
            "LEAVE_ROOM" => ClientCommand::LeaveRoom,
            "TAKE" => ClientCommand::Take { raw_count: first(0) },
            "SKIP" => ClientCommand::Skip,
            "PING" => ClientCommand::Ping,
            "PONG" => ClientCommand::Pong,
            "LOGOUT" => ClientCommand::Logout,
            other => return Err(UnknownCommand(other.to_string())),
        })
    }
}

// ---------------------------------------------------------------------------
// Server messages
// ---------------------------------------------------------------------------

/// Player-status values carried by `PLAYER_STATUS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Connected,
    Disconnected,
    Reconnected,
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlayerStatus::Connected => "CONNECTED",
            PlayerStatus::Disconnected => "DISCONNECTED",
            PlayerStatus::Reconnected => "RECONNECTED",
        };
        f.write_str(s)
    }
}

/// One row of a `LIST_ROOMS` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomListing {
    pub id: RoomId,
    pub name: String,
    pub player_count: usize,
    pub capacity: usize,
}

/// A move an opponent just made, carried by `OPPONENT_ACTION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpponentMove {
    Take(u32),
    Skip,
}

/// Every message the server can send to a client.
///
/// `encode` is the single place that knows how to turn one of these
/// into the exact bytes that go on the wire — trailing `\n` included.
/// Nothing else in this crate performs I/O; `ServerMessage` is pure
/// data until the transport layer writes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    LoginOk,
    LoginErr { code: ErrorCode },
    Rooms { rooms: Vec<RoomListing> },
    RoomCreated { id: RoomId },
    RoomJoined { id: RoomId, opponent: Option<String> },
    RoomErr { code: ErrorCode },
    LeaveOk,
    GameStart { stones: u32, your_turn: bool, opponent: String },
    TakeOk { remaining: u32, your_turn: bool },
    TakeErr { code: ErrorCode },
    SkipOk { your_turn: bool },
    SkipErr { code: ErrorCode },
    OpponentAction { action: OpponentMove, remaining: u32 },
    GameOver { winner: String, loser: String },
    Ping,
    Pong,
    PlayerStatus { nickname: String, status: PlayerStatus },
    Error { code: ErrorCode },
    WaitOpponent,
    GameResumed {
        stones: u32,
        your_turn: bool,
        your_skips: u8,
        opponent_skips: u8,
    },
    ServerShutdown,
}

impl ServerMessage {
    /// Renders the exact wire form of this message, including the
    /// trailing `\n` terminator.
    pub fn encode(&self) -> String {
        let bit = |b: bool| if b { "1" } else { "0" };
        let mut out = match self {
            ServerMessage::LoginOk => "LOGIN_OK".to_string(),
            ServerMessage::LoginErr { code } => {
                format!("LOGIN_ERR;{};{}", *code as u8, code.reason())
            }
            ServerMessage::Rooms { rooms } => {
                if rooms.is_empty() {
                    "ROOMS;0".to_string()
                } else {
                    let mut s = format!("ROOMS;{}", rooms.len());
                    for r in rooms {
                        s.push(';');
                        s.push_str(&format!(
                            "{},{},{},{}",
                            r.id, r.name, r.player_count, r.capacity
                        ));
                    }
                    s
                }
            }
            ServerMessage::RoomCreated { id } => {
                format!("ROOM_CREATED;{}", id)
            }
            ServerMessage::RoomJoined { id, opponent } => format!(
                "ROOM_JOINED;{};{}",
                id,
                opponent.as_deref().unwrap_or("")
            ),
            ServerMessage::RoomErr { code } => {
                format!("ROOM_ERR;{};{}", *code as u8, code.reason())
            }
            ServerMessage::LeaveOk => "LEAVE_OK".to_string(),
            ServerMessage::GameStart { stones, your_turn, opponent } => {
                format!("GAME_START;{};{};{}", stones, bit(*your_turn), opponent)
            }
            ServerMessage::TakeOk { remaining, your_turn } => {
                format!("TAKE_OK;{};{}", remaining, bit(*your_turn))
            }
            ServerMessage::TakeErr { code } => {
                format!("TAKE_ERR;{};{}", *code as u8, code.reason())
            }
            ServerMessage::SkipOk { your_turn } => {
                format!("SKIP_OK;{}", bit(*your_turn))
            }
            ServerMessage::SkipErr { code } => {
                format!("SKIP_ERR;{};{}", *code as u8, code.reason())
            }
            ServerMessage::OpponentAction { action, remaining } => {
                match action {
                    OpponentMove::Take(k) => {
                        format!("OPPONENT_ACTION;TAKE;{};{}", k, remaining)
                    }
                    OpponentMove::Skip => {
                        format!("OPPONENT_ACTION;SKIP;0;{}", remaining)
                    }
                }
            }
            ServerMessage::GameOver { winner, loser } => {
                format!("GAME_OVER;{};{}", winner, loser)
            }
            ServerMessage::Ping => "PING".to_string(),
            ServerMessage::Pong => "PONG".to_string(),
            ServerMessage::PlayerStatus { nickname, status } => {
                format!("PLAYER_STATUS;{};{}", nickname, status)
            }
            ServerMessage::Error { code } => {
                format!("ERROR;{};{}", *code as u8, code.reason())
            }
            ServerMessage::WaitOpponent => "WAIT_OPPONENT".to_string(),
            ServerMessage::GameResumed {
                stones,
                your_turn,
                your_skips,
                opponent_skips,
            } => format!(
                "GAME_RESUMED;{};{};{};{}",
                stones,
                bit(*your_turn),
                your_skips,
                opponent_skips
            ),
            ServerMessage::ServerShutdown => "SERVER_SHUTDOWN".to_string(),
        };
        out.push('\n');
        out
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_id_displays_as_plain_number() {
        assert_eq!(RoomId(7).to_string(), "7");
    }

    #[test]
    fn error_code_reason_matches_none_is_ok() {
        assert_eq!(ErrorCode::None.reason(), "OK");
    }

    #[test]
    fn client_command_parses_login() {
        let cmd =
            ClientCommand::from_parts("LOGIN", &["alice".to_string()])
                .unwrap();
        assert_eq!(cmd, ClientCommand::Login { nickname: "alice".into() });
    }

    #[test]
    fn client_command_rejects_unknown() {
        let err = ClientCommand::from_parts("FLY_TO_MOON", &[]).unwrap_err();
        assert!(matches!(err, crate::ProtocolError::UnknownCommand(_)));
    }

    #[test]
    fn client_command_missing_params_default_empty() {
        // TAKE with no count is still parsed; the dispatcher is
        // responsible for rejecting the empty raw_count as InvalidParams.
        let cmd = ClientCommand::from_parts("TAKE", &[]).unwrap();
        assert_eq!(cmd, ClientCommand::Take { raw_count: String::new() });
    }

    #[test]
    fn login_ok_encodes_with_trailing_newline() {
        assert_eq!(ServerMessage::LoginOk.encode(), "LOGIN_OK\n");
    }

    #[test]
    fn login_err_encodes_code_and_reason() {
        let msg = ServerMessage::LoginErr { code: ErrorCode::NicknameTaken };
        assert_eq!(msg.encode(), "LOGIN_ERR;6;Nickname already taken\n");
    }

    #[test]
    fn rooms_with_zero_rooms_is_literal_zero() {
        let msg = ServerMessage::Rooms { rooms: vec![] };
        assert_eq!(msg.encode(), "ROOMS;0\n");
    }

    #[test]
    fn rooms_with_entries_joins_fields_with_commas_and_semicolons() {
        let msg = ServerMessage::Rooms {
            rooms: vec![RoomListing {
                id: RoomId(0),
                name: "r1".into(),
                player_count: 1,
                capacity: 2,
            }],
        };
        assert_eq!(msg.encode(), "ROOMS;1;0,r1,1,2\n");
    }

    #[test]
    fn game_start_encodes_turn_as_bit() {
        let msg = ServerMessage::GameStart {
            stones: 21,
            your_turn: true,
            opponent: "bob".into(),
        };
        assert_eq!(msg.encode(), "GAME_START;21;1;bob\n");
    }

    #[test]
    fn opponent_action_skip_has_zero_param() {
        let msg = ServerMessage::OpponentAction {
            action: OpponentMove::Skip,
            remaining: 18,
        };
        assert_eq!(msg.encode(), "OPPONENT_ACTION;SKIP;0;18\n");
    }

    #[test]
    fn opponent_action_take_carries_count() {
        let msg = ServerMessage::OpponentAction {
            action: OpponentMove::Take(3),
            remaining: 15,
        };
        assert_eq!(msg.encode(), "OPPONENT_ACTION;TAKE;3;15\n");
    }

    #[test]
    fn game_over_lists_winner_then_loser() {
        let msg = ServerMessage::GameOver {
            winner: "bob".into(),
            loser: "alice".into(),
        };
        assert_eq!(msg.encode(), "GAME_OVER;bob;alice\n");
    }

    #[test]
    fn room_joined_with_no_opponent_leaves_field_empty() {
        let msg = ServerMessage::RoomJoined { id: RoomId(3), opponent: None };
        assert_eq!(msg.encode(), "ROOM_JOINED;3;\n");
    }

    #[test]
    fn player_status_variants_display_uppercase() {
        assert_eq!(PlayerStatus::Disconnected.to_string(), "DISCONNECTED");
        assert_eq!(PlayerStatus::Reconnected.to_string(), "RECONNECTED");
    }
}
