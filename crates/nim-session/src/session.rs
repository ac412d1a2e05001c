//! Player slot types: the data structures that represent one connection.
//!
//! A "slot" is the server's record of one position in the fixed-size
//! player table. It tracks:
//! - WHO the player claims to be (nickname)
//! - WHAT state they're in (connecting, lobby, in a room, in a game,
//!   disconnected-pending-reconnect)
//! - WHICH room they belong to, and how many skips they have left
//! - its inbound byte buffer, rate-limit bucket, and liveness timers

use std::time::Instant;

use nim_protocol::RoomId;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Timeouts and limits governing one player slot's lifecycle.
///
/// Game developers rarely need to touch these; sensible defaults mirror
/// the wire protocol's documented constants.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Seconds a `DISCONNECTED` slot retains its nickname and room
    /// before the opponent is awarded the win and the slot is freed.
    pub reconnect_grace_secs: u64,
    /// Seconds a `CONNECTING` slot has to send `LOGIN` before it is
    /// dropped.
    pub login_timeout_secs: u64,
    /// Seconds of inactivity before the server sends a `PING`.
    pub ping_interval_secs: u64,
    /// Seconds to wait for `PONG` after a `PING` before disconnecting.
    pub pong_timeout_secs: u64,
    /// Invalid messages tolerated before the session is terminated.
    pub max_invalid_messages: u32,
    /// Frames accepted per wall-clock second before excess frames are
    /// dropped and counted as invalid.
    pub max_messages_per_second: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace_secs: 30,
            login_timeout_secs: 30,
            ping_interval_secs: 10,
            pong_timeout_secs: 5,
            max_invalid_messages: 3,
            max_messages_per_second: 20,
        }
    }
}

// ---------------------------------------------------------------------------
// PlayerState
// ---------------------------------------------------------------------------

/// The current state of a player slot.
///
/// ```text
///   Connecting ──(LOGIN)──→ Lobby ──(create/join)──→ InRoom ──(2nd joins)──→ InGame
///                              ↑                         │                      │
///                              └─────────(leave/end)──────┴──────────(leave/end)┘
///
///   InGame ──(ungraceful disconnect while PLAYING)──→ Disconnected ──(LOGIN)──→ [restored]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// Socket accepted, no `LOGIN` yet.
    Connecting,
    /// Logged in, not in a room.
    Lobby,
    /// In a room waiting for (or already matched with) an opponent but
    /// the game hasn't started.
    InRoom,
    /// In a room with an active game.
    InGame,
    /// Dormant: the socket is gone but the record is held open for a
    /// reconnect window, retaining nickname, room id, and skip credit.
    Disconnected,
}

// ---------------------------------------------------------------------------
// PlayerSlot
// ---------------------------------------------------------------------------

/// Maximum size of a player's inbound byte buffer.
pub const BUFFER_CAPACITY: usize = 1024;

/// One entry in the fixed-size player table.
///
/// The table owns every slot; `room_id` is a non-owning lookup (an
/// index into the room registry), never a pointer or a shared handle —
/// see the workspace-level design notes on arena ownership.
#[derive(Debug, Clone)]
pub struct PlayerSlot {
    /// Stable index of this slot in the table. Never changes while the
    /// slot is in use.
    pub index: usize,
    /// `true` once the slot has been handed out by `allocate`; `false`
    /// slots are free for reuse.
    pub active: bool,
    /// Claimed nickname, bounded and validated by `nim_protocol`.
    pub nickname: Option<String>,
    pub state: PlayerState,
    /// Room this player belongs to, if any. `None` in `Connecting` or
    /// `Lobby`.
    pub room_id: Option<RoomId>,
    /// Remaining skip credit for the current game (0 or 1).
    pub skip_credit: u8,
    /// Bytes read from the socket but not yet split into frames.
    pub inbound: Vec<u8>,
    pub last_activity: Instant,
    /// Set when the slot enters `Disconnected`; used to enforce the
    /// reconnect window.
    pub disconnect_time: Option<Instant>,
    pub last_ping_sent: Option<Instant>,
    pub awaiting_pong: bool,
    pub invalid_count: u32,
    /// Frames accepted in the current one-second rate-limit bucket.
    pub messages_this_second: u32,
    pub rate_bucket_started: Instant,
}

impl PlayerSlot {
    /// Creates a free (inactive) slot at `index`. `now` seeds the
    /// timers so a freshly-allocated slot doesn't immediately look
    /// idle.
    pub fn empty(index: usize, now: Instant) -> Self {
        Self {
            index,
            active: false,
            nickname: None,
            state: PlayerState::Connecting,
            room_id: None,
            skip_credit: 0,
            inbound: Vec::with_capacity(BUFFER_CAPACITY),
            last_activity: now,
            disconnect_time: None,
            last_ping_sent: None,
            awaiting_pong: false,
            invalid_count: 0,
            messages_this_second: 0,
            rate_bucket_started: now,
        }
    }

    /// Resets this slot back to its free state, ready for reuse by a
    /// new connection.
    pub fn reset(&mut self, now: Instant) {
        let index = self.index;
        *self = Self::empty(index, now);
    }
}
