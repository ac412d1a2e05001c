//! Player session management for the Nim game server.
//!
//! This crate owns the fixed-size table of player slots:
//!
//! 1. **Identity** — the nickname a player claimed at `LOGIN`
//! 2. **State machine** — `Connecting → Lobby → InRoom → InGame`, with a
//!    dormant `Disconnected` branch for reconnect-by-nickname
//! 3. **Liveness** — last-activity, ping/pong, and reconnect-window timers
//! 4. **Abuse limits** — per-slot rate-limit bucket and invalid-message count
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)   ← looks up players by slot index to know who's in which room
//!     ↕
//! Session Layer (this crate)  ← owns player identity and connection state
//!     ↕
//! Protocol Layer (below)  ← provides RoomId and wire types
//! ```
//!
//! There is no authentication beyond the claimed nickname: this server
//! does not verify identity, only uniqueness among connected players.

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::{PlayerTable, ReconnectInfo};
pub use session::{
    PlayerSlot, PlayerState, SessionConfig, BUFFER_CAPACITY,
};
