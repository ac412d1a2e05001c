//! Room registry for the Nim game server.
//!
//! A room binds exactly two player-table slot indices to one
//! [`nim_rules::Game`]. Unlike an actor-per-room model, rooms here are
//! plain data living in a fixed-size arena owned by the single-threaded
//! event loop — no channels, no tasks, no per-room concurrency.

mod error;
mod room;

pub use error::RoomError;
pub use room::{JoinOutcome, LeaveOutcome, Room, RoomRegistry};
