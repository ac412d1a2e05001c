//! # nim-server
//!
//! A TCP server hosting multiple simultaneous two-player misere Nim
//! games. Built on a single-threaded `mio` event loop: one listening
//! socket, one token per connected player, and a bounded poll wait so
//! login timeouts, ping/pong liveness, and reconnect-window expiry all
//! run on schedule even when the wire is quiet.
//!
//! The protocol, game rules, session bookkeeping, and room matchmaking
//! each live in their own crate (`nim_protocol`, `nim_rules`,
//! `nim_session`, `nim_room`); this crate wires them together and owns
//! the one place I/O actually happens.

mod config;
mod dispatcher;
mod error;
mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::ServerError;
pub use server::Server;

/// The pure command-dispatch layer, exposed for integration tests that
/// want to drive a full login/room/game flow without opening real
/// sockets. Not meant to be used outside this crate's test suite.
#[doc(hidden)]
pub mod testing {
    pub use crate::dispatcher::{disconnect, dispatch, expire_reconnect_window, AfterDispatch, DispatchResult, Outgoing};
}
