//! Raw TCP transport for the Nim game server.
//!
//! A single-threaded `mio` reactor drives everything here: one
//! [`Listener`] accepts connections, and each accepted socket becomes
//! a [`Connection`] with its own non-blocking read/write buffering.
//! There is no protocol abstraction — the wire format is fixed
//! line-framed text, so unlike a pluggable transport layer this crate
//! has exactly one implementation.

mod connection;
mod error;
mod keepalive;
mod listener;

pub use connection::{Connection, ReadOutcome};
pub use error::TransportError;
pub use keepalive::{apply_keepalive, KeepaliveConfig};
pub use listener::Listener;
