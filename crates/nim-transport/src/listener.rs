//! Non-blocking TCP accept loop.

use std::io::ErrorKind;
use std::net::SocketAddr;

use mio::net::TcpListener;

use crate::connection::Connection;
use crate::keepalive::KeepaliveConfig;
use crate::TransportError;

/// Wraps a bound, non-blocking listening socket.
pub struct Listener {
    inner: TcpListener,
    keepalive: KeepaliveConfig,
}

impl Listener {
    /// Binds and starts listening on `addr`.
    pub fn bind(
        addr: SocketAddr,
        keepalive: KeepaliveConfig,
    ) -> Result<Self, TransportError> {
        let inner =
            TcpListener::bind(addr).map_err(TransportError::BindFailed)?;
        Ok(Self { inner, keepalive })
    }

    /// The underlying `mio` listener, for registering with a `Poll`.
    pub fn mio_listener(&mut self) -> &mut TcpListener {
        &mut self.inner
    }

    /// Accepts one pending connection, if any. Returns `Ok(None)` when
    /// there's nothing to accept right now (the caller should wait for
    /// the next readiness event).
    pub fn accept(&mut self) -> Result<Option<Connection>, TransportError> {
        match self.inner.accept() {
            Ok((stream, peer_addr)) => {
                let conn =
                    Connection::new(stream, peer_addr, self.keepalive)?;
                Ok(Some(conn))
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(TransportError::AcceptFailed(e)),
        }
    }
}
