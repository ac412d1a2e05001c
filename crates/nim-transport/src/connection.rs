//! A single non-blocking TCP connection with buffered I/O.
//!
//! The event loop drives this with `mio` readiness events: on
//! `Interest::READABLE` it calls [`Connection::read_into`] to pull
//! bytes into the caller's buffer; on `Interest::WRITABLE` it calls
//! [`Connection::flush`] to drain anything queued by
//! [`Connection::queue_write`]. Both are non-blocking and report
//! `WouldBlock` rather than parking the single event-loop thread.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::net::SocketAddr;

use mio::net::TcpStream;

use crate::keepalive::{apply_keepalive, KeepaliveConfig};
use crate::TransportError;

/// What happened on a read attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were appended to the caller's buffer.
    Read(usize),
    /// No more data is available right now; try again on the next
    /// readiness notification.
    WouldBlock,
    /// The peer closed its write half.
    Closed,
}

/// A connected, non-blocking socket plus its pending outbound bytes.
pub struct Connection {
    pub stream: TcpStream,
    pub peer_addr: SocketAddr,
    outbound: VecDeque<u8>,
}

impl Connection {
    /// Wraps a freshly-accepted stream, applying keepalive tuning.
    pub fn new(
        stream: TcpStream,
        peer_addr: SocketAddr,
        keepalive: KeepaliveConfig,
    ) -> Result<Self, TransportError> {
        apply_keepalive(&stream, keepalive)?;
        Ok(Self { stream, peer_addr, outbound: VecDeque::new() })
    }

    /// Reads as many bytes as are immediately available, appending
    /// them to `buf`. Never blocks.
    pub fn read_into(
        &mut self,
        buf: &mut Vec<u8>,
    ) -> Result<ReadOutcome, TransportError> {
        let mut chunk = [0u8; 4096];
        match self.stream.read(&mut chunk) {
            Ok(0) => Ok(ReadOutcome::Closed),
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                Ok(ReadOutcome::Read(n))
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                Ok(ReadOutcome::WouldBlock)
            }
            Err(e) => Err(TransportError::ReadFailed(e)),
        }
    }

    /// Appends `bytes` to the outbound queue. Does not write
    /// anything yet — call [`Connection::flush`] once the socket is
    /// writable.
    pub fn queue_write(&mut self, bytes: &[u8]) {
        self.outbound.extend(bytes);
    }

    /// `true` if there are queued bytes not yet written.
    pub fn has_pending_write(&self) -> bool {
        !self.outbound.is_empty()
    }

    /// Writes as much of the queued outbound buffer as the socket
    /// will currently accept. Returns `true` once the queue is fully
    /// drained.
    pub fn flush(&mut self) -> Result<bool, TransportError> {
        while !self.outbound.is_empty() {
            let (front, _) = self.outbound.as_slices();
            match self.stream.write(front) {
                Ok(0) => break,
                Ok(n) => {
                    self.outbound.drain(..n);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    return Ok(false);
                }
                Err(e) => return Err(TransportError::WriteFailed(e)),
            }
        }
        Ok(self.outbound.is_empty())
    }
}
