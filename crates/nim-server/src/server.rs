//! The single-threaded `mio` event loop that ties transport, protocol,
//! session, and room layers together.
//!
//! One listening socket plus one `mio::Token` per player slot. A
//! readiness wait bounded to one second keeps the timer tick (login
//! timeouts, ping/pong liveness, reconnect-window expiry, the shutdown
//! flag) running promptly even when no socket has activity.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mio::{Events, Interest, Poll, Token};

use nim_protocol::{
    parse_line, trim_terminator, ClientCommand, ErrorCode, ServerMessage,
};
use nim_room::RoomRegistry;
use nim_session::{PlayerState, PlayerTable, SessionConfig, BUFFER_CAPACITY};
use nim_transport::{Connection, KeepaliveConfig, Listener, ReadOutcome, TransportError};

use crate::config::ServerConfig;
use crate::dispatcher::{self, AfterDispatch, Outgoing};
use crate::ServerError;

const LISTENER: Token = Token(0);

/// Frames buffered past this many bytes with no `\n` terminator in
/// sight are treated as a flood attempt rather than a slow trickle.
const MAX_UNTERMINATED_BYTES: usize = 256;

/// Upper bound on one `poll` wait. Bounds how late the timer tick can
/// run when the server is otherwise idle.
const POLL_TIMEOUT: Duration = Duration::from_secs(1);

fn token_to_slot(token: Token) -> usize {
    token.0 - 1
}

fn slot_to_token(slot: usize) -> Token {
    Token(slot + 1)
}

/// A running Nim game server.
pub struct Server {
    listener: Listener,
    poll: Poll,
    events: Events,
    players: PlayerTable,
    rooms: RoomRegistry,
    connections: Vec<Option<Connection>>,
    session_config: SessionConfig,
    shutdown: Arc<AtomicBool>,
    /// Slots whose socket has already been torn down (a failed write)
    /// but whose player/room state hasn't been unwound yet. Drained at
    /// the top of the next timer tick.
    pending_ungraceful: Vec<usize>,
}

impl Server {
    /// Binds the listening socket and allocates the fixed-capacity
    /// session and room tables per `config`.
    pub fn new(config: &ServerConfig, shutdown: Arc<AtomicBool>) -> Result<Self, ServerError> {
        let addr: SocketAddr = config.socket_addr().parse().map_err(|e| {
            TransportError::BindFailed(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid bind address {:?}: {e}", config.socket_addr()),
            ))
        })?;

        let mut listener = Listener::bind(addr, KeepaliveConfig::default())?;
        let mut poll = Poll::new().map_err(TransportError::PollFailed)?;
        poll.registry()
            .register(listener.mio_listener(), LISTENER, Interest::READABLE)
            .map_err(TransportError::PollFailed)?;

        let session_config = SessionConfig::default();
        tracing::info!(addr = %addr, max_clients = config.max_clients, max_rooms = config.max_rooms, "server starting");

        Ok(Self {
            listener,
            poll,
            events: Events::with_capacity(1024),
            players: PlayerTable::new(config.max_clients, session_config),
            rooms: RoomRegistry::new(config.max_rooms),
            connections: (0..config.max_clients).map(|_| None).collect(),
            session_config,
            shutdown,
            pending_ungraceful: Vec::new(),
        })
    }

    /// Runs until the shutdown flag is set, then broadcasts
    /// `SERVER_SHUTDOWN` to every connected client and returns.
    pub fn run(&mut self) -> Result<(), ServerError> {
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                tracing::info!("shutdown requested, notifying clients");
                self.broadcast_shutdown();
                return Ok(());
            }

            self.poll
                .poll(&mut self.events, Some(POLL_TIMEOUT))
                .map_err(TransportError::PollFailed)?;

            let tokens: Vec<Token> = self.events.iter().map(|e| e.token()).collect();
            for token in tokens {
                if token == LISTENER {
                    self.accept_all()?;
                } else {
                    self.service_connection(token);
                }
            }

            self.run_timer_tick();
        }
    }

    fn accept_all(&mut self) -> Result<(), ServerError> {
        loop {
            let Some(mut conn) = self.listener.accept()? else { break };
            let now = Instant::now();

            match self.players.allocate(now) {
                Ok(slot) => {
                    if let Err(e) = self.poll.registry().register(
                        &mut conn.stream,
                        slot_to_token(slot),
                        Interest::READABLE,
                    ) {
                        tracing::warn!(slot, error = %e, "failed to register new connection");
                        self.players.free(slot, now);
                        continue;
                    }
                    tracing::info!(slot, peer = %conn.peer_addr, "connection accepted");
                    self.connections[slot] = Some(conn);
                }
                Err(_) => {
                    tracing::info!(peer = %conn.peer_addr, "server full, rejecting connection");
                    conn.queue_write(ServerMessage::LoginErr { code: ErrorCode::ServerFull }.encode().as_bytes());
                    let _ = conn.flush();
                }
            }
        }
        Ok(())
    }

    fn service_connection(&mut self, token: Token) {
        let slot = token_to_slot(token);
        let now = Instant::now();

        let mut chunk = Vec::new();
        let read_outcome = match self.connections[slot].as_mut() {
            Some(conn) => conn.read_into(&mut chunk),
            None => return,
        };

        let mut outgoing = Vec::new();
        let mut close_socket = false;
        let mut run_disconnect: Option<bool> = None;

        match read_outcome {
            Ok(ReadOutcome::WouldBlock) => {}
            Ok(ReadOutcome::Closed) => {
                close_socket = true;
                run_disconnect = Some(false);
            }
            Err(e) => {
                tracing::warn!(slot, error = %e, "read failed");
                close_socket = true;
                run_disconnect = Some(false);
            }
            Ok(ReadOutcome::Read(_)) => {
                if !chunk.iter().all(|b| *b < 0x80) {
                    tracing::info!(slot, "non-ASCII byte on the wire, dropping connection");
                    close_socket = true;
                    run_disconnect = Some(false);
                } else if let Some(rec) = self.players.get_mut(slot) {
                    if rec.inbound.len() + chunk.len() > BUFFER_CAPACITY {
                        tracing::info!(slot, "inbound buffer would overflow, dropping connection");
                        close_socket = true;
                        run_disconnect = Some(false);
                    } else {
                        rec.inbound.extend_from_slice(&chunk);
                        rec.last_activity = now;
                        if !rec.inbound.contains(&b'\n') && rec.inbound.len() > MAX_UNTERMINATED_BYTES {
                            tracing::info!(slot, "unterminated flood, dropping connection");
                            close_socket = true;
                            run_disconnect = Some(false);
                        }
                    }
                }
            }
        }

        if !close_socket {
            self.drain_frames(slot, now, &mut outgoing, &mut close_socket, &mut run_disconnect);
        }

        if close_socket {
            if let Some(graceful) = run_disconnect {
                let extra = dispatcher::disconnect(&mut self.players, &mut self.rooms, slot, graceful, now);
                outgoing.extend(extra);
            }
            self.deliver(outgoing);
            self.close_connection(slot);
        } else {
            self.deliver(outgoing);
        }
    }

    /// Extracts and dispatches every complete `\n`-terminated frame
    /// currently buffered for `slot`, appending replies to `outgoing`
    /// and flagging `close_socket`/`run_disconnect` if a frame forces
    /// termination (malformed UTF-8 or the invalid-message cap).
    fn drain_frames(
        &mut self,
        slot: usize,
        now: Instant,
        outgoing: &mut Vec<Outgoing>,
        close_socket: &mut bool,
        run_disconnect: &mut Option<bool>,
    ) {
        loop {
            let line_bytes = {
                let Some(rec) = self.players.get_mut(slot) else { return };
                match rec.inbound.iter().position(|&b| b == b'\n') {
                    Some(pos) => Some(rec.inbound.drain(..=pos).collect::<Vec<u8>>()),
                    None => None,
                }
            };
            let Some(line_bytes) = line_bytes else { break };

            let line = match std::str::from_utf8(&line_bytes) {
                Ok(s) => s.to_string(),
                Err(_) => {
                    *close_socket = true;
                    *run_disconnect = Some(false);
                    break;
                }
            };

            if !self.players.admit_frame(slot, now) {
                if self.players.record_invalid(slot) {
                    *close_socket = true;
                    *run_disconnect = Some(false);
                    break;
                }
                continue;
            }

            let (mut reply, invalid, after) = handle_frame(&mut self.players, &mut self.rooms, slot, &line, now);
            outgoing.append(&mut reply);

            if invalid && self.players.record_invalid(slot) {
                *close_socket = true;
                *run_disconnect = Some(false);
                break;
            }
            if matches!(after, Some(AfterDispatch::DisconnectGraceful)) {
                *close_socket = true;
                break;
            }
        }
    }

    fn run_timer_tick(&mut self) {
        let now = Instant::now();

        for slot in self.players.login_timed_out(now) {
            tracing::info!(slot, "login timed out");
            self.close_connection(slot);
            self.players.free(slot, now);
        }

        for slot in self.players.expire_stale(now) {
            tracing::info!(slot, "reconnect window expired");
            let extra = dispatcher::expire_reconnect_window(&mut self.players, &mut self.rooms, slot, now);
            self.deliver(extra);
        }

        for slot in self.players.iter_active_indices() {
            self.check_liveness(slot, now);
        }

        for slot in std::mem::take(&mut self.pending_ungraceful) {
            let extra = dispatcher::disconnect(&mut self.players, &mut self.rooms, slot, false, now);
            self.deliver(extra);
        }
    }

    fn check_liveness(&mut self, slot: usize, now: Instant) {
        let Some(rec) = self.players.get(slot) else { return };
        if rec.state == PlayerState::Disconnected {
            return;
        }

        if rec.awaiting_pong {
            let timed_out = rec
                .last_ping_sent
                .is_some_and(|sent| now.duration_since(sent) > Duration::from_secs(self.session_config.pong_timeout_secs));
            if timed_out {
                tracing::info!(slot, "pong timeout");
                self.close_connection(slot);
                let extra = dispatcher::disconnect(&mut self.players, &mut self.rooms, slot, false, now);
                self.deliver(extra);
            }
        } else if now.duration_since(rec.last_activity) > Duration::from_secs(self.session_config.ping_interval_secs) {
            self.players.record_ping_sent(slot, now);
            self.send(slot, &ServerMessage::Ping);
        }
    }

    fn broadcast_shutdown(&mut self) {
        for slot in self.players.iter_active_indices() {
            self.send(slot, &ServerMessage::ServerShutdown);
        }
    }

    fn deliver(&mut self, outgoing: Vec<Outgoing>) {
        for Outgoing { target, message } in outgoing {
            self.send(target, &message);
        }
    }

    fn send(&mut self, slot: usize, message: &ServerMessage) {
        let Some(conn) = self.connections.get_mut(slot).and_then(|c| c.as_mut()) else { return };
        conn.queue_write(message.encode().as_bytes());
        match conn.flush() {
            Ok(true) => {}
            Ok(false) => {
                let _ = self.poll.registry().reregister(
                    &mut conn.stream,
                    slot_to_token(slot),
                    Interest::READABLE | Interest::WRITABLE,
                );
            }
            Err(e) => {
                tracing::warn!(slot, error = %e, "write failed, scheduling disconnect");
                self.close_connection(slot);
                self.pending_ungraceful.push(slot);
            }
        }
    }

    fn close_connection(&mut self, slot: usize) {
        if let Some(mut conn) = self.connections[slot].take() {
            let _ = self.poll.registry().deregister(&mut conn.stream);
        }
    }
}

/// Parses and dispatches one already-framed line.
fn handle_frame(
    players: &mut PlayerTable,
    rooms: &mut RoomRegistry,
    slot: usize,
    line: &str,
    now: Instant,
) -> (Vec<Outgoing>, bool, Option<AfterDispatch>) {
    let trimmed = trim_terminator(line);

    let parsed = match parse_line(trimmed) {
        Ok(p) => p,
        Err(_) => {
            return (
                vec![Outgoing { target: slot, message: ServerMessage::Error { code: ErrorCode::InvalidFormat } }],
                true,
                None,
            );
        }
    };

    let cmd = match ClientCommand::from_parts(&parsed.command, &parsed.params) {
        Ok(c) => c,
        Err(_) => {
            return (
                vec![Outgoing { target: slot, message: ServerMessage::Error { code: ErrorCode::UnknownCommand } }],
                true,
                None,
            );
        }
    };

    let result = dispatcher::dispatch(players, rooms, slot, cmd, now);
    (result.outgoing, result.invalid, result.after)
}
