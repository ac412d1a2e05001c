//! TCP keepalive tuning via `socket2`.
//!
//! `mio`'s `TcpStream` doesn't expose keepalive knobs directly, so we
//! drop down to `socket2` on the raw file descriptor to set them. This
//! mirrors how the source configures `SO_KEEPALIVE` plus the
//! `TCP_KEEPIDLE`/`TCP_KEEPINTVL`/`TCP_KEEPCNT` trio where the OS
//! supports it — best-effort, since not every platform implements all
//! three.

use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};

use crate::TransportError;

/// Keepalive timing applied to every accepted connection.
#[derive(Debug, Clone, Copy)]
pub struct KeepaliveConfig {
    /// Seconds of idleness before the first probe.
    pub idle: Duration,
    /// Seconds between probes once idle.
    pub interval: Duration,
    /// Probes sent before the connection is considered dead.
    pub retries: u32,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            idle: Duration::from_secs(10),
            interval: Duration::from_secs(5),
            retries: 3,
        }
    }
}

/// Applies `cfg` to an already-connected socket. Safe to call on any
/// `AsRawFd`-capable stream; platforms that don't support one of the
/// three knobs simply ignore it.
pub fn apply_keepalive(
    stream: &mio::net::TcpStream,
    cfg: KeepaliveConfig,
) -> Result<(), TransportError> {
    let sock = SockRef::from(stream);
    let params = TcpKeepalive::new()
        .with_time(cfg.idle)
        .with_interval(cfg.interval)
        .with_retries(cfg.retries);
    sock.set_tcp_keepalive(&params)
        .map_err(TransportError::KeepaliveFailed)
}
