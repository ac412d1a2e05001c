/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listening socket failed.
    #[error("bind failed: {0}")]
    BindFailed(#[source] std::io::Error),

    /// Accepting a connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// Reading from a connection failed.
    #[error("read failed: {0}")]
    ReadFailed(#[source] std::io::Error),

    /// Writing to a connection failed.
    #[error("write failed: {0}")]
    WriteFailed(#[source] std::io::Error),

    /// Applying TCP keepalive options failed.
    #[error("keepalive configuration failed: {0}")]
    KeepaliveFailed(#[source] std::io::Error),

    /// Creating or registering with the `mio` reactor failed.
    #[error("poll registration failed: {0}")]
    PollFailed(#[source] std::io::Error),
}
