//! Error types for the session (player table) layer.

/// Errors that can occur while managing player slots.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No free slot was available (`max_clients` already in use).
    #[error("server is full")]
    TableFull,

    /// The given slot index doesn't refer to an active slot.
    #[error("slot {0} is not active")]
    NotActive(usize),

    /// Operation required a nickname but the slot has none set.
    #[error("slot {0} has no nickname")]
    NoNickname(usize),
}
