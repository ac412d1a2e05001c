//! The player table: a fixed-capacity arena of player slots.
//!
//! This is the central piece of the session layer. It owns every
//! player record the server knows about and is responsible for:
//! - Handing out a free slot to a newly-accepted socket
//! - Completing fresh logins and nickname-based reconnects
//! - Classifying and applying disconnects (graceful vs. dormant)
//! - Reaping `Disconnected` slots whose reconnect window has elapsed
//! - Tracking the per-slot rate-limit bucket and invalid-message count
//!
//! # Arena, not `HashMap`
//!
//! Rooms and other players reference a player only by its `usize`
//! index into this table — never by a pointer, an `Rc`, or a borrowed
//! reference. A slot's identity *is* its index, so a stale reference
//! simply looks up a slot that has since been reset rather than
//! dangling. The table is a plain `Vec`, sized once at startup; it
//! never grows, matching the server's fixed `max_clients` bound.
//!
//! # Concurrency note
//!
//! `PlayerTable` is NOT thread-safe by itself — it's owned by the
//! single-threaded event loop and never shared across threads.

use std::time::Instant;

use nim_protocol::RoomId;

use crate::{PlayerSlot, PlayerState, SessionConfig, SessionError};

/// What a nickname-reconnect transfer hands back to the caller so it
/// can notify the room layer and the reconnecting client.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectInfo {
    pub room_id: RoomId,
    pub skip_credit: u8,
}

/// Owns every player slot the server can ever have open at once.
pub struct PlayerTable {
    slots: Vec<PlayerSlot>,
    config: SessionConfig,
}

impl PlayerTable {
    /// Creates a table with exactly `capacity` slots, all free.
    pub fn new(capacity: usize, config: SessionConfig) -> Self {
        let now = Instant::now();
        let slots =
            (0..capacity).map(|i| PlayerSlot::empty(i, now)).collect();
        Self { slots, config }
    }

    /// Number of slots in the table (the configured `max_clients`).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots currently in use (any state).
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.active).count()
    }

    pub fn get(&self, index: usize) -> Option<&PlayerSlot> {
        self.slots.get(index).filter(|s| s.active)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut PlayerSlot> {
        self.slots.get_mut(index).filter(|s| s.active)
    }

    /// Iterates over every active slot, in slot-index order. The
    /// concurrency model (ties broken by slot-index ordering) depends
    /// on this iteration order.
    pub fn iter_active(&self) -> impl Iterator<Item = &PlayerSlot> {
        self.slots.iter().filter(|s| s.active)
    }

    pub fn iter_active_indices(&self) -> Vec<usize> {
        self.slots
            .iter()
            .filter(|s| s.active)
            .map(|s| s.index)
            .collect()
    }

    /// Hands out the lowest-numbered free slot to a newly-accepted
    /// connection, in `Connecting` state.
    ///
    /// # Errors
    /// [`SessionError::TableFull`] if every slot is in use.
    pub fn allocate(&mut self, now: Instant) -> Result<usize, SessionError> {
        let slot = self
            .slots
            .iter_mut()
            .find(|s| !s.active)
            .ok_or(SessionError::TableFull)?;
        slot.active = true;
        slot.last_activity = now;
        tracing::debug!(slot = slot.index, "player slot allocated");
        Ok(slot.index)
    }

    /// Frees a slot unconditionally, discarding any nickname or room
    /// association. Used for graceful disconnects and reconnect-window
    /// expiry.
    pub fn free(&mut self, index: usize, now: Instant) {
        if let Some(slot) = self.slots.get_mut(index) {
            tracing::debug!(slot = index, "player slot freed");
            slot.reset(now);
        }
    }

    /// Completes a fresh login: assigns the nickname and moves the
    /// slot into `Lobby`.
    pub fn complete_login(&mut self, index: usize, nickname: String) {
        if let Some(slot) = self.get_mut(index) {
            slot.nickname = Some(nickname);
            slot.state = PlayerState::Lobby;
        }
    }

    /// Finds an active slot in `Disconnected` state with the given
    /// nickname — the dormant record a reconnecting `LOGIN` should
    /// claim.
    pub fn find_disconnected_by_nickname(
        &self,
        nickname: &str,
    ) -> Option<usize> {
        self.slots
            .iter()
            .find(|s| {
                s.active
                    && s.state == PlayerState::Disconnected
                    && s.nickname.as_deref() == Some(nickname)
            })
            .map(|s| s.index)
    }

    /// Finds any active, *non*-`Disconnected` slot already using this
    /// nickname — a live collision that should produce
    /// `NICKNAME_TAKEN`.
    pub fn find_live_by_nickname(&self, nickname: &str) -> Option<usize> {
        self.slots
            .iter()
            .find(|s| {
                s.active
                    && s.state != PlayerState::Disconnected
                    && s.nickname.as_deref() == Some(nickname)
            })
            .map(|s| s.index)
    }

    /// Transfers identity from a dormant `Disconnected` slot onto a
    /// freshly-connected one, then frees the dormant slot.
    ///
    /// The dormant slot's last known state restores as `InGame` when
    /// it had a room — the source unconditionally restores `IN_GAME`
    /// for any dormant record with a room, even if that game had
    /// already finished before the reconnect (see the workspace
    /// design notes); the room layer is responsible for correcting
    /// that if the room turns out to be gone.
    ///
    /// # Errors
    /// [`SessionError::NotActive`] if either slot isn't active, or the
    /// dormant slot isn't actually `Disconnected`.
    pub fn reconnect_into(
        &mut self,
        dormant: usize,
        new_slot: usize,
    ) -> Result<ReconnectInfo, SessionError> {
        let (nickname, room_id, skip_credit) = {
            let old = self
                .slots
                .get(dormant)
                .filter(|s| s.active && s.state == PlayerState::Disconnected)
                .ok_or(SessionError::NotActive(dormant))?;
            (old.nickname.clone(), old.room_id, old.skip_credit)
        };

        let now = Instant::now();
        self.free(dormant, now);

        let new = self
            .slots
            .get_mut(new_slot)
            .filter(|s| s.active)
            .ok_or(SessionError::NotActive(new_slot))?;
        new.nickname = nickname;
        new.room_id = room_id;
        new.skip_credit = skip_credit;
        new.state = if room_id.is_some() {
            PlayerState::InGame
        } else {
            PlayerState::Lobby
        };

        tracing::info!(
            dormant,
            new_slot,
            "player reconnected by nickname"
        );

        let room_id = room_id.ok_or(SessionError::NotActive(new_slot))?;
        Ok(ReconnectInfo { room_id, skip_credit })
    }

    /// Moves a slot into `Disconnected`, retaining nickname and room
    /// id for the reconnect window. Called on ungraceful disconnects
    /// while a game is live.
    pub fn mark_disconnected(&mut self, index: usize, now: Instant) {
        if let Some(slot) = self.get_mut(index) {
            slot.state = PlayerState::Disconnected;
            slot.disconnect_time = Some(now);
            slot.inbound.clear();
            slot.awaiting_pong = false;
            tracing::info!(slot = index, "player marked disconnected");
        }
    }

    /// Scans every `Disconnected` slot and returns the indices whose
    /// reconnect window has elapsed. Callers are responsible for
    /// awarding the opponent the win and freeing the slot.
    pub fn expire_stale(&self, now: Instant) -> Vec<usize> {
        let grace =
            std::time::Duration::from_secs(self.config.reconnect_grace_secs);
        self.slots
            .iter()
            .filter(|s| s.active && s.state == PlayerState::Disconnected)
            .filter(|s| {
                s.disconnect_time
                    .is_some_and(|since| now.duration_since(since) > grace)
            })
            .map(|s| s.index)
            .collect()
    }

    /// Slots that have been `Connecting` for longer than the login
    /// timeout.
    pub fn login_timed_out(&self, now: Instant) -> Vec<usize> {
        let timeout =
            std::time::Duration::from_secs(self.config.login_timeout_secs);
        self.slots
            .iter()
            .filter(|s| s.active && s.state == PlayerState::Connecting)
            .filter(|s| now.duration_since(s.last_activity) > timeout)
            .map(|s| s.index)
            .collect()
    }

    /// Records activity on a connected message and resets the
    /// "awaiting pong" flag, since any traffic proves liveness.
    pub fn touch_activity(&mut self, index: usize, now: Instant) {
        if let Some(slot) = self.get_mut(index) {
            slot.last_activity = now;
        }
    }

    /// Records receipt of a `PONG`, clearing the awaiting-pong flag.
    pub fn record_pong(&mut self, index: usize, now: Instant) {
        if let Some(slot) = self.get_mut(index) {
            slot.awaiting_pong = false;
            slot.last_activity = now;
        }
    }

    /// Records that a `PING` was just sent.
    pub fn record_ping_sent(&mut self, index: usize, now: Instant) {
        if let Some(slot) = self.get_mut(index) {
            slot.last_ping_sent = Some(now);
            slot.awaiting_pong = true;
        }
    }

    /// Applies the per-second rate limit bucket. Returns `true` if
    /// this frame is within budget and should be dispatched; `false`
    /// if the caller should drop it and count an invalid.
    pub fn admit_frame(&mut self, index: usize, now: Instant) -> bool {
        let Some(slot) = self.get_mut(index) else { return false };
        if now.duration_since(slot.rate_bucket_started)
            >= std::time::Duration::from_secs(1)
        {
            slot.rate_bucket_started = now;
            slot.messages_this_second = 0;
        }
        slot.messages_this_second += 1;
        slot.messages_this_second <= self.config.max_messages_per_second
    }

    /// Increments the invalid-message counter for a slot. Returns
    /// `true` once the slot has reached the configured limit and
    /// should be terminated.
    pub fn record_invalid(&mut self, index: usize) -> bool {
        let Some(slot) = self.get_mut(index) else { return false };
        slot.invalid_count += 1;
        slot.invalid_count >= self.config.max_invalid_messages
    }
}

// =========================================================================
// Tests
// =========================================================================
