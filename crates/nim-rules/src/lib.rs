//! Pure state transitions for a misere Nim position.
//!
//! One pile of stones, two players, each turn removes 1..=3 stones.
//! Unlike ordinary Nim, the player forced to take the *last* stone
//! loses rather than wins. Each player may also skip their turn once
//! per game without touching the pile.
//!
//! This crate has no notion of sockets, rooms, or nicknames — it is
//! the payload, not the engine. Every operation is total: illegal
//! moves return an [`Err`] instead of panicking or silently doing
//! nothing, so callers never need to pre-validate beyond what the
//! return type already tells them.

use std::fmt;

/// Number of stones a new game starts with.
pub const INITIAL_STONES: u32 = 21;
/// Smallest number of stones a player may take in one turn.
pub const MIN_TAKE: u32 = 1;
/// Largest number of stones a player may take in one turn.
pub const MAX_TAKE: u32 = 3;
/// Skip credits each player is given at the start of a game.
pub const SKIPS_PER_PLAYER: u8 = 1;

/// Which seat is acting: 0 or 1. The room layer maps these onto actual
/// player records; this crate only ever sees the index.
pub type Seat = u8;

/// Lifecycle phase of a game position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Room has two seats but `start()` has not yet been called.
    Waiting,
    /// A turn is in progress.
    Playing,
    /// Play is suspended (a player disconnected mid-game); all fields
    /// are preserved so `resume()` is lossless.
    Paused,
    /// The game has a winner and will not accept further moves.
    Finished,
}

/// Why an operation on a [`Game`] was rejected.
///
/// Each variant maps directly onto one of the wire error codes in the
/// protocol layer's `ErrorCode` enum; the mapping lives in the
/// dispatcher, not here, so this crate stays free of wire concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleError {
    /// The game isn't in `Playing` (e.g. `WAITING`, `PAUSED`, or
    /// already `FINISHED`).
    NotPlaying,
    /// It's the other seat's turn.
    NotYourTurn,
    /// `take` count was outside `MIN_TAKE..=MAX_TAKE` or exceeded the
    /// remaining pile.
    InvalidMove,
    /// The seat has already used its one skip this game.
    NoSkipsLeft,
    /// `pause`/`resume`/`start` was called from a phase that doesn't
    /// allow it.
    WrongPhase,
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            RuleError::NotPlaying => "game is not in progress",
            RuleError::NotYourTurn => "not your turn",
            RuleError::InvalidMove => "invalid move",
            RuleError::NoSkipsLeft => "no skips remaining",
            RuleError::WrongPhase => "illegal in the current phase",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for RuleError {}

/// The outcome of a successful `take`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TakeOutcome {
    /// Stones left in the pile after the move.
    pub remaining: u32,
    /// `true` if this move emptied the pile and ended the game.
    pub finished: bool,
    /// The losing seat, set only when `finished` is true.
    pub winner: Option<Seat>,
}

/// A single misere Nim position: the pile, whose turn it is, and each
/// seat's remaining skip credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Game {
    phase: Phase,
    stones: u32,
    current: Seat,
    skips: [u8; 2],
    winner: Option<Seat>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    /// Creates a fresh position in `Waiting`, pile pre-loaded but no
    /// turn in progress yet — mirrors the source's `game_init`, which
    /// sets `stones`/`skips` up front even before `start()`.
    pub fn new() -> Self {
        Self {
            phase: Phase::Waiting,
            stones: INITIAL_STONES,
            current: 0,
            skips: [SKIPS_PER_PLAYER, SKIPS_PER_PLAYER],
            winner: None,
        }
    }

    /// Resets to a brand-new `Waiting` position, discarding all state.
    /// Used when a room is recycled for a new pair of players.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Starts play: legal only from `Waiting`. Seat 0 always moves
    /// first.
    pub fn start(&mut self) -> Result<(), RuleError> {
        if self.phase != Phase::Waiting {
            return Err(RuleError::WrongPhase);
        }
        self.phase = Phase::Playing;
        self.stones = INITIAL_STONES;
        self.current = 0;
        self.skips = [SKIPS_PER_PLAYER, SKIPS_PER_PLAYER];
        self.winner = None;
        Ok(())
    }

    /// Removes `count` stones on behalf of `seat`. On success, toggles
    /// the turn unless the pile is now empty, in which case the
    /// *mover* loses (misere rule) and the game finishes.
    pub fn take(
        &mut self,
        seat: Seat,
        count: u32,
    ) -> Result<TakeOutcome, RuleError> {
        if self.phase != Phase::Playing {
            return Err(RuleError::NotPlaying);
        }
        if seat != self.current {
            return Err(RuleError::NotYourTurn);
        }
        if !self.validate_take(count) {
            return Err(RuleError::InvalidMove);
        }

        self.stones -= count;

        if self.stones == 0 {
            self.phase = Phase::Finished;
            self.winner = Some(1 - seat);
            return Ok(TakeOutcome {
                remaining: 0,
                finished: true,
                winner: self.winner,
            });
        }

        self.current = 1 - self.current;
        Ok(TakeOutcome {
            remaining: self.stones,
            finished: false,
            winner: None,
        })
    }

    /// Passes the turn for `seat` without touching the pile, consuming
    /// that seat's one-time skip credit.
    pub fn skip(&mut self, seat: Seat) -> Result<(), RuleError> {
        if self.phase != Phase::Playing {
            return Err(RuleError::NotPlaying);
        }
        if seat != self.current {
            return Err(RuleError::NotYourTurn);
        }
        if self.skips[seat as usize] == 0 {
            return Err(RuleError::NoSkipsLeft);
        }
        self.skips[seat as usize] -= 1;
        self.current = 1 - self.current;
        Ok(())
    }

    /// Suspends play, e.g. because a player disconnected. No-op error
    /// if not currently `Playing`.
    pub fn pause(&mut self) -> Result<(), RuleError> {
        if self.phase != Phase::Playing {
            return Err(RuleError::WrongPhase);
        }
        self.phase = Phase::Paused;
        Ok(())
    }

    /// Resumes a paused game exactly where it left off.
    pub fn resume(&mut self) -> Result<(), RuleError> {
        if self.phase != Phase::Paused {
            return Err(RuleError::WrongPhase);
        }
        self.phase = Phase::Playing;
        Ok(())
    }

    /// Ends the game immediately with `loser` taking the loss — used
    /// when a player leaves or fails to reconnect in time rather than
    /// running out of stones.
    pub fn forfeit(&mut self, loser: Seat) {
        self.phase = Phase::Finished;
        self.winner = Some(1 - loser);
    }

    fn validate_take(&self, count: u32) -> bool {
        (MIN_TAKE..=MAX_TAKE).contains(&count) && count <= self.stones
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stones(&self) -> u32 {
        self.stones
    }

    pub fn current(&self) -> Seat {
        self.current
    }

    pub fn skips(&self, seat: Seat) -> u8 {
        self.skips[seat as usize]
    }

    pub fn winner(&self) -> Option<Seat> {
        self.winner
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn is_players_turn(&self, seat: Seat) -> bool {
        self.phase == Phase::Playing && self.current == seat
    }
}
