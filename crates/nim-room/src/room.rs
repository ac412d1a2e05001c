//! The room registry: a fixed-capacity arena of two-seat game rooms.
//!
//! Like the session layer's player table, this is a plain `Vec` sized
//! once at startup (`max_rooms`). A room never holds a player
//! reference directly — only the player's slot index into the session
//! layer's table — so the two layers never need to know about each
//! other's internal representation, only the shared index currency.

use nim_protocol::{RoomId, RoomListing};
use nim_rules::{Game, Seat};

use crate::RoomError;

/// Capacity of a room: exactly two seats, never more.
const SEATS: usize = 2;

/// One room: a name, up to two occupied seats, and the game they're
/// playing.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub active: bool,
    /// Player-table slot index occupying each seat, if any.
    pub players: [Option<usize>; SEATS],
    pub game: Game,
}

impl Room {
    fn empty(id: RoomId) -> Self {
        Self {
            id,
            name: String::new(),
            active: false,
            players: [None, None],
            game: Game::new(),
        }
    }

    /// Number of seats currently occupied.
    pub fn player_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_some()).count()
    }

    /// Finds which seat a given player slot occupies, if any.
    pub fn seat_of(&self, player_slot: usize) -> Option<Seat> {
        self.players.iter().position(|p| *p == Some(player_slot)).map(|i| i as Seat)
    }

    /// Returns the other seat's occupant, if any.
    pub fn opponent_of(&self, player_slot: usize) -> Option<usize> {
        let seat = self.seat_of(player_slot)?;
        self.players[1 - seat as usize]
    }
}

/// Outcome of successfully joining a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    pub seat: Seat,
    pub opponent: Option<usize>,
    /// `true` if this join filled the second seat and started the game.
    pub game_started: bool,
}

/// Outcome of leaving a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub opponent: Option<usize>,
    /// `true` if the room had a game in `Playing`/`Paused` when this
    /// player left (the caller must forfeit it in favor of `opponent`).
    pub forfeited_game: bool,
    /// `true` if the room is now empty and has been deactivated.
    pub room_emptied: bool,
}

/// The fixed-capacity table of rooms.
pub struct RoomRegistry {
    rooms: Vec<Room>,
}

impl RoomRegistry {
    /// Creates a registry with exactly `capacity` room slots, all free.
    pub fn new(capacity: usize) -> Self {
        let rooms =
            (0..capacity).map(|i| Room::empty(RoomId(i))).collect();
        Self { rooms }
    }

    pub fn capacity(&self) -> usize {
        self.rooms.len()
    }

    pub fn active_count(&self) -> usize {
        self.rooms.iter().filter(|r| r.active).count()
    }

    pub fn get(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(id.0).filter(|r| r.active)
    }

    pub fn get_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(id.0).filter(|r| r.active)
    }

    /// `true` if an active room already uses this name.
    pub fn name_taken(&self, name: &str) -> bool {
        self.rooms.iter().any(|r| r.active && r.name == name)
    }

    /// Allocates the lowest free room slot with the given name.
    ///
    /// # Errors
    /// [`RoomError::NameTaken`] if another active room has this name,
    /// [`RoomError::RegistryFull`] if every slot is in use.
    pub fn create_room(&mut self, name: String) -> Result<RoomId, RoomError> {
        if self.name_taken(&name) {
            return Err(RoomError::NameTaken);
        }
        let room = self
            .rooms
            .iter_mut()
            .find(|r| !r.active)
            .ok_or(RoomError::RegistryFull)?;
        room.active = true;
        room.name = name;
        room.players = [None, None];
        room.game = Game::new();
        tracing::info!(room_id = %room.id, name = %room.name, "room created");
        Ok(room.id)
    }

    /// Seats `player_slot` in `id`, starting the game if this fills
    /// the second seat.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if the room isn't active,
    /// [`RoomError::RoomFull`] if both seats are occupied.
    pub fn join_room(
        &mut self,
        id: RoomId,
        player_slot: usize,
    ) -> Result<JoinOutcome, RoomError> {
        let room = self.rooms.get_mut(id.0).filter(|r| r.active).ok_or(RoomError::NotFound(id))?;

        let free_seat = room
            .players
            .iter()
            .position(|p| p.is_none())
            .ok_or(RoomError::RoomFull(id))?;
        room.players[free_seat] = Some(player_slot);

        let opponent = room.players[1 - free_seat];
        let game_started = opponent.is_some();
        if game_started {
            room.game.start().expect("freshly filled room is Waiting");
        }

        tracing::info!(
            room_id = %id,
            player_slot,
            seat = free_seat,
            game_started,
            "player joined room"
        );

        Ok(JoinOutcome {
            seat: free_seat as Seat,
            opponent,
            game_started,
        })
    }

    /// Removes `player_slot` from `id`. If the game was live, it is
    /// forfeited in the remaining player's favor. If the room is now
    /// empty, it is deactivated and its slot freed for reuse.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if the room isn't active,
    /// [`RoomError::NotInRoom`] if `player_slot` doesn't occupy a seat.
    pub fn leave_room(
        &mut self,
        id: RoomId,
        player_slot: usize,
    ) -> Result<LeaveOutcome, RoomError> {
        let room = self.rooms.get_mut(id.0).filter(|r| r.active).ok_or(RoomError::NotFound(id))?;

        let seat = room.seat_of(player_slot).ok_or(RoomError::NotInRoom(id))?;
        room.players[seat as usize] = None;
        let opponent = room.players[1 - seat as usize];

        let forfeited_game = matches!(
            room.game.phase(),
            nim_rules::Phase::Playing | nim_rules::Phase::Paused
        );
        if forfeited_game {
            room.game.forfeit(seat);
        }

        let room_emptied = room.player_count() == 0;
        if room_emptied {
            let id = room.id;
            *room = Room::empty(id);
            tracing::info!(room_id = %id, "room emptied and deactivated");
        }

        Ok(LeaveOutcome { opponent, forfeited_game, room_emptied })
    }

    /// Room listings for every active room, in slot order — the order
    /// `LIST_ROOMS` reports them in.
    pub fn list_rooms(&self) -> Vec<RoomListing> {
        self.rooms
            .iter()
            .filter(|r| r.active)
            .map(|r| RoomListing {
                id: r.id,
                name: r.name.clone(),
                player_count: r.player_count(),
                capacity: SEATS,
            })
            .collect()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_room_allocates_lowest_free_slot() {
        let mut reg = RoomRegistry::new(4);
        let a = reg.create_room("alpha".into()).unwrap();
        let b = reg.create_room("beta".into()).unwrap();
        assert_eq!(a, RoomId(0));
        assert_eq!(b, RoomId(1));
    }

    #[test]
    fn create_room_rejects_duplicate_name() {
        let mut reg = RoomRegistry::new(4);
        reg.create_room("alpha".into()).unwrap();
        assert_eq!(
            reg.create_room("alpha".into()),
            Err(RoomError::NameTaken)
        );
    }

    #[test]
    fn create_room_registry_full() {
        let mut reg = RoomRegistry::new(1);
        reg.create_room("alpha".into()).unwrap();
        assert_eq!(
            reg.create_room("beta".into()),
            Err(RoomError::RegistryFull)
        );
    }

    #[test]
    fn join_room_first_player_waits_second_starts_game() {
        let mut reg = RoomRegistry::new(2);
        let id = reg.create_room("alpha".into()).unwrap();

        let first = reg.join_room(id, 10).unwrap();
        assert_eq!(first.seat, 0);
        assert!(first.opponent.is_none());
        assert!(!first.game_started);

        let second = reg.join_room(id, 11).unwrap();
        assert_eq!(second.seat, 1);
        assert_eq!(second.opponent, Some(10));
        assert!(second.game_started);
        assert_eq!(reg.get(id).unwrap().game.phase(), nim_rules::Phase::Playing);
    }

    #[test]
    fn join_room_full_rejects_third_player() {
        let mut reg = RoomRegistry::new(1);
        let id = reg.create_room("alpha".into()).unwrap();
        reg.join_room(id, 10).unwrap();
        reg.join_room(id, 11).unwrap();
        assert_eq!(reg.join_room(id, 12), Err(RoomError::RoomFull(id)));
    }

    #[test]
    fn join_room_not_found_for_inactive_slot() {
        let mut reg = RoomRegistry::new(1);
        assert_eq!(
            reg.join_room(RoomId(0), 10),
            Err(RoomError::NotFound(RoomId(0)))
        );
    }

    #[test]
    fn leave_room_during_game_forfeits_to_opponent() {
        let mut reg = RoomRegistry::new(1);
        let id = reg.create_room("alpha".into()).unwrap();
        reg.join_room(id, 10).unwrap();
        reg.join_room(id, 11).unwrap();

        let outcome = reg.leave_room(id, 10).unwrap();
        assert_eq!(outcome.opponent, Some(11));
        assert!(outcome.forfeited_game);
        assert!(!outcome.room_emptied);
        assert_eq!(reg.get(id).unwrap().game.winner(), Some(1));
    }

    #[test]
    fn leave_room_last_player_deactivates_room() {
        let mut reg = RoomRegistry::new(1);
        let id = reg.create_room("alpha".into()).unwrap();
        reg.join_room(id, 10).unwrap();
        reg.join_room(id, 11).unwrap();

        reg.leave_room(id, 10).unwrap();
        let outcome = reg.leave_room(id, 11).unwrap();
        assert!(outcome.room_emptied);
        assert!(reg.get(id).is_none());
    }

    #[test]
    fn leave_room_rejects_non_member() {
        let mut reg = RoomRegistry::new(1);
        let id = reg.create_room("alpha".into()).unwrap();
        reg.join_room(id, 10).unwrap();
        assert_eq!(
            reg.leave_room(id, 99),
            Err(RoomError::NotInRoom(id))
        );
    }

    #[test]
    fn list_rooms_reports_only_active_rooms_in_slot_order() {
        let mut reg = RoomRegistry::new(4);
        let a = reg.create_room("alpha".into()).unwrap();
        reg.create_room("beta".into()).unwrap();
        reg.join_room(a, 10).unwrap();

        let listing = reg.list_rooms();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].name, "alpha");
        assert_eq!(listing[0].player_count, 1);
        assert_eq!(listing[0].capacity, 2);
    }

    #[test]
    fn emptied_room_slot_is_reusable() {
        let mut reg = RoomRegistry::new(1);
        let id = reg.create_room("alpha".into()).unwrap();
        reg.join_room(id, 10).unwrap();
        reg.leave_room(id, 10).unwrap();

        let reused = reg.create_room("beta".into()).unwrap();
        assert_eq!(reused, id);
    }
}
