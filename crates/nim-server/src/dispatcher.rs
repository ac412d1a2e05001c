//! Command dispatch: maps one parsed client command onto player/room
//! state mutations and the replies/notifications they produce.
//!
//! This module performs no I/O. It takes the session and room tables
//! plus a parsed [`ClientCommand`], mutates them, and returns the list
//! of [`Outgoing`] messages the event loop must deliver. Keeping
//! dispatch pure like this is what lets the integration tests drive it
//! without a real socket.

use std::time::Instant;

use nim_protocol::{
    validate_nickname, validate_room_name, ClientCommand, ErrorCode,
    OpponentMove, PlayerStatus, RoomId, ServerMessage,
};
use nim_room::RoomRegistry;
use nim_rules::RuleError;
use nim_session::{PlayerState, PlayerTable};

/// One message the event loop must deliver to a specific player slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub target: usize,
    pub message: ServerMessage,
}

fn to(target: usize, message: ServerMessage) -> Outgoing {
    Outgoing { target, message }
}

/// What the event loop should do with the sender's connection once
/// dispatch returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterDispatch {
    Continue,
    /// Close the connection gracefully (the player asked to, or the
    /// peer closed cleanly with nothing at stake).
    DisconnectGraceful,
}

/// The result of dispatching one command.
#[derive(Debug, Default)]
pub struct DispatchResult {
    pub outgoing: Vec<Outgoing>,
    /// `true` if this command should count against the invalid-message
    /// budget (see the escalation rule in the wire protocol).
    pub invalid: bool,
    pub after: Option<AfterDispatch>,
}

impl DispatchResult {
    fn ok(outgoing: Vec<Outgoing>) -> Self {
        Self { outgoing, invalid: false, after: None }
    }

    fn invalid(outgoing: Vec<Outgoing>) -> Self {
        Self { outgoing, invalid: true, after: None }
    }
}

fn nickname_of(players: &PlayerTable, slot: usize) -> String {
    players
        .get(slot)
        .and_then(|s| s.nickname.clone())
        .unwrap_or_default()
}

/// Dispatches one already-parsed command for `slot`.
pub fn dispatch(
    players: &mut PlayerTable,
    rooms: &mut RoomRegistry,
    slot: usize,
    cmd: ClientCommand,
    now: Instant,
) -> DispatchResult {
    match cmd {
        ClientCommand::Login { nickname } => login(players, rooms, slot, nickname),
        ClientCommand::ListRooms => list_rooms(players, rooms, slot),
        ClientCommand::CreateRoom { name } => create_room(players, rooms, slot, name),
        ClientCommand::JoinRoom { raw_id } => join_room(players, rooms, slot, raw_id),
        ClientCommand::LeaveRoom => leave_room(players, rooms, slot),
        ClientCommand::Take { raw_count } => take(players, rooms, slot, raw_count),
        ClientCommand::Skip => skip(players, rooms, slot),
        ClientCommand::Ping => DispatchResult::ok(vec![to(slot, ServerMessage::Pong)]),
        ClientCommand::Pong => {
            players.record_pong(slot, now);
            DispatchResult::ok(vec![])
        }
        ClientCommand::Logout => {
            let outgoing = disconnect(players, rooms, slot, true, now);
            DispatchResult {
                outgoing,
                invalid: false,
                after: Some(AfterDispatch::DisconnectGraceful),
            }
        }
    }
}

fn login(
    players: &mut PlayerTable,
    rooms: &mut RoomRegistry,
    slot: usize,
    nickname: String,
) -> DispatchResult {
    let state = players.get(slot).map(|s| s.state);
    if state != Some(PlayerState::Connecting) {
        return DispatchResult::ok(vec![to(
            slot,
            ServerMessage::LoginErr { code: ErrorCode::AlreadyLoggedIn },
        )]);
    }

    if !validate_nickname(&nickname) {
        return DispatchResult::invalid(vec![to(
            slot,
            ServerMessage::LoginErr { code: ErrorCode::NicknameInvalid },
        )]);
    }

    if let Some(dormant) = players.find_disconnected_by_nickname(&nickname) {
        return reconnect(players, rooms, dormant, slot);
    }

    if players.find_live_by_nickname(&nickname).is_some() {
        return DispatchResult::ok(vec![to(
            slot,
            ServerMessage::LoginErr { code: ErrorCode::NicknameTaken },
        )]);
    }

    players.complete_login(slot, nickname);
    DispatchResult::ok(vec![to(slot, ServerMessage::LoginOk)])
}

/// Restores a dormant session onto a freshly-connected socket. See the
/// workspace design notes for why `IN_GAME` is restored unconditionally
/// even when the room's game is no longer `PAUSED`.
fn reconnect(
    players: &mut PlayerTable,
    rooms: &mut RoomRegistry,
    dormant: usize,
    new_slot: usize,
) -> DispatchResult {
    // `reconnect_into` transfers identity onto `new_slot` even when it
    // returns `Err` — that only signals "the dormant record had no
    // room", in which case the player has already landed in `Lobby`
    // and a plain `LOGIN_OK` is the right reply.
    let info = match players.reconnect_into(dormant, new_slot) {
        Ok(info) => info,
        Err(_) => {
            return DispatchResult::ok(vec![to(new_slot, ServerMessage::LoginOk)]);
        }
    };

    let mut outgoing = vec![to(new_slot, ServerMessage::LoginOk)];

    let Some(room) = rooms.get_mut(info.room_id) else {
        return DispatchResult::ok(outgoing);
    };
    if room.game.phase() != nim_rules::Phase::Paused {
        return DispatchResult::ok(outgoing);
    }

    // The room still lists the dormant slot as the seat occupant —
    // `mark_disconnected` never told the room anything changed. Point
    // the seat at `new_slot` before doing any seat-relative lookups.
    let seat = room.seat_of(dormant).expect("reconnecting player must still hold a seat");
    room.players[seat as usize] = Some(new_slot);

    room.game.resume().expect("phase checked above");
    let opponent = room.opponent_of(new_slot);

    outgoing.push(to(
        new_slot,
        ServerMessage::GameResumed {
            stones: room.game.stones(),
            your_turn: room.game.is_players_turn(seat),
            your_skips: room.game.skips(seat),
            opponent_skips: room.game.skips(1 - seat),
        },
    ));

    if let Some(opp) = opponent {
        outgoing.push(to(
            opp,
            ServerMessage::PlayerStatus {
                nickname: nickname_of(players, new_slot),
                status: PlayerStatus::Reconnected,
            },
        ));
    }

    DispatchResult::ok(outgoing)
}

fn require_lobby(players: &PlayerTable, slot: usize) -> Option<ErrorCode> {
    match players.get(slot).map(|s| s.state) {
        Some(PlayerState::Lobby) => None,
        Some(PlayerState::Connecting) | Some(PlayerState::Disconnected) | None => {
            Some(ErrorCode::NotLoggedIn)
        }
        Some(PlayerState::InRoom) | Some(PlayerState::InGame) => {
            Some(ErrorCode::GameInProgress)
        }
    }
}

fn list_rooms(
    players: &PlayerTable,
    rooms: &RoomRegistry,
    slot: usize,
) -> DispatchResult {
    if let Some(code) = require_lobby(players, slot) {
        return DispatchResult::ok(vec![to(slot, ServerMessage::Error { code })]);
    }
    DispatchResult::ok(vec![to(
        slot,
        ServerMessage::Rooms { rooms: rooms.list_rooms() },
    )])
}

fn create_room(
    players: &mut PlayerTable,
    rooms: &mut RoomRegistry,
    slot: usize,
    name: String,
) -> DispatchResult {
    if let Some(code) = require_lobby(players, slot) {
        return DispatchResult::ok(vec![to(slot, ServerMessage::RoomErr { code })]);
    }
    if !validate_room_name(&name) {
        return DispatchResult::invalid(vec![to(
            slot,
            ServerMessage::RoomErr { code: ErrorCode::InvalidParams },
        )]);
    }

    match rooms.create_room(name) {
        Ok(id) => {
            let outcome = rooms.join_room(id, slot).expect("just created, has a free seat");
            if let Some(p) = players.get_mut(slot) {
                p.state = PlayerState::InRoom;
                p.room_id = Some(id);
            }
            debug_assert!(!outcome.game_started, "a brand-new room can't fill on the first join");
            DispatchResult::ok(vec![to(slot, ServerMessage::RoomCreated { id })])
        }
        Err(nim_room::RoomError::NameTaken) => DispatchResult::ok(vec![to(
            slot,
            ServerMessage::RoomErr { code: ErrorCode::RoomNameTaken },
        )]),
        Err(nim_room::RoomError::RegistryFull) => DispatchResult::ok(vec![to(
            slot,
            ServerMessage::RoomErr { code: ErrorCode::MaxRooms },
        )]),
        Err(_) => DispatchResult::ok(vec![to(
            slot,
            ServerMessage::RoomErr { code: ErrorCode::Internal },
        )]),
    }
}

fn join_room(
    players: &mut PlayerTable,
    rooms: &mut RoomRegistry,
    slot: usize,
    raw_id: String,
) -> DispatchResult {
    if let Some(code) = require_lobby(players, slot) {
        return DispatchResult::ok(vec![to(slot, ServerMessage::RoomErr { code })]);
    }
    let Ok(raw) = raw_id.parse::<usize>() else {
        return DispatchResult::invalid(vec![to(
            slot,
            ServerMessage::RoomErr { code: ErrorCode::InvalidParams },
        )]);
    };
    let id = RoomId(raw);

    match rooms.join_room(id, slot) {
        Ok(outcome) => {
            let opponent_nick = outcome.opponent.map(|s| nickname_of(players, s));
            if let Some(p) = players.get_mut(slot) {
                p.room_id = Some(id);
                p.state = if outcome.game_started {
                    PlayerState::InGame
                } else {
                    PlayerState::InRoom
                };
            }

            let mut outgoing = vec![to(
                slot,
                ServerMessage::RoomJoined { id, opponent: opponent_nick.clone() },
            )];

            if outcome.game_started {
                if let Some(opp) = outcome.opponent {
                    if let Some(p) = players.get_mut(opp) {
                        p.state = PlayerState::InGame;
                    }
                    let room = rooms.get(id).expect("just joined");
                    let my_nick = nickname_of(players, slot);
                    outgoing.push(to(
                        slot,
                        ServerMessage::GameStart {
                            stones: room.game.stones(),
                            your_turn: room.game.is_players_turn(outcome.seat),
                            opponent: opponent_nick.unwrap_or_default(),
                        },
                    ));
                    outgoing.push(to(
                        opp,
                        ServerMessage::GameStart {
                            stones: room.game.stones(),
                            your_turn: room.game.is_players_turn(1 - outcome.seat),
                            opponent: my_nick,
                        },
                    ));
                }
            } else {
                outgoing.push(to(slot, ServerMessage::WaitOpponent));
            }

            DispatchResult::ok(outgoing)
        }
        Err(nim_room::RoomError::NotFound(_)) => DispatchResult::ok(vec![to(
            slot,
            ServerMessage::RoomErr { code: ErrorCode::RoomNotFound },
        )]),
        Err(nim_room::RoomError::RoomFull(_)) => DispatchResult::ok(vec![to(
            slot,
            ServerMessage::RoomErr { code: ErrorCode::RoomFull },
        )]),
        Err(_) => DispatchResult::ok(vec![to(
            slot,
            ServerMessage::RoomErr { code: ErrorCode::Internal },
        )]),
    }
}

fn leave_room(
    players: &mut PlayerTable,
    rooms: &mut RoomRegistry,
    slot: usize,
) -> DispatchResult {
    let room_id = match players.get(slot).and_then(|p| p.room_id) {
        Some(id) => id,
        None => {
            return DispatchResult::ok(vec![to(
                slot,
                ServerMessage::Error { code: ErrorCode::NotInRoom },
            )]);
        }
    };

    let mut outgoing = leave_current_room(players, rooms, slot, room_id);
    outgoing.push(to(slot, ServerMessage::LeaveOk));
    DispatchResult::ok(outgoing)
}

/// Shared leave logic used by explicit `LEAVE_ROOM` and by disconnect
/// handling. Per the design notes, a `GAME_OVER` only goes to the
/// remaining opponent — the leaver gets `LEAVE_OK` (or nothing, on a
/// disconnect) but never `GAME_OVER` for their own departure.
fn leave_current_room(
    players: &mut PlayerTable,
    rooms: &mut RoomRegistry,
    slot: usize,
    room_id: RoomId,
) -> Vec<Outgoing> {
    let mut outgoing = Vec::new();
    let Ok(result) = rooms.leave_room(room_id, slot) else {
        return outgoing;
    };

    // A forfeit always means the room's session is over: the opponent
    // is also released from the room so it deactivates and its slot
    // can be reused, instead of sitting occupied by one seated player.
    //
    // Only do this if the opponent is actually still connected. A
    // dormant (Disconnected) opponent has its own reconnect window
    // running independently — sending it a GameOver or overwriting its
    // state to Lobby here would both be unreachable (its socket is
    // already closed) and corrupt the record the timer tick is still
    // tracking.
    if result.forfeited_game {
        if let Some(opp) = result.opponent {
            let opponent_live = players
                .get(opp)
                .is_some_and(|p| p.state != PlayerState::Disconnected);
            if opponent_live {
                let winner = nickname_of(players, opp);
                let loser = nickname_of(players, slot);
                outgoing.push(to(opp, ServerMessage::GameOver { winner, loser }));
                let _ = rooms.leave_room(room_id, opp);
                if let Some(p) = players.get_mut(opp) {
                    p.state = PlayerState::Lobby;
                    p.room_id = None;
                }
            }
        }
    }

    if let Some(p) = players.get_mut(slot) {
        p.state = PlayerState::Lobby;
        p.room_id = None;
    }

    outgoing
}

fn require_in_game(players: &PlayerTable, slot: usize) -> Option<ErrorCode> {
    match players.get(slot).map(|s| s.state) {
        Some(PlayerState::InGame) => None,
        _ => Some(ErrorCode::NotInGame),
    }
}

fn take(
    players: &mut PlayerTable,
    rooms: &mut RoomRegistry,
    slot: usize,
    raw_count: String,
) -> DispatchResult {
    if let Some(code) = require_in_game(players, slot) {
        return DispatchResult::ok(vec![to(slot, ServerMessage::Error { code })]);
    }
    let room_id = players.get(slot).and_then(|p| p.room_id).expect("in-game player has a room");
    let Ok(count) = raw_count.parse::<u32>() else {
        return DispatchResult::invalid(vec![to(
            slot,
            ServerMessage::TakeErr { code: ErrorCode::InvalidParams },
        )]);
    };

    let room = rooms.get_mut(room_id).expect("in-game player's room exists");
    let seat = room.seat_of(slot).expect("in-game player occupies a seat");

    match room.game.take(seat, count) {
        Ok(outcome) => {
            let opponent = room.opponent_of(slot);
            let mut outgoing = vec![to(
                slot,
                ServerMessage::TakeOk {
                    remaining: outcome.remaining,
                    your_turn: room.game.is_players_turn(seat),
                },
            )];
            if let Some(opp) = opponent {
                outgoing.push(to(
                    opp,
                    ServerMessage::OpponentAction {
                        action: OpponentMove::Take(count),
                        remaining: outcome.remaining,
                    },
                ));
            }

            if outcome.finished {
                let winner_seat = outcome.winner.expect("finished take always has a winner");
                let winner_slot = if winner_seat == seat { slot } else { opponent.unwrap_or(slot) };
                let loser_slot = if winner_seat == seat { opponent.unwrap_or(slot) } else { slot };
                let winner = nickname_of(players, winner_slot);
                let loser = nickname_of(players, loser_slot);

                outgoing.push(to(slot, ServerMessage::GameOver { winner: winner.clone(), loser: loser.clone() }));
                if let Some(opp) = opponent {
                    outgoing.push(to(opp, ServerMessage::GameOver { winner, loser }));
                }
                end_game_return_to_lobby(players, rooms, room_id, slot, opponent);
            }

            DispatchResult::ok(outgoing)
        }
        Err(RuleError::NotYourTurn) => DispatchResult::invalid(vec![to(
            slot,
            ServerMessage::TakeErr { code: ErrorCode::NotYourTurn },
        )]),
        Err(RuleError::InvalidMove) => DispatchResult::invalid(vec![to(
            slot,
            ServerMessage::TakeErr { code: ErrorCode::InvalidMove },
        )]),
        Err(_) => DispatchResult::ok(vec![to(
            slot,
            ServerMessage::TakeErr { code: ErrorCode::Internal },
        )]),
    }
}

fn skip(
    players: &mut PlayerTable,
    rooms: &mut RoomRegistry,
    slot: usize,
) -> DispatchResult {
    if let Some(code) = require_in_game(players, slot) {
        return DispatchResult::ok(vec![to(slot, ServerMessage::Error { code })]);
    }
    let room_id = players.get(slot).and_then(|p| p.room_id).expect("in-game player has a room");
    let room = rooms.get_mut(room_id).expect("in-game player's room exists");
    let seat = room.seat_of(slot).expect("in-game player occupies a seat");

    match room.game.skip(seat) {
        Ok(()) => {
            let opponent = room.opponent_of(slot);
            let mut outgoing = vec![to(
                slot,
                ServerMessage::SkipOk { your_turn: room.game.is_players_turn(seat) },
            )];
            if let Some(opp) = opponent {
                outgoing.push(to(
                    opp,
                    ServerMessage::OpponentAction {
                        action: OpponentMove::Skip,
                        remaining: room.game.stones(),
                    },
                ));
            }
            DispatchResult::ok(outgoing)
        }
        Err(RuleError::NotYourTurn) => DispatchResult::invalid(vec![to(
            slot,
            ServerMessage::SkipErr { code: ErrorCode::NotYourTurn },
        )]),
        Err(RuleError::NoSkipsLeft) => DispatchResult::invalid(vec![to(
            slot,
            ServerMessage::SkipErr { code: ErrorCode::NoSkipsLeft },
        )]),
        Err(_) => DispatchResult::ok(vec![to(
            slot,
            ServerMessage::SkipErr { code: ErrorCode::Internal },
        )]),
    }
}

/// Both players return to `LOBBY` and the room is released once a game
/// concludes by running out of stones (as opposed to a forfeit, which
/// `leave_current_room` already handles).
fn end_game_return_to_lobby(
    players: &mut PlayerTable,
    rooms: &mut RoomRegistry,
    room_id: RoomId,
    slot: usize,
    opponent: Option<usize>,
) {
    let _ = rooms.leave_room(room_id, slot);
    if let Some(opp) = opponent {
        let _ = rooms.leave_room(room_id, opp);
        if let Some(p) = players.get_mut(opp) {
            p.state = PlayerState::Lobby;
            p.room_id = None;
        }
    }
    if let Some(p) = players.get_mut(slot) {
        p.state = PlayerState::Lobby;
        p.room_id = None;
    }
}

/// Classifies and applies a disconnect for `slot`. `graceful` is `true`
/// for `LOGOUT` or a clean peer close outside a live game; `false` for
/// read errors, protocol violations, or a pong timeout.
///
/// Graceful: any live game is forfeited in the opponent's favor, then
/// the slot is freed outright. Ungraceful while `PLAYING`: the game is
/// paused and the slot becomes `DISCONNECTED`, retaining nickname and
/// room for the reconnect window; the opponent is notified. Ungraceful
/// while already `PAUSED` (the opponent disconnected first): this slot
/// also becomes `DISCONNECTED`, with no opponent left to notify or
/// touch. Ungraceful with no live game: the slot is freed like a
/// graceful disconnect.
pub fn disconnect(
    players: &mut PlayerTable,
    rooms: &mut RoomRegistry,
    slot: usize,
    graceful: bool,
    now: Instant,
) -> Vec<Outgoing> {
    let Some(p) = players.get(slot) else { return Vec::new() };
    let room_id = p.room_id;
    let state = p.state;

    if !graceful {
        if let Some(id) = room_id {
            if let Some(room) = rooms.get_mut(id) {
                match room.game.phase() {
                    nim_rules::Phase::Playing => {
                        room.game.pause().expect("checked Playing above");
                        let nickname = nickname_of(players, slot);
                        let opponent = room.opponent_of(slot);
                        players.mark_disconnected(slot, now);

                        return opponent
                            .map(|opp| {
                                vec![to(
                                    opp,
                                    ServerMessage::PlayerStatus {
                                        nickname,
                                        status: PlayerStatus::Disconnected,
                                    },
                                )]
                            })
                            .unwrap_or_default();
                    }
                    nim_rules::Phase::Paused => {
                        // The opponent is already dormant from an
                        // earlier ungraceful disconnect (that's why
                        // the game is Paused rather than Playing).
                        // Mark this slot dormant too and stop — there
                        // is no live opponent to forfeit against, and
                        // touching the opponent's own dormant record
                        // here would stomp its reconnect window.
                        players.mark_disconnected(slot, now);
                        return Vec::new();
                    }
                    _ => {}
                }
            }
        }
    }

    let mut outgoing = Vec::new();
    if let Some(id) = room_id {
        if matches!(state, PlayerState::InRoom | PlayerState::InGame) {
            outgoing = leave_current_room(players, rooms, slot, id);
        }
    }
    players.free(slot, now);
    outgoing
}

/// Called by the timer tick when a `DISCONNECTED` slot's reconnect
/// window has elapsed: the opponent is awarded the win and the slot is
/// freed.
pub fn expire_reconnect_window(
    players: &mut PlayerTable,
    rooms: &mut RoomRegistry,
    slot: usize,
    now: Instant,
) -> Vec<Outgoing> {
    let Some(p) = players.get(slot) else { return Vec::new() };
    let room_id = p.room_id;
    let nickname = p.nickname.clone().unwrap_or_default();

    let mut outgoing = Vec::new();
    if let Some(id) = room_id {
        if let Some(room) = rooms.get_mut(id) {
            let opponent = room.opponent_of(slot);
            if let Some(opp) = opponent {
                // The opponent may itself be dormant (both sides
                // disconnected while the game was paused). Its own
                // reconnect window is tracked independently — don't
                // award it a win or touch its state here.
                let opponent_live = players
                    .get(opp)
                    .is_some_and(|p| p.state != PlayerState::Disconnected);
                if opponent_live {
                    let winner = nickname_of(players, opp);
                    outgoing.push(to(
                        opp,
                        ServerMessage::GameOver { winner, loser: nickname },
                    ));
                    if let Some(p) = players.get_mut(opp) {
                        p.state = PlayerState::Lobby;
                        p.room_id = None;
                    }
                }
            }
        }
        let _ = rooms.leave_room(id, slot);
    }
    players.free(slot, now);
    outgoing
}

#[cfg(test)]
mod tests {
    use super::*;
    use nim_session::SessionConfig;

    fn setup() -> (PlayerTable, RoomRegistry) {
        (PlayerTable::new(4, SessionConfig::default()), RoomRegistry::new(4))
    }

    fn login_as(players: &mut PlayerTable, rooms: &mut RoomRegistry, slot: usize, nick: &str) {
        let r = dispatch(players, rooms, slot, ClientCommand::Login { nickname: nick.into() }, Instant::now());
        assert_eq!(r.outgoing, vec![to(slot, ServerMessage::LoginOk)]);
    }

    #[test]
    fn login_rejects_invalid_nickname() {
        let (mut players, mut rooms) = setup();
        let slot = players.allocate(Instant::now()).unwrap();
        let r = dispatch(&mut players, &mut rooms, slot, ClientCommand::Login { nickname: "1bad".into() }, Instant::now());
        assert!(r.invalid);
        assert_eq!(
            r.outgoing,
            vec![to(slot, ServerMessage::LoginErr { code: ErrorCode::NicknameInvalid })]
        );
    }

    #[test]
    fn login_rejects_duplicate_live_nickname() {
        let (mut players, mut rooms) = setup();
        let a = players.allocate(Instant::now()).unwrap();
        let b = players.allocate(Instant::now()).unwrap();
        login_as(&mut players, &mut rooms, a, "alice");
        let r = dispatch(&mut players, &mut rooms, b, ClientCommand::Login { nickname: "alice".into() }, Instant::now());
        assert_eq!(
            r.outgoing,
            vec![to(b, ServerMessage::LoginErr { code: ErrorCode::NicknameTaken })]
        );
    }

    #[test]
    fn create_then_join_starts_the_game() {
        let (mut players, mut rooms) = setup();
        let a = players.allocate(Instant::now()).unwrap();
        let b = players.allocate(Instant::now()).unwrap();
        login_as(&mut players, &mut rooms, a, "alice");
        login_as(&mut players, &mut rooms, b, "bob");

        let created = dispatch(&mut players, &mut rooms, a, ClientCommand::CreateRoom { name: "r1".into() }, Instant::now());
        assert_eq!(created.outgoing, vec![to(a, ServerMessage::RoomCreated { id: RoomId(0) })]);

        let joined = dispatch(&mut players, &mut rooms, b, ClientCommand::JoinRoom { raw_id: "0".into() }, Instant::now());
        assert!(joined.outgoing.iter().any(|o| matches!(o.message, ServerMessage::GameStart { .. })));
        assert_eq!(players.get(a).unwrap().state, PlayerState::InGame);
        assert_eq!(players.get(b).unwrap().state, PlayerState::InGame);
    }

    #[test]
    fn take_out_of_turn_is_rejected_and_counted_invalid() {
        let (mut players, mut rooms) = setup();
        let a = players.allocate(Instant::now()).unwrap();
        let b = players.allocate(Instant::now()).unwrap();
        login_as(&mut players, &mut rooms, a, "alice");
        login_as(&mut players, &mut rooms, b, "bob");
        dispatch(&mut players, &mut rooms, a, ClientCommand::CreateRoom { name: "r1".into() }, Instant::now());
        dispatch(&mut players, &mut rooms, b, ClientCommand::JoinRoom { raw_id: "0".into() }, Instant::now());

        let r = dispatch(&mut players, &mut rooms, b, ClientCommand::Take { raw_count: "2".into() }, Instant::now());
        assert!(r.invalid);
        assert_eq!(r.outgoing, vec![to(b, ServerMessage::TakeErr { code: ErrorCode::NotYourTurn })]);
    }

    #[test]
    fn leave_room_during_game_forfeits_without_game_over_to_leaver() {
        let (mut players, mut rooms) = setup();
        let a = players.allocate(Instant::now()).unwrap();
        let b = players.allocate(Instant::now()).unwrap();
        login_as(&mut players, &mut rooms, a, "alice");
        login_as(&mut players, &mut rooms, b, "bob");
        dispatch(&mut players, &mut rooms, a, ClientCommand::CreateRoom { name: "r1".into() }, Instant::now());
        dispatch(&mut players, &mut rooms, b, ClientCommand::JoinRoom { raw_id: "0".into() }, Instant::now());

        let r = dispatch(&mut players, &mut rooms, a, ClientCommand::LeaveRoom, Instant::now());
        assert!(r.outgoing.iter().any(|o| o.target == b && matches!(o.message, ServerMessage::GameOver { .. })));
        assert!(!r.outgoing.iter().any(|o| o.target == a && matches!(o.message, ServerMessage::GameOver { .. })));
        assert!(r.outgoing.iter().any(|o| o.target == a && o.message == ServerMessage::LeaveOk));
    }

    #[test]
    fn ungraceful_disconnect_mid_game_pauses_and_marks_dormant() {
        let (mut players, mut rooms) = setup();
        let a = players.allocate(Instant::now()).unwrap();
        let b = players.allocate(Instant::now()).unwrap();
        login_as(&mut players, &mut rooms, a, "alice");
        login_as(&mut players, &mut rooms, b, "bob");
        dispatch(&mut players, &mut rooms, a, ClientCommand::CreateRoom { name: "r1".into() }, Instant::now());
        dispatch(&mut players, &mut rooms, b, ClientCommand::JoinRoom { raw_id: "0".into() }, Instant::now());

        let now = Instant::now();
        let outgoing = disconnect(&mut players, &mut rooms, a, false, now);
        assert_eq!(players.get(a).unwrap().state, PlayerState::Disconnected);
        assert_eq!(
            outgoing,
            vec![to(b, ServerMessage::PlayerStatus { nickname: "alice".into(), status: PlayerStatus::Disconnected })]
        );
        assert_eq!(rooms.get(RoomId(0)).unwrap().game.phase(), nim_rules::Phase::Paused);
    }

    #[test]
    fn second_ungraceful_disconnect_while_already_paused_does_not_touch_the_dormant_opponent() {
        let (mut players, mut rooms) = setup();
        let a = players.allocate(Instant::now()).unwrap();
        let b = players.allocate(Instant::now()).unwrap();
        login_as(&mut players, &mut rooms, a, "alice");
        login_as(&mut players, &mut rooms, b, "bob");
        dispatch(&mut players, &mut rooms, a, ClientCommand::CreateRoom { name: "r1".into() }, Instant::now());
        dispatch(&mut players, &mut rooms, b, ClientCommand::JoinRoom { raw_id: "0".into() }, Instant::now());

        let now = Instant::now();
        disconnect(&mut players, &mut rooms, a, false, now);
        assert_eq!(players.get(a).unwrap().state, PlayerState::Disconnected);
        assert_eq!(rooms.get(RoomId(0)).unwrap().game.phase(), nim_rules::Phase::Paused);

        // Bob's connection also drops, ungracefully, while the game is
        // already Paused from alice's earlier disconnect.
        let outgoing = disconnect(&mut players, &mut rooms, b, false, now);
        assert!(outgoing.is_empty(), "no live opponent remains to notify");
        assert_eq!(players.get(b).unwrap().state, PlayerState::Disconnected);

        // Alice's dormant record must be untouched: still Disconnected,
        // still holding her room and nickname, not silently bounced to
        // Lobby (which would leak her slot forever and lock her nickname).
        let alice = players.get(a).unwrap();
        assert_eq!(alice.state, PlayerState::Disconnected);
        assert_eq!(alice.room_id, Some(RoomId(0)));
        assert_eq!(alice.nickname.as_deref(), Some("alice"));
    }

    #[test]
    fn reconnect_resumes_paused_game_losslessly() {
        let (mut players, mut rooms) = setup();
        let a = players.allocate(Instant::now()).unwrap();
        let b = players.allocate(Instant::now()).unwrap();
        login_as(&mut players, &mut rooms, a, "alice");
        login_as(&mut players, &mut rooms, b, "bob");
        dispatch(&mut players, &mut rooms, a, ClientCommand::CreateRoom { name: "r1".into() }, Instant::now());
        dispatch(&mut players, &mut rooms, b, ClientCommand::JoinRoom { raw_id: "0".into() }, Instant::now());
        dispatch(&mut players, &mut rooms, a, ClientCommand::Take { raw_count: "2".into() }, Instant::now());

        disconnect(&mut players, &mut rooms, b, false, Instant::now());

        let c = players.allocate(Instant::now()).unwrap();
        let r = dispatch(&mut players, &mut rooms, c, ClientCommand::Login { nickname: "bob".into() }, Instant::now());
        assert!(r.outgoing.iter().any(|o| o.message == ServerMessage::LoginOk));
        assert!(r.outgoing.iter().any(|o| matches!(o.message, ServerMessage::GameResumed { stones: 19, your_turn: true, .. })));
        assert_eq!(players.get(c).unwrap().state, PlayerState::InGame);

        // The room must have re-pointed the seat at the new slot, or
        // this call fails with NotInGame instead of taking stones.
        let r2 = dispatch(&mut players, &mut rooms, c, ClientCommand::Take { raw_count: "1".into() }, Instant::now());
        assert!(r2.outgoing.iter().any(|o| matches!(o.message, ServerMessage::TakeOk { remaining: 18, .. })));
    }

    #[test]
    fn expired_reconnect_window_awards_opponent_the_win() {
        let (mut players, mut rooms) = setup();
        let a = players.allocate(Instant::now()).unwrap();
        let b = players.allocate(Instant::now()).unwrap();
        login_as(&mut players, &mut rooms, a, "alice");
        login_as(&mut players, &mut rooms, b, "bob");
        dispatch(&mut players, &mut rooms, a, ClientCommand::CreateRoom { name: "r1".into() }, Instant::now());
        dispatch(&mut players, &mut rooms, b, ClientCommand::JoinRoom { raw_id: "0".into() }, Instant::now());
        disconnect(&mut players, &mut rooms, a, false, Instant::now());

        let outgoing = expire_reconnect_window(&mut players, &mut rooms, a, Instant::now());
        assert_eq!(
            outgoing,
            vec![to(b, ServerMessage::GameOver { winner: "bob".into(), loser: "alice".into() })]
        );
        assert!(players.get(a).is_none());
        assert_eq!(players.get(b).unwrap().state, PlayerState::Lobby);
    }
}
