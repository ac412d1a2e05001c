//! Integration tests driving full login / room / game flows through
//! the dispatch layer directly, without opening real sockets. This
//! exercises the same session and room state machines the `mio` event
//! loop drives, without the nondeterminism of real I/O timing.

use std::time::Instant;

use nim_protocol::{ClientCommand, ErrorCode, OpponentMove, PlayerStatus, ServerMessage};
use nim_room::RoomRegistry;
use nim_session::{PlayerState, PlayerTable, SessionConfig};
use nim_server::testing::{disconnect, dispatch, expire_reconnect_window};

fn setup(max_clients: usize, max_rooms: usize) -> (PlayerTable, RoomRegistry) {
    (PlayerTable::new(max_clients, SessionConfig::default()), RoomRegistry::new(max_rooms))
}

fn login(players: &mut PlayerTable, rooms: &mut RoomRegistry, slot: usize, nick: &str) {
    let r = dispatch(players, rooms, slot, ClientCommand::Login { nickname: nick.into() }, Instant::now());
    assert_eq!(r.outgoing.len(), 1);
    assert_eq!(r.outgoing[0].message, ServerMessage::LoginOk);
}

#[test]
fn full_game_to_completion() {
    let (mut players, mut rooms) = setup(4, 4);
    let alice = players.allocate(Instant::now()).unwrap();
    let bob = players.allocate(Instant::now()).unwrap();
    login(&mut players, &mut rooms, alice, "alice");
    login(&mut players, &mut rooms, bob, "bob");

    let created = dispatch(&mut players, &mut rooms, alice, ClientCommand::CreateRoom { name: "den".into() }, Instant::now());
    assert!(matches!(created.outgoing[0].message, ServerMessage::RoomCreated { .. }));

    let joined = dispatch(&mut players, &mut rooms, bob, ClientCommand::JoinRoom { raw_id: "0".into() }, Instant::now());
    assert!(joined.outgoing.iter().any(|o| o.target == bob && matches!(o.message, ServerMessage::GameStart { .. })));
    assert!(joined.outgoing.iter().any(|o| o.target == alice && matches!(o.message, ServerMessage::GameStart { .. })));
    assert_eq!(players.get(alice).unwrap().state, PlayerState::InGame);
    assert_eq!(players.get(bob).unwrap().state, PlayerState::InGame);

    // Whoever has your_turn true in GameStart moves first.
    let alice_turn = joined
        .outgoing
        .iter()
        .find(|o| o.target == alice)
        .map(|o| matches!(&o.message, ServerMessage::GameStart { your_turn: true, .. }))
        .unwrap();
    let (mut mover, mut other) = if alice_turn { (alice, bob) } else { (bob, alice) };

    // Drain the pile down to 1 stone by alternating legal takes.
    let mut stones = 21u32;
    while stones > 1 {
        let take = if stones > 3 { 2 } else { stones - 1 };
        let r = dispatch(&mut players, &mut rooms, mover, ClientCommand::Take { raw_count: take.to_string() }, Instant::now());
        assert!(r.outgoing.iter().any(|o| o.target == mover && matches!(o.message, ServerMessage::TakeOk { .. })));
        assert!(r.outgoing.iter().any(|o| o.target == other && matches!(&o.message, ServerMessage::OpponentAction { action: OpponentMove::Take(n), .. } if *n == take)));
        stones -= take;
        std::mem::swap(&mut mover, &mut other);
    }

    // One stone left; whoever's turn it is must take it and lose (misere).
    let loser_nick = players.get(mover).unwrap().nickname.clone().unwrap();
    let r = dispatch(&mut players, &mut rooms, mover, ClientCommand::Take { raw_count: "1".into() }, Instant::now());
    assert!(r.outgoing.iter().any(|o| matches!(&o.message, ServerMessage::GameOver { loser, .. } if loser == &loser_nick)));
    assert_eq!(players.get(mover).unwrap().state, PlayerState::Lobby);
    assert_eq!(players.get(other).unwrap().state, PlayerState::Lobby);
}

#[test]
fn disconnect_during_game_then_reconnect_resumes() {
    let (mut players, mut rooms) = setup(4, 4);
    let alice = players.allocate(Instant::now()).unwrap();
    let bob = players.allocate(Instant::now()).unwrap();
    login(&mut players, &mut rooms, alice, "alice");
    login(&mut players, &mut rooms, bob, "bob");
    dispatch(&mut players, &mut rooms, alice, ClientCommand::CreateRoom { name: "den".into() }, Instant::now());
    dispatch(&mut players, &mut rooms, bob, ClientCommand::JoinRoom { raw_id: "0".into() }, Instant::now());

    let out = disconnect(&mut players, &mut rooms, bob, false, Instant::now());
    assert_eq!(out, vec![nim_server::testing::Outgoing {
        target: alice,
        message: ServerMessage::PlayerStatus { nickname: "bob".into(), status: PlayerStatus::Disconnected },
    }]);
    assert_eq!(players.get(bob).unwrap().state, PlayerState::Disconnected);

    // Bob reconnects into a fresh slot using the same nickname.
    let bob2 = players.allocate(Instant::now()).unwrap();
    let r = dispatch(&mut players, &mut rooms, bob2, ClientCommand::Login { nickname: "bob".into() }, Instant::now());
    assert!(r.outgoing.iter().any(|o| o.target == bob2 && o.message == ServerMessage::LoginOk));
    assert!(r.outgoing.iter().any(|o| o.target == bob2 && matches!(o.message, ServerMessage::GameResumed { .. })));
    assert!(r.outgoing.iter().any(|o| o.target == alice && matches!(&o.message, ServerMessage::PlayerStatus { status: PlayerStatus::Reconnected, .. })));
    assert_eq!(players.get(bob2).unwrap().state, PlayerState::InGame);

    // The reconnected slot must be able to act in the room, not just observe it.
    let take = dispatch(&mut players, &mut rooms, bob2, ClientCommand::Take { raw_count: "1".into() }, Instant::now());
    assert!(!take.invalid, "reconnected player's seat must resolve to the new slot");
}

#[test]
fn reconnect_window_expiry_awards_the_opponent() {
    let (mut players, mut rooms) = setup(4, 4);
    let alice = players.allocate(Instant::now()).unwrap();
    let bob = players.allocate(Instant::now()).unwrap();
    login(&mut players, &mut rooms, alice, "alice");
    login(&mut players, &mut rooms, bob, "bob");
    dispatch(&mut players, &mut rooms, alice, ClientCommand::CreateRoom { name: "den".into() }, Instant::now());
    dispatch(&mut players, &mut rooms, bob, ClientCommand::JoinRoom { raw_id: "0".into() }, Instant::now());

    disconnect(&mut players, &mut rooms, alice, false, Instant::now());
    assert_eq!(players.get(alice).unwrap().state, PlayerState::Disconnected);

    let out = expire_reconnect_window(&mut players, &mut rooms, alice, Instant::now());
    assert!(out.iter().any(|o| o.target == bob && matches!(&o.message, ServerMessage::GameOver { winner, .. } if winner == "bob")));
    assert_eq!(players.get(bob).unwrap().state, PlayerState::Lobby);
    assert!(players.get(alice).is_none(), "the dormant slot must be freed once the window lapses");
}

#[test]
fn leaving_mid_game_forfeits_to_the_opponent() {
    let (mut players, mut rooms) = setup(4, 4);
    let alice = players.allocate(Instant::now()).unwrap();
    let bob = players.allocate(Instant::now()).unwrap();
    login(&mut players, &mut rooms, alice, "alice");
    login(&mut players, &mut rooms, bob, "bob");
    dispatch(&mut players, &mut rooms, alice, ClientCommand::CreateRoom { name: "den".into() }, Instant::now());
    dispatch(&mut players, &mut rooms, bob, ClientCommand::JoinRoom { raw_id: "0".into() }, Instant::now());

    let r = dispatch(&mut players, &mut rooms, alice, ClientCommand::LeaveRoom, Instant::now());
    assert!(r.outgoing.iter().any(|o| o.target == alice && o.message == ServerMessage::LeaveOk));
    assert!(r.outgoing.iter().any(|o| o.target == bob && matches!(&o.message, ServerMessage::GameOver { winner, loser } if winner == "bob" && loser == "alice")));
    assert_eq!(players.get(alice).unwrap().state, PlayerState::Lobby);
    assert_eq!(players.get(bob).unwrap().state, PlayerState::Lobby);

    // The room must be reusable afterward, not stuck with stale occupants.
    let created = dispatch(&mut players, &mut rooms, alice, ClientCommand::CreateRoom { name: "den".into() }, Instant::now());
    assert!(matches!(created.outgoing[0].message, ServerMessage::RoomCreated { .. }));
}

#[test]
fn invalid_frames_past_the_budget_end_the_session() {
    let (mut players, mut rooms) = setup(4, 4);
    let slot = players.allocate(Instant::now()).unwrap();

    // max_invalid_messages defaults to 3; the third strike should
    // report invalid but the caller (the event loop) decides to close
    // only once record_invalid itself returns true.
    for _ in 0..2 {
        let r = dispatch(&mut players, &mut rooms, slot, ClientCommand::Login { nickname: "1bad".into() }, Instant::now());
        assert!(r.invalid);
        assert!(!players.record_invalid(slot));
    }
    let r = dispatch(&mut players, &mut rooms, slot, ClientCommand::Login { nickname: "1bad".into() }, Instant::now());
    assert!(r.invalid);
    assert!(players.record_invalid(slot), "the third invalid message should trip the cap");
}

#[test]
fn duplicate_login_is_rejected() {
    let (mut players, mut rooms) = setup(4, 4);
    let slot = players.allocate(Instant::now()).unwrap();
    login(&mut players, &mut rooms, slot, "alice");

    let r = dispatch(&mut players, &mut rooms, slot, ClientCommand::Login { nickname: "alice".into() }, Instant::now());
    assert_eq!(r.outgoing[0].message, ServerMessage::LoginErr { code: ErrorCode::AlreadyLoggedIn });
}
