//! Integration tests for running lobbies: the directory, the actor and
//! event routing over per-player channels.

use std::sync::Arc;
use std::time::Duration;

use skulk_clock::TokioClock;
use skulk_lobby::{
    GameAction, GameEvent, GameSession, LobbyConfig, LobbyDirectory, LobbyError, LobbyHandle,
    LobbySettings, MatchOutcome, MatchPhase, TrueRole, Vec2, spawn_lobby,
};
use skulk_protocol::{LobbyCode, PlayerId};
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

fn pid(id: u64) -> PlayerId {
    PlayerId(id)
}

type Events = mpsc::UnboundedReceiver<GameEvent>;

fn channel() -> (mpsc::UnboundedSender<GameEvent>, Events) {
    mpsc::unbounded_channel()
}

/// Creates a dummy player sender (receiver is dropped immediately).
fn dummy_sender() -> mpsc::UnboundedSender<GameEvent> {
    channel().0
}

fn drain(rx: &mut Events) -> Vec<GameEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn manual_config() -> LobbyConfig {
    LobbyConfig {
        auto_end: false,
        ..LobbyConfig::default()
    }
}

fn spawn_manual(code: &str) -> LobbyHandle {
    let code = LobbyCode::parse(code).unwrap();
    let session = GameSession::seeded(manual_config(), 7);
    spawn_lobby(code, session, Arc::new(TokioClock::start()))
}

/// Joins `n` players, readies everyone and starts the match as P1.
async fn start_match(handle: &LobbyHandle, n: u64) -> Vec<Events> {
    let mut receivers = Vec::new();
    for i in 1..=n {
        let (tx, rx) = channel();
        handle.join(pid(i), tx).await.unwrap();
        receivers.push(rx);
    }
    for i in 2..=n {
        handle
            .send_action(pid(i), GameAction::SetReady { ready: true })
            .await
            .unwrap();
    }
    handle.send_action(pid(1), GameAction::StartMatch).await.unwrap();
    // A reply round-trip guarantees the actions above were processed.
    let info = handle.get_info().await.unwrap();
    assert_eq!(info.phase, MatchPhase::MatchInProgress);
    receivers
}

fn own_role(events: &[GameEvent]) -> Option<TrueRole> {
    events.iter().find_map(|e| match e {
        GameEvent::OwnRole { role } => Some(*role),
        _ => None,
    })
}

// =========================================================================
// LobbyDirectory tests
// =========================================================================

#[tokio::test]
async fn test_create_returns_unique_codes() {
    let mut dir = LobbyDirectory::default();
    let c1 = dir.create(pid(1), dummy_sender()).await.unwrap();
    let c2 = dir.create(pid(2), dummy_sender()).await.unwrap();
    assert_ne!(c1, c2);
    assert_eq!(dir.lobby_count(), 2);
    assert_eq!(dir.lobby_of(pid(1)), Some(&c1));
}

#[tokio::test]
async fn test_create_sends_host_snapshot() {
    let mut dir = LobbyDirectory::default();
    let (tx, mut rx) = channel();
    let code = dir.create(pid(1), tx).await.unwrap();

    let info = dir.handle(&code).unwrap().get_info().await.unwrap();
    assert_eq!(info.host, Some(pid(1)));
    assert_eq!(info.participant_count, 1);

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(e, GameEvent::Settings { .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::Phase {
            phase: MatchPhase::LobbyOpen
        }
    )));
    let roster = events
        .iter()
        .find_map(|e| match e {
            GameEvent::Roster(snapshot) => Some(snapshot),
            _ => None,
        })
        .expect("roster in snapshot");
    assert_eq!(roster.participants.len(), 1);
    assert!(roster.participants[0].is_host);
    assert_eq!(own_role(&events), None);
}

#[tokio::test]
async fn test_join_by_code_not_found() {
    let mut dir = LobbyDirectory::default();
    let code = LobbyCode::parse("ZZZZZZ").unwrap();
    let result = dir.join_by_code(pid(1), &code, dummy_sender()).await;
    assert!(matches!(result, Err(LobbyError::NotFound(_))));
}

#[tokio::test]
async fn test_join_by_code_one_lobby_at_a_time() {
    let mut dir = LobbyDirectory::default();
    let c1 = dir.create(pid(1), dummy_sender()).await.unwrap();
    let c2 = dir.create(pid(2), dummy_sender()).await.unwrap();

    dir.join_by_code(pid(3), &c1, dummy_sender()).await.unwrap();
    let result = dir.join_by_code(pid(3), &c2, dummy_sender()).await;
    assert!(matches!(result, Err(LobbyError::AlreadyInLobby(_, _))));
    assert_eq!(dir.lobby_of(pid(3)), Some(&c1));
}

#[tokio::test]
async fn test_join_by_code_existing_members_see_new_roster() {
    let mut dir = LobbyDirectory::default();
    let (tx, mut host_rx) = channel();
    let code = dir.create(pid(1), tx).await.unwrap();
    drain(&mut host_rx);

    dir.join_by_code(pid(2), &code, dummy_sender()).await.unwrap();
    dir.handle(&code).unwrap().get_info().await.unwrap();

    let rosters: Vec<_> = drain(&mut host_rx)
        .into_iter()
        .filter_map(|e| match e {
            GameEvent::Roster(snapshot) => Some(snapshot),
            _ => None,
        })
        .collect();
    assert_eq!(rosters.last().unwrap().participants.len(), 2);
}

#[tokio::test]
async fn test_join_by_code_at_capacity() {
    let config = LobbyConfig {
        initial_settings: LobbySettings {
            max_participants: 4,
            ..LobbySettings::default()
        },
        ..LobbyConfig::default()
    };
    let mut dir = LobbyDirectory::new(config);
    let code = dir.create(pid(1), dummy_sender()).await.unwrap();
    for i in 2..=4 {
        dir.join_by_code(pid(i), &code, dummy_sender()).await.unwrap();
    }

    let result = dir.join_by_code(pid(5), &code, dummy_sender()).await;
    assert!(matches!(result, Err(LobbyError::LobbyFull(_))));
    assert_eq!(dir.lobby_of(pid(5)), None);
}

#[tokio::test]
async fn test_quick_join_prefers_open_lobby() {
    let mut dir = LobbyDirectory::default();
    let code = dir.create(pid(1), dummy_sender()).await.unwrap();

    let joined = dir.quick_join(pid(2), dummy_sender()).await.unwrap();
    assert_eq!(joined, code);
    assert_eq!(dir.lobby_count(), 1);
}

#[tokio::test]
async fn test_quick_join_picks_lowest_open_code() {
    let mut dir = LobbyDirectory::default();
    let mut codes = Vec::new();
    for i in 1..=3 {
        codes.push(dir.create(pid(i), dummy_sender()).await.unwrap());
    }
    codes.sort();

    for i in 4..=6 {
        let joined = dir.quick_join(pid(i), dummy_sender()).await.unwrap();
        assert_eq!(joined, codes[0]);
    }
}

#[tokio::test]
async fn test_quick_join_creates_when_none_open() {
    let mut dir = LobbyDirectory::default();
    let code = dir.quick_join(pid(1), dummy_sender()).await.unwrap();
    assert_eq!(dir.lobby_count(), 1);
    let info = dir.handle(&code).unwrap().get_info().await.unwrap();
    assert_eq!(info.host, Some(pid(1)));
}

#[tokio::test]
async fn test_leave_last_player_closes_lobby() {
    let mut dir = LobbyDirectory::default();
    let code = dir.create(pid(1), dummy_sender()).await.unwrap();
    dir.join_by_code(pid(2), &code, dummy_sender()).await.unwrap();

    assert_eq!(dir.leave(pid(1)).await.unwrap(), code);
    assert_eq!(dir.lobby_count(), 1);
    let info = dir.handle(&code).unwrap().get_info().await.unwrap();
    assert_eq!(info.host, Some(pid(2)));

    dir.leave(pid(2)).await.unwrap();
    assert_eq!(dir.lobby_count(), 0);
    assert!(dir.handle(&code).is_none());
}

#[tokio::test]
async fn test_leave_not_in_lobby() {
    let mut dir = LobbyDirectory::default();
    let result = dir.leave(pid(9)).await;
    assert!(matches!(result, Err(LobbyError::NotInLobby(_))));
}

#[tokio::test]
async fn test_route_action_requires_membership() {
    let dir = LobbyDirectory::default();
    let result = dir.route_action(pid(1), GameAction::StartMatch).await;
    assert!(matches!(result, Err(LobbyError::NotInLobby(_))));
}

#[tokio::test]
async fn test_list_reports_open_lobbies() {
    let mut dir = LobbyDirectory::default();
    let c1 = dir.create(pid(1), dummy_sender()).await.unwrap();
    let _c2 = dir.create(pid(2), dummy_sender()).await.unwrap();
    dir.join_by_code(pid(3), &c1, dummy_sender()).await.unwrap();

    let list = dir.list().await;
    assert_eq!(list.len(), 2);
    let first = list.iter().find(|i| i.code == c1).unwrap();
    assert_eq!(first.participant_count, 2);
    assert!(first.to_entry().open);
}

// =========================================================================
// Lobby actor tests
// =========================================================================

#[tokio::test]
async fn test_start_match_delivers_roles_privately() {
    let handle = spawn_manual("ABCDEF");
    let mut receivers = start_match(&handle, 4).await;

    let mut hostiles = Vec::new();
    for (i, rx) in receivers.iter_mut().enumerate() {
        let events = drain(rx);
        let role = own_role(&events).expect("every eligible player learns its role");
        let role_events = events
            .iter()
            .filter(|e| matches!(e, GameEvent::OwnRole { .. }))
            .count();
        assert_eq!(role_events, 1, "exactly one own-role push per player");
        if role.is_hostile() {
            hostiles.push(pid(i as u64 + 1));
        }
    }
    assert_eq!(hostiles.len(), 1);
}

#[tokio::test]
async fn test_action_from_non_member_ignored() {
    let handle = spawn_manual("ABCDEG");
    let (tx, mut rx) = channel();
    handle.join(pid(1), tx).await.unwrap();
    drain(&mut rx);

    handle
        .send_action(pid(42), GameAction::SetReady { ready: true })
        .await
        .unwrap();
    handle.get_info().await.unwrap();
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_rejected_action_sends_nothing() {
    let handle = spawn_manual("ABCDEH");
    let (tx, mut rx) = channel();
    handle.join(pid(1), tx).await.unwrap();
    handle.join(pid(2), dummy_sender()).await.unwrap();
    drain(&mut rx);

    // P2 is not the host.
    handle.send_action(pid(2), GameAction::StartMatch).await.unwrap();
    let info = handle.get_info().await.unwrap();
    assert_eq!(info.phase, MatchPhase::LobbyOpen);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_rejoin_same_player_resends_snapshot() {
    let handle = spawn_manual("ABCDEJ");
    handle.join(pid(1), dummy_sender()).await.unwrap();

    let (tx, mut rx) = channel();
    handle.join(pid(1), tx).await.unwrap();
    handle.get_info().await.unwrap();

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(e, GameEvent::Roster(_))));
    assert_eq!(handle.get_info().await.unwrap().participant_count, 1);
}

#[tokio::test]
async fn test_elimination_broadcast_reaches_everyone() {
    let handle = spawn_manual("ABCDEK");
    let mut receivers = start_match(&handle, 4).await;

    let roles: Vec<_> = receivers
        .iter_mut()
        .map(|rx| own_role(&drain(rx)).unwrap())
        .collect();
    let hostile = pid(roles.iter().position(|r| r.is_hostile()).unwrap() as u64 + 1);
    let victim = pid(roles.iter().position(|r| !r.is_hostile()).unwrap() as u64 + 1);

    handle
        .send_action(
            hostile,
            GameAction::ReportPosition {
                position: Vec2::new(0.0, 0.0),
            },
        )
        .await
        .unwrap();
    handle
        .send_action(
            victim,
            GameAction::ReportPosition {
                position: Vec2::new(1.0, 1.0),
            },
        )
        .await
        .unwrap();
    handle
        .send_action(hostile, GameAction::RequestElimination { target: victim })
        .await
        .unwrap();
    handle.get_info().await.unwrap();

    for rx in &mut receivers {
        let events = drain(rx);
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::EliminationEffect { victim: v } if *v == victim
        )));
    }
}

#[tokio::test(start_paused = true)]
async fn test_end_match_returns_to_lobby_after_delay() {
    let handle = spawn_manual("ABCDEL");
    let mut receivers = start_match(&handle, 3).await;

    assert!(handle.end_match(MatchOutcome::BenignVictory).await.unwrap());
    assert!(!handle.end_match(MatchOutcome::BenignVictory).await.unwrap());
    assert_eq!(handle.get_info().await.unwrap().phase, MatchPhase::PostMatch);

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(handle.get_info().await.unwrap().phase, MatchPhase::PostMatch);

    tokio::time::sleep(Duration::from_secs(2)).await;
    let info = handle.get_info().await.unwrap();
    assert_eq!(info.phase, MatchPhase::LobbyOpen);
    assert!(info.is_open());

    let events = drain(&mut receivers[1]);
    assert!(events.iter().any(|e| matches!(e, GameEvent::MatchEnded { .. })));
    assert!(matches!(
        events.last(),
        Some(GameEvent::Phase {
            phase: MatchPhase::LobbyOpen
        }) | Some(GameEvent::Settings { .. })
    ));
}

#[tokio::test]
async fn test_end_match_without_match_is_noop() {
    let handle = spawn_manual("ABCDEM");
    handle.join(pid(1), dummy_sender()).await.unwrap();
    assert!(!handle.end_match(MatchOutcome::HostileVictory).await.unwrap());
    assert_eq!(handle.get_info().await.unwrap().phase, MatchPhase::LobbyOpen);
}

#[tokio::test]
async fn test_shutdown_makes_handle_unavailable() {
    let handle = spawn_manual("ABCDEN");
    handle.shutdown().await.unwrap();
    tokio::task::yield_now().await;

    let result = handle.get_info().await;
    assert!(matches!(result, Err(LobbyError::Unavailable(_))));
}
