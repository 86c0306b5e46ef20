//! Engine bridge tests against an in-memory GTP engine.
//!
//! Covers response attribution under concurrency, timeouts, resync after a
//! protocol fault, the objective pass override and process death.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{connect_fake, FakeState, SharedFake};
use parking_lot::Mutex;

use rust_baduk::core::GameRng;
use rust_baduk::engine::{EngineBridge, EngineError, EngineSetup, GoalContext, Vertex};
use rust_baduk::rules::{replay, BoardState, Color, Move, Point};

fn fake() -> SharedFake {
    Arc::new(Mutex::new(FakeState::default()))
}

fn setup() -> EngineSetup {
    EngineSetup {
        board_size: 9,
        komi: 6.5,
        level: 3,
    }
}

async fn bridge_on(state: &SharedFake) -> EngineBridge {
    let connection = connect_fake(Arc::clone(state), Duration::from_millis(500));
    EngineBridge::start(connection, setup()).await.expect("fake engine configures")
}

/// Concurrent callers each get the response to their own command.
#[tokio::test]
async fn test_responses_follow_command_order() {
    let state = fake();
    let connection = Arc::new(connect_fake(Arc::clone(&state), Duration::from_secs(2)));

    let mut tasks = Vec::new();
    for i in 0..16 {
        let connection = Arc::clone(&connection);
        tasks.push(tokio::spawn(async move {
            let reply = connection.send(&format!("echo {i}")).await;
            (i, reply)
        }));
    }
    for task in tasks {
        let (i, reply) = task.await.unwrap();
        assert_eq!(reply.unwrap(), i.to_string());
    }
    assert_eq!(connection.pending_len(), 0);
}

/// A `?` response is a rejection carrying the command and message.
#[tokio::test]
async fn test_rejection_is_reported() {
    let state = fake();
    let connection = connect_fake(Arc::clone(&state), Duration::from_secs(2));
    match connection.send("frobnicate").await {
        Err(EngineError::Rejected { command, message }) => {
            assert_eq!(command, "frobnicate");
            assert_eq!(message, "unknown command");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert!(connection.is_operational());
}

/// A timed-out command does not block the queue, and its late answer is
/// not handed to the next caller.
#[tokio::test]
async fn test_timeout_does_not_deadlock() {
    let state = fake();
    state.lock().delay = Some(("name".to_string(), Duration::from_millis(300)));
    let connection = connect_fake(Arc::clone(&state), Duration::from_millis(200));

    let err = connection.send("name").await.unwrap_err();
    assert!(matches!(err, EngineError::Timeout { .. }), "got {err:?}");
    assert!(err.is_recoverable());

    let reply = connection.send("echo after").await.unwrap();
    assert_eq!(reply, "after");
    assert!(connection.is_operational());
}

/// After a rejected play the bridge rebuilds the engine position, which
/// then matches a clean replay of the same moves.
#[tokio::test]
async fn test_resync_restores_position() {
    let state = fake();
    let mut bridge = bridge_on(&state).await;

    let moves = [
        Move::place(2, 2, Color::Black),
        Move::place(6, 6, Color::White),
        Move::place(2, 6, Color::Black),
        Move::pass(Color::White),
    ];
    for mv in &moves[..3] {
        bridge.play(*mv).await.unwrap();
    }

    state.lock().reject_next = 1;
    bridge.play(moves[3]).await.unwrap();

    let (expected, _) = replay(&BoardState::new(9), moves).unwrap();
    let fake = state.lock();
    assert_eq!(fake.board, expected);
    assert_eq!(fake.komi, 6.5);
    assert_eq!(fake.level, 3);
    assert_eq!(fake.log.iter().filter(|c| *c == "clear_board").count(), 2);
    drop(fake);
    assert_eq!(bridge.history().len(), 4);
}

/// An unframed reply fails only its own command; the queue keeps working.
#[tokio::test]
async fn test_malformed_reply_fails_one_command() {
    let state = fake();
    let connection = connect_fake(Arc::clone(&state), Duration::from_millis(500));
    state.lock().garble_next = 1;

    let err = connection.send("name").await.unwrap_err();
    assert!(matches!(err, EngineError::Protocol(_)), "got {err:?}");
    assert!(err.is_recoverable());
    for i in 0..4 {
        assert_eq!(connection.send(&format!("echo {i}")).await.unwrap(), i.to_string());
    }
    connection.sync().await.unwrap();
    assert_eq!(connection.send("name").await.unwrap(), "FakeGo");
    assert!(connection.is_operational());
}

/// A garbled reply to a play triggers a resync that rebuilds the position.
#[tokio::test]
async fn test_malformed_reply_resyncs_bridge() {
    let state = fake();
    let mut bridge = bridge_on(&state).await;
    let moves = [Move::place(3, 3, Color::Black), Move::place(5, 5, Color::White)];

    bridge.play(moves[0]).await.unwrap();
    state.lock().garble_next = 1;
    bridge.play(moves[1]).await.unwrap();

    let (expected, _) = replay(&BoardState::new(9), moves).unwrap();
    assert_eq!(state.lock().board, expected);

    let mut rng = GameRng::new(3);
    let vertex = bridge
        .generate_move(Color::Black, GoalContext::default(), &mut rng)
        .await
        .unwrap();
    assert!(matches!(vertex, Vertex::Point(_)), "got {vertex:?}");
}

/// A reply that never comes leaves a late-response debt; resync clears it so
/// later commands are attributed correctly.
#[tokio::test]
async fn test_missing_reply_does_not_poison_queue() {
    let state = fake();
    let connection = connect_fake(Arc::clone(&state), Duration::from_millis(200));
    let mut bridge = EngineBridge::start(connection, setup()).await.unwrap();
    bridge.play(Move::place(4, 4, Color::Black)).await.unwrap();

    state.lock().swallow_on = Some("reg_genmove".to_string());
    let mut rng = GameRng::new(9);
    let vertex = bridge
        .generate_move(Color::White, GoalContext::default(), &mut rng)
        .await
        .unwrap();
    let Vertex::Point(p) = vertex else {
        panic!("expected a point, got {vertex:?}");
    };
    bridge.play(Move { point: p, player: Color::White }).await.unwrap();
    bridge.play(Move::place(2, 2, Color::Black)).await.unwrap();

    let (expected, _) = replay(&BoardState::new(9), bridge.history().iter().copied()).unwrap();
    assert_eq!(state.lock().board, expected);
    assert_eq!(state.lock().log.iter().filter(|c| *c == "clear_board").count(), 2);
}

/// Resync also restores a setup snapshot laid down before play.
#[tokio::test]
async fn test_resync_replays_snapshot_then_moves() {
    let state = fake();
    let mut bridge = bridge_on(&state).await;

    let mut base = BoardState::new(9);
    base.set(Point::new(0, 0), Color::Black.stone());
    base.set(Point::new(8, 8), Color::White.stone());
    bridge.refresh_placement(&base).await.unwrap();
    bridge.set_komi(3.5).await.unwrap();
    bridge.play(Move::place(4, 4, Color::Black)).await.unwrap();

    let before = state.lock().board.clone();
    bridge.resync().await.unwrap();
    let fake = state.lock();
    assert_eq!(fake.board, before);
    assert_eq!(fake.board.get(Point::new(0, 0)), Color::Black.stone());
    assert_eq!(fake.board.get(Point::new(4, 4)), Color::Black.stone());
    assert_eq!(fake.komi, 3.5);
}

/// Under an open objective an engine pass becomes a legal placement,
/// unless the opponent just passed.
#[tokio::test]
async fn test_goal_overrides_engine_pass() {
    let state = fake();
    let mut bridge = bridge_on(&state).await;
    let mut rng = GameRng::new(11);

    state.lock().genmove_replies.push_back("pass".to_string());
    let goal = GoalContext {
        objective_open: true,
        opponent_passed: false,
    };
    match bridge.generate_move(Color::White, goal, &mut rng).await.unwrap() {
        Vertex::Point(p) => assert!(state.lock().board.is_empty_at(p)),
        other => panic!("expected a point, got {other:?}"),
    }

    state.lock().genmove_replies.push_back("resign".to_string());
    let goal = GoalContext {
        objective_open: true,
        opponent_passed: true,
    };
    assert_eq!(
        bridge.generate_move(Color::White, goal, &mut rng).await.unwrap(),
        Vertex::Resign
    );

    state.lock().genmove_replies.push_back("pass".to_string());
    assert_eq!(
        bridge.generate_move(Color::White, GoalContext::default(), &mut rng).await.unwrap(),
        Vertex::Pass
    );
}

/// A garbled generated move degrades to a pass.
#[tokio::test]
async fn test_unreadable_move_passes() {
    let state = fake();
    let mut bridge = bridge_on(&state).await;
    state.lock().genmove_replies.push_back("Z99".to_string());
    let mut rng = GameRng::new(1);
    assert_eq!(
        bridge.generate_move(Color::Black, GoalContext::default(), &mut rng).await.unwrap(),
        Vertex::Pass
    );
}

/// Engine death fails the in-flight command and every later one.
#[tokio::test]
async fn test_process_death_is_unavailable() {
    let state = fake();
    let mut bridge = bridge_on(&state).await;
    state.lock().die_on = Some("reg_genmove".to_string());

    let mut rng = GameRng::new(5);
    let err = bridge
        .generate_move(Color::Black, GoalContext::default(), &mut rng)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ProcessUnavailable), "got {err:?}");
    assert!(!err.is_recoverable());
    assert!(!bridge.is_operational());

    let err = bridge.play(Move::place(1, 1, Color::Black)).await.unwrap_err();
    assert!(matches!(err, EngineError::ProcessUnavailable));
}

/// Scoring queries parse the engine's dead list and verdict.
#[tokio::test]
async fn test_scoring_queries() {
    let state = fake();
    let mut bridge = bridge_on(&state).await;
    {
        let mut fake = state.lock();
        fake.final_score = "W+7.5".to_string();
        fake.dead = "A9 J1".to_string();
    }
    let score = bridge.final_score().await.unwrap();
    assert_eq!(score.winner, Some(Color::White));
    assert_eq!(score.margin, 7.5);
    assert_eq!(
        bridge.dead_stones().await.unwrap(),
        vec![Point::new(0, 0), Point::new(8, 8)]
    );
}
