//! Shared test helpers: an in-memory GTP engine.
//!
//! The fake engine keeps its own board with the crate's rules engine and
//! answers the command subset the bridge uses. Faults can be injected per
//! command: a rejection, a garbled or missing reply, a late reply, or a dead
//! process.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::io::{duplex, split, AsyncBufReadExt, AsyncWriteExt, BufReader};

use rust_baduk::engine::{parse_vertex, to_vertex, EngineConfig, EngineConnection, EngineError, EngineLauncher, Vertex};
use rust_baduk::rules::{process_move, BoardState, Color, KoInfo, Move, MoveOptions, Point};

/// Fixed test clock origin.
pub fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

/// Observable and scriptable state of one fake engine.
#[derive(Debug)]
pub struct FakeState {
    pub board: BoardState,
    pub ko: Option<KoInfo>,
    pub ply: u32,
    pub komi: f64,
    pub level: u8,
    /// Every command received, in order.
    pub log: Vec<String>,
    /// Replies for upcoming `reg_genmove` commands; empty means "first legal point".
    pub genmove_replies: VecDeque<String>,
    /// Reply for `final_score`.
    pub final_score: String,
    /// Reply for `final_status_list dead`.
    pub dead: String,
    /// Answer the next N commands with `?` without executing them.
    pub reject_next: usize,
    /// Answer the next N commands with an unframed line, without executing them.
    pub garble_next: usize,
    /// Never answer the next command with this name.
    pub swallow_on: Option<String>,
    /// Delay the reply to the next command whose name matches.
    pub delay: Option<(String, Duration)>,
    /// Close the streams when a command with this name arrives.
    pub die_on: Option<String>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            board: BoardState::new(19),
            ko: None,
            ply: 0,
            komi: 0.0,
            level: 0,
            log: Vec::new(),
            genmove_replies: VecDeque::new(),
            final_score: "0".to_string(),
            dead: String::new(),
            reject_next: 0,
            garble_next: 0,
            swallow_on: None,
            delay: None,
            die_on: None,
        }
    }
}

pub type SharedFake = Arc<Mutex<FakeState>>;

enum Step {
    Reply(String),
    Silent,
    Die,
}

fn color_arg(token: Option<&str>) -> Option<Color> {
    match token?.to_ascii_lowercase().as_str() {
        "b" | "black" => Some(Color::Black),
        "w" | "white" => Some(Color::White),
        _ => None,
    }
}

fn legal_points(state: &FakeState, color: Color) -> Vec<Point> {
    state
        .board
        .empty_points()
        .filter(|p| {
            let mv = Move { point: *p, player: color };
            process_move(&state.board, &mv, state.ko.as_ref(), state.ply, MoveOptions::default()).is_ok()
        })
        .collect()
}

fn handle(state: &mut FakeState, line: &str) -> Step {
    state.log.push(line.to_string());
    let mut parts = line.split_whitespace();
    let name = parts.next().unwrap_or_default().to_string();

    if state.die_on.as_deref() == Some(name.as_str()) {
        return Step::Die;
    }
    if state.swallow_on.as_deref() == Some(name.as_str()) {
        state.swallow_on = None;
        return Step::Silent;
    }
    if state.garble_next > 0 {
        state.garble_next -= 1;
        return Step::Reply("garbage output".to_string());
    }
    if state.reject_next > 0 {
        state.reject_next -= 1;
        return Step::Reply("? injected fault".to_string());
    }

    let size = state.board.size();
    let ok = |body: String| Step::Reply(format!("= {body}"));
    match name.as_str() {
        "boardsize" => match parts.next().and_then(|s| s.parse().ok()) {
            Some(n) => {
                state.board = BoardState::new(n);
                state.ko = None;
                state.ply = 0;
                ok(String::new())
            }
            None => Step::Reply("? unacceptable size".to_string()),
        },
        "clear_board" => {
            state.board = BoardState::new(size);
            state.ko = None;
            state.ply = 0;
            ok(String::new())
        }
        "komi" => {
            state.komi = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0.0);
            ok(String::new())
        }
        "level" => {
            state.level = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
            ok(String::new())
        }
        "play" => {
            let Some(color) = color_arg(parts.next()) else {
                return Step::Reply("? invalid color".to_string());
            };
            let point = match parts.next().and_then(|v| parse_vertex(v, size)) {
                Some(Vertex::Point(p)) => p,
                Some(_) => Point::PASS,
                None => return Step::Reply("? invalid coordinate".to_string()),
            };
            let mv = Move { point, player: color };
            match process_move(&state.board, &mv, state.ko.as_ref(), state.ply, MoveOptions::default()) {
                Ok(outcome) => {
                    state.board = outcome.board;
                    state.ko = outcome.ko;
                    state.ply += 1;
                    ok(String::new())
                }
                Err(_) => Step::Reply("? illegal move".to_string()),
            }
        }
        "reg_genmove" => {
            let Some(color) = color_arg(parts.next()) else {
                return Step::Reply("? invalid color".to_string());
            };
            let reply = match state.genmove_replies.pop_front() {
                Some(scripted) => scripted,
                None => legal_points(state, color)
                    .first()
                    .map_or_else(|| "pass".to_string(), |p| to_vertex(*p, size)),
            };
            ok(reply)
        }
        "all_legal" => {
            let Some(color) = color_arg(parts.next()) else {
                return Step::Reply("? invalid color".to_string());
            };
            let vertices: Vec<String> = legal_points(state, color).iter().map(|p| to_vertex(*p, size)).collect();
            ok(vertices.join(" "))
        }
        "final_score" => ok(state.final_score.clone()),
        "final_status_list" => ok(state.dead.clone()),
        "list_stones" => {
            let Some(color) = color_arg(parts.next()) else {
                return Step::Reply("? invalid color".to_string());
            };
            let vertices: Vec<String> = state.board.stones_of(color).map(|p| to_vertex(p, size)).collect();
            ok(vertices.join(" "))
        }
        "name" => ok("FakeGo".to_string()),
        "echo" => ok(parts.collect::<Vec<_>>().join(" ")),
        _ => Step::Reply("? unknown command".to_string()),
    }
}

/// Wire up a fake engine and return the client connection.
pub fn connect_fake(state: SharedFake, timeout: Duration) -> EngineConnection {
    let (client, server) = duplex(64 * 1024);
    let (client_read, client_write) = split(client);
    let (server_read, mut server_write) = split(server);

    tokio::spawn(async move {
        let mut lines = BufReader::new(server_read).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }
            let name = line.split_whitespace().next().unwrap_or_default().to_string();
            let (step, delay) = {
                let mut st = state.lock();
                let delay = match &st.delay {
                    Some((cmd, d)) if *cmd == name => Some(*d),
                    _ => None,
                };
                if delay.is_some() {
                    st.delay = None;
                }
                (handle(&mut st, &line), delay)
            };
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            match step {
                Step::Reply(text) => {
                    if server_write.write_all(format!("{text}\n\n").as_bytes()).await.is_err() {
                        break;
                    }
                }
                Step::Silent => {}
                Step::Die => break,
            }
        }
    });

    EngineConnection::new(BufReader::new(client_read), client_write, timeout)
}

/// Launcher handing out fake engines that share one inspectable state.
pub struct FakeLauncher {
    pub state: SharedFake,
    pub launches: AtomicUsize,
    pub fail: bool,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            launches: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineLauncher for FakeLauncher {
    async fn launch(&self, config: &EngineConfig) -> Result<EngineConnection, EngineError> {
        if self.fail {
            return Err(EngineError::Spawn {
                program: config.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such engine"),
            });
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(connect_fake(Arc::clone(&self.state), config.timeout()))
    }
}
