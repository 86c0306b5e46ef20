//! Engine bridge for one AI-backed session.
//!
//! The bridge mirrors the session's moves into the engine and keeps its own
//! record of what it sent: the initial setup, an optional base-board snapshot
//! and the move list. That record is what a resync replays after a protocol
//! fault, so the engine can always be rebuilt into the session's position.
//!
//! Move generation uses `reg_genmove`, which does not change engine state;
//! the chosen move comes back through [`EngineBridge::play`] like any other.

use tracing::{debug, error, info, warn};

use super::connection::EngineConnection;
use super::coords::{parse_vertex, to_vertex, Vertex};
use super::error::EngineError;
use crate::core::RandomSource;
use crate::rules::{BoardState, Color, Move, Point};

/// Parameters sent to a fresh engine before play.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineSetup {
    /// Board side length.
    pub board_size: usize,
    /// Komi credited to White.
    pub komi: f64,
    /// Engine strength.
    pub level: u8,
}

/// What the engine seat still has to achieve, for the pass override.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GoalContext {
    /// The mode's objective is not yet met.
    pub objective_open: bool,
    /// The opponent's last move was a pass.
    pub opponent_passed: bool,
}

impl GoalContext {
    fn forbids_pass(self) -> bool {
        self.objective_open && !self.opponent_passed
    }
}

/// Engine's own verdict on the final position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineScore {
    /// Leading color, `None` for jigo.
    pub winner: Option<Color>,
    /// Points ahead.
    pub margin: f64,
}

impl EngineScore {
    /// Parse `B+3.5`, `W+12` or `0`.
    pub fn parse(text: &str) -> Result<Self, EngineError> {
        let text = text.trim();
        if text == "0" {
            return Ok(Self {
                winner: None,
                margin: 0.0,
            });
        }
        let malformed = || EngineError::Protocol(format!("unreadable score '{text}'"));
        let (side, margin) = text.split_once('+').ok_or_else(malformed)?;
        let winner = match side {
            "B" | "b" => Color::Black,
            "W" | "w" => Color::White,
            _ => return Err(malformed()),
        };
        let margin = if margin.eq_ignore_ascii_case("r") || margin.eq_ignore_ascii_case("resign") {
            f64::INFINITY
        } else {
            margin.parse().map_err(|_| malformed())?
        };
        Ok(Self {
            winner: Some(winner),
            margin,
        })
    }
}

/// One session's engine.
pub struct EngineBridge {
    connection: EngineConnection,
    setup: EngineSetup,
    snapshot: Option<BoardState>,
    history: Vec<Move>,
}

impl EngineBridge {
    /// Configure a freshly launched engine.
    pub async fn start(connection: EngineConnection, setup: EngineSetup) -> Result<Self, EngineError> {
        let mut bridge = Self {
            connection,
            setup,
            snapshot: None,
            history: Vec::new(),
        };
        if let Err(e) = bridge.configure().await {
            bridge.shutdown();
            return Err(e);
        }
        info!(size = setup.board_size, komi = setup.komi, level = setup.level, "engine configured");
        Ok(bridge)
    }

    /// Current setup.
    #[must_use]
    pub fn setup(&self) -> EngineSetup {
        self.setup
    }

    /// Moves sent since the last position load.
    #[must_use]
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    /// Is the process still usable?
    #[must_use]
    pub fn is_operational(&self) -> bool {
        self.connection.is_operational()
    }

    async fn configure(&self) -> Result<(), EngineError> {
        let s = self.setup;
        self.connection.send(&format!("boardsize {}", s.board_size)).await?;
        self.connection.send("clear_board").await?;
        self.connection.send(&format!("komi {}", s.komi)).await?;
        self.connection.send(&format!("level {}", s.level)).await?;
        Ok(())
    }

    fn play_command(&self, mv: &Move) -> String {
        format!("play {} {}", mv.player, to_vertex(mv.point, self.setup.board_size))
    }

    /// Reset the engine and replay everything recorded. Stale output from
    /// the failed exchange is drained first.
    pub async fn resync(&mut self) -> Result<(), EngineError> {
        warn!(moves = self.history.len(), snapshot = self.snapshot.is_some(), "resyncing engine");
        let result = match self.connection.sync().await {
            Ok(()) => self.load_position().await,
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            error!(error = %e, "engine resync failed");
        }
        result
    }

    async fn load_position(&self) -> Result<(), EngineError> {
        self.configure().await?;
        if let Some(board) = &self.snapshot {
            for color in [Color::Black, Color::White] {
                for p in board.stones_of(color) {
                    self.connection.send(&self.play_command(&Move { point: p, player: color })).await?;
                }
            }
        }
        for mv in &self.history {
            self.connection.send(&self.play_command(mv)).await?;
        }
        Ok(())
    }

    /// Run a command; on a recoverable fault resync and try once more.
    async fn execute(&mut self, command: &str) -> Result<String, EngineError> {
        match self.connection.send(command).await {
            Err(e) if e.is_recoverable() => {
                warn!(command, error = %e, "engine command failed, resyncing");
                self.resync().await?;
                self.connection.send(command).await
            }
            other => other,
        }
    }

    /// Mirror an accepted move.
    pub async fn play(&mut self, mv: Move) -> Result<(), EngineError> {
        let command = self.play_command(&mv);
        self.history.push(mv);
        match self.connection.send(&command).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_recoverable() => {
                // The move is already recorded, so the resync replays it.
                warn!(command = %command, error = %e, "engine play failed, resyncing");
                self.resync().await
            }
            Err(e) => Err(e),
        }
    }

    /// Replace the engine position with a setup board and clear the history.
    pub async fn refresh_placement(&mut self, board: &BoardState) -> Result<(), EngineError> {
        self.snapshot = Some(board.clone());
        self.history.clear();
        match self.load_position().await {
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "placement refresh failed, resyncing");
                self.resync().await
            }
            other => other,
        }
    }

    /// Update komi, also for later resyncs.
    pub async fn set_komi(&mut self, komi: f64) -> Result<(), EngineError> {
        self.setup.komi = komi;
        self.execute(&format!("komi {komi}")).await.map(|_| ())
    }

    /// Ask for a move for `color`.
    ///
    /// Under an open objective the engine may not pass or resign unless the
    /// opponent just passed; a random legal point is played instead. If the
    /// engine keeps failing after a resync the seat passes.
    pub async fn generate_move<R>(
        &mut self,
        color: Color,
        goal: GoalContext,
        rng: &mut R,
    ) -> Result<Vertex, EngineError>
    where
        R: RandomSource + Send + ?Sized,
    {
        let reply = match self.execute(&format!("reg_genmove {color}")).await {
            Ok(reply) => reply,
            Err(e) if e.is_recoverable() => {
                warn!(%color, error = %e, "move generation failed, passing");
                return Ok(Vertex::Pass);
            }
            Err(e) => return Err(e),
        };

        let Some(vertex) = parse_vertex(&reply, self.setup.board_size) else {
            warn!(%color, reply = %reply, "unreadable generated move, passing");
            return Ok(Vertex::Pass);
        };

        if matches!(vertex, Vertex::Pass | Vertex::Resign) && goal.forbids_pass() {
            let legal = self.all_legal(color).await?;
            if legal.is_empty() {
                debug!(%color, "no legal move for override, passing");
                return Ok(Vertex::Pass);
            }
            let pick = legal[rng.next_index(legal.len())];
            debug!(%color, ?vertex, point = %pick, "engine pass overridden by objective");
            return Ok(Vertex::Point(pick));
        }
        Ok(vertex)
    }

    /// Every legal placing move for `color`.
    pub async fn all_legal(&mut self, color: Color) -> Result<Vec<Point>, EngineError> {
        let reply = self.execute(&format!("all_legal {color}")).await?;
        Ok(parse_points(&reply, self.setup.board_size))
    }

    /// Engine's score for the current position.
    pub async fn final_score(&mut self) -> Result<EngineScore, EngineError> {
        let reply = self.execute("final_score").await?;
        EngineScore::parse(&reply)
    }

    /// Stones the engine considers dead.
    pub async fn dead_stones(&mut self) -> Result<Vec<Point>, EngineError> {
        let reply = self.execute("final_status_list dead").await?;
        Ok(parse_points(&reply, self.setup.board_size))
    }

    /// Kill the process. The bridge is unusable afterwards.
    pub fn shutdown(&self) {
        info!(moves = self.history.len(), "engine shut down");
        self.connection.shutdown();
    }
}

fn parse_points(reply: &str, size: usize) -> Vec<Point> {
    reply
        .split_whitespace()
        .filter_map(|token| match parse_vertex(token, size) {
            Some(Vertex::Point(p)) => Some(p),
            _ => None,
        })
        .collect()
}
