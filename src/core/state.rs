//! The match aggregate: `GameSession`.
//!
//! A session is a fully-initialized record. Every phase-specific field exists
//! from creation on (empty until its phase uses it), so transitions produce a
//! complete new record rather than patching optional fields in place.
//!
//! ## Lifecycle
//!
//! ```text
//! BasePlacement -> KomiBidding -> KomiBidReveal -> BaseGameStartConfirmation
//!      (Base mode only; a tied auction loops KomiBidReveal -> KomiBidding once)
//! -> Playing -> Scoring -> Ended | NoContest
//! ```
//!
//! Non-base modes start directly in `Playing`.

use chrono::{DateTime, Duration, Utc};
use im::Vector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::action::{Bid, MoveRecord};
use super::config::SessionConfig;
use super::error::GameError;
use super::ids::{SessionId, UserId};
use super::player::{PlayerId, PlayerMap};
use super::rng::GameRngState;
use crate::rules::{BoardState, Color, KoInfo, Point, ScoreResult};
use crate::scoring::PlayerSummary;

/// Session phase. Exactly one is active at any time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Players secretly place base stones.
    BasePlacement,
    /// Players bid komi for a color.
    KomiBidding,
    /// Auction result is shown.
    KomiBidReveal,
    /// Players confirm the merged base board.
    BaseGameStartConfirmation,
    /// Normal alternating play.
    Playing,
    /// Waiting for the scoring orchestrator.
    Scoring,
    /// Finished with a result.
    Ended,
    /// Aborted early; initiator-only penalties.
    NoContest,
}

impl Phase {
    /// `Ended` or `NoContest`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Ended | Phase::NoContest)
    }
}

/// Who controls a seat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerKind {
    /// A persisted user.
    Human,
    /// Synthetic engine opponent; never persisted.
    Ai {
        /// Engine strength, also used as the opponent level for XP.
        level: u8,
    },
}

/// A seat's occupant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSlot {
    /// User id (synthetic for AI seats).
    pub user_id: UserId,
    /// Human or AI.
    pub kind: PlayerKind,
}

impl PlayerSlot {
    /// Human seat.
    pub fn human(user_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            kind: PlayerKind::Human,
        }
    }

    /// AI seat at the given level.
    pub fn ai(level: u8) -> Self {
        Self {
            user_id: UserId::new(format!("ai-level-{level}")),
            kind: PlayerKind::Ai { level },
        }
    }

    /// Is this seat engine-controlled?
    #[must_use]
    pub fn is_ai(&self) -> bool {
        matches!(self.kind, PlayerKind::Ai { .. })
    }
}

/// Why a match ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WinReason {
    /// Counted after two passes.
    Score,
    /// A player resigned.
    Resign,
    /// A player disconnected.
    Disconnect,
    /// A player ran out of main time.
    Timeout,
    /// Capture target reached.
    CaptureLimit,
    /// Black survived White's turn limit.
    SurvivalSuccess,
}

impl WinReason {
    /// Reasons that can be reclassified as an early abort.
    #[must_use]
    pub fn is_abandonment(self) -> bool {
        matches!(self, WinReason::Resign | WinReason::Disconnect)
    }
}

/// Terminal trigger recorded when play stops for a reason other than two
/// passes. The orchestrator turns it into `Ended` or `NoContest`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndTrigger {
    /// Winning seat, `None` for a draw.
    pub winner: Option<PlayerId>,
    /// Why.
    pub reason: WinReason,
    /// Seat whose action caused the end (resigner, disconnecter).
    pub initiator: Option<PlayerId>,
}

/// Scratch state of the base-placement phase.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasePlacement {
    /// Points each seat has claimed.
    pub stones: PlayerMap<Vec<Point>>,
    /// Seats whose stones were completed by the deadline auto-fill.
    pub auto_filled: PlayerMap<bool>,
    /// Stones left after overlap and zero-liberty elimination.
    pub survivors: PlayerMap<Vec<Point>>,
}

/// Outcome of the komi auction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum KomiResolution {
    /// Identical bids in round 1: bid again.
    Rebid,
    /// Colors and komi settled.
    Assigned {
        /// Color per seat.
        colors: PlayerMap<Color>,
        /// Komi credited to White.
        final_komi: f64,
        /// Colors were decided by coin flip.
        coin_flip: bool,
    },
}

/// Scratch state of the komi auction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KomiAuction {
    /// 1 or 2.
    pub round: u8,
    /// Bid per seat; immutable once set within a round.
    pub bids: PlayerMap<Option<Bid>>,
    /// Set once, when the reveal runs.
    pub resolution: Option<KomiResolution>,
}

impl Default for KomiAuction {
    fn default() -> Self {
        Self {
            round: 1,
            bids: PlayerMap::default(),
            resolution: None,
        }
    }
}

/// One match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    /// Session id.
    pub id: SessionId,
    /// Fixed parameters.
    pub config: SessionConfig,
    /// Seat occupants.
    pub players: PlayerMap<PlayerSlot>,
    /// Color per seat. Provisional (seat 0 Black) until a base-mode auction
    /// resolves.
    pub colors: PlayerMap<Color>,

    /// Active phase.
    pub phase: Phase,
    /// When the active phase began.
    pub phase_started_at: DateTime<Utc>,
    /// Absolute deadline of the active phase, if it has one.
    pub deadline: Option<DateTime<Utc>>,

    /// Current position.
    pub board: BoardState,
    /// Accepted moves, in order.
    pub move_history: Vector<MoveRecord>,
    /// Ko restriction from the last move.
    pub ko: Option<KoInfo>,
    /// Color to move.
    pub to_move: Color,
    /// Passes in a row.
    pub consecutive_passes: u8,
    /// Stones captured per seat.
    pub captures: PlayerMap<u32>,

    /// Base-placement scratch.
    pub base: BasePlacement,
    /// Komi auction scratch.
    pub auction: KomiAuction,
    /// Komi in force for play and scoring.
    pub final_komi: f64,
    /// Base reveal confirmations.
    pub confirmations: PlayerMap<bool>,

    /// Remaining main time per seat in milliseconds (clocked matches only).
    pub remaining_ms: PlayerMap<i64>,
    /// When the player to move started thinking.
    pub turn_started_at: Option<DateTime<Utc>>,

    /// Manner penalties accrued during the match.
    pub manner_penalties: PlayerMap<i32>,

    /// Why play stopped, when not by two passes.
    pub end_trigger: Option<EndTrigger>,
    /// Final breakdown once counted.
    pub final_scores: Option<ScoreResult>,
    /// Winning seat once decided; `None` with a reason means a draw.
    pub winner: Option<PlayerId>,
    /// Why the match ended.
    pub win_reason: Option<WinReason>,
    /// Per-user result summaries, written at the end.
    pub summary: BTreeMap<UserId, PlayerSummary>,

    /// Seeded RNG position for replayable chance.
    pub rng: GameRngState,
    /// Formation time.
    pub created_at: DateTime<Utc>,
    /// Termination time.
    pub ended_at: Option<DateTime<Utc>>,
}

impl GameSession {
    /// Build a session at formation time.
    ///
    /// Base mode starts in `BasePlacement`; every other mode starts in
    /// `Playing` with seat 0 as Black.
    pub fn new(
        id: SessionId,
        config: SessionConfig,
        players: PlayerMap<PlayerSlot>,
        rng: GameRngState,
        now: DateTime<Utc>,
    ) -> Result<Self, GameError> {
        config.validate()?;
        if players.all(PlayerSlot::is_ai) {
            return Err(GameError::InvalidAction("a session needs at least one human".into()));
        }
        if players[PlayerId::FIRST].user_id == players[PlayerId::SECOND].user_id {
            return Err(GameError::InvalidAction("both seats hold the same user".into()));
        }

        let main_ms = config.main_time_secs.map_or(0, |s| i64::from(s) * 1000);
        let mut session = Self {
            id,
            board: BoardState::new(config.board_size),
            final_komi: config.komi,
            players,
            colors: PlayerMap::from_pair(Color::Black, Color::White),
            phase: Phase::Playing,
            phase_started_at: now,
            deadline: None,
            move_history: Vector::new(),
            ko: None,
            to_move: Color::Black,
            consecutive_passes: 0,
            captures: PlayerMap::with_value(0),
            base: BasePlacement::default(),
            auction: KomiAuction::default(),
            confirmations: PlayerMap::with_value(false),
            remaining_ms: PlayerMap::with_value(main_ms),
            turn_started_at: None,
            manner_penalties: PlayerMap::with_value(0),
            end_trigger: None,
            final_scores: None,
            winner: None,
            win_reason: None,
            summary: BTreeMap::new(),
            rng,
            created_at: now,
            ended_at: None,
            config,
        };

        if session.config.mode.has_setup_phases() {
            let secs = session.config.durations.placement_secs;
            session.enter_phase(Phase::BasePlacement, now, Some(secs));
        } else {
            session.enter_phase(Phase::Playing, now, None);
            session.turn_started_at = Some(now);
        }
        Ok(session)
    }

    /// Switch phase, stamping its start and optional deadline.
    pub fn enter_phase(&mut self, phase: Phase, now: DateTime<Utc>, deadline_secs: Option<u32>) {
        self.phase = phase;
        self.phase_started_at = now;
        self.deadline = deadline_secs.map(|s| now + Duration::seconds(i64::from(s)));
    }

    /// Has the active phase's deadline passed?
    #[must_use]
    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    /// Seat held by a user.
    #[must_use]
    pub fn seat_of(&self, user: &UserId) -> Option<PlayerId> {
        self.players.find(|slot| &slot.user_id == user)
    }

    /// Seat playing a color.
    #[must_use]
    pub fn seat_of_color(&self, color: Color) -> PlayerId {
        self.colors.find(|c| *c == color).unwrap_or(PlayerId::FIRST)
    }

    /// Color of a seat.
    #[must_use]
    pub fn color_of(&self, seat: PlayerId) -> Color {
        self.colors[seat]
    }

    /// Seat to move.
    #[must_use]
    pub fn seat_to_move(&self) -> PlayerId {
        self.seat_of_color(self.to_move)
    }

    /// The engine-controlled seat, if any.
    #[must_use]
    pub fn ai_seat(&self) -> Option<PlayerId> {
        self.players.find(PlayerSlot::is_ai)
    }

    /// Does this session need an engine process?
    #[must_use]
    pub fn requires_engine(&self) -> bool {
        self.ai_seat().is_some()
    }

    /// Ply index of the next move.
    #[must_use]
    pub fn ply(&self) -> u32 {
        self.move_history.len() as u32
    }

    /// Moves played, passes included.
    #[must_use]
    pub fn move_count(&self) -> usize {
        self.move_history.len()
    }

    /// Is the match clocked?
    #[must_use]
    pub fn is_clocked(&self) -> bool {
        self.config.main_time_secs.is_some()
    }

    /// Remaining main time of a seat at `now`, counting the running turn.
    #[must_use]
    pub fn remaining_time_ms(&self, seat: PlayerId, now: DateTime<Utc>) -> i64 {
        let mut left = self.remaining_ms[seat];
        if self.phase == Phase::Playing && self.seat_to_move() == seat {
            if let Some(start) = self.turn_started_at {
                left -= (now - start).num_milliseconds().max(0);
            }
        }
        left
    }

    /// Number of moves White has made (passes included).
    #[must_use]
    pub fn moves_by(&self, color: Color) -> u32 {
        self.move_history.iter().filter(|r| r.mv.player == color).count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::GameMode;
    use crate::core::GameRng;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn players() -> PlayerMap<PlayerSlot> {
        PlayerMap::from_pair(PlayerSlot::human("alice"), PlayerSlot::human("bob"))
    }

    #[test]
    fn test_standard_session_starts_playing() {
        let s = GameSession::new(
            SessionId::new("s1"),
            SessionConfig::default(),
            players(),
            GameRng::new(1).state(),
            now(),
        )
        .unwrap();
        assert_eq!(s.phase, Phase::Playing);
        assert_eq!(s.deadline, None);
        assert_eq!(s.seat_to_move(), PlayerId::FIRST);
        assert_eq!(s.board.size(), 19);
    }

    #[test]
    fn test_base_session_starts_in_placement_with_deadline() {
        let cfg = SessionConfig::for_mode(GameMode::Base);
        let s = GameSession::new(SessionId::new("s2"), cfg, players(), GameRng::new(1).state(), now()).unwrap();
        assert_eq!(s.phase, Phase::BasePlacement);
        assert_eq!(s.deadline, Some(now() + Duration::seconds(30)));
        assert!(!s.deadline_passed(now()));
        assert!(s.deadline_passed(now() + Duration::seconds(30)));
    }

    #[test]
    fn test_rejects_two_ai_seats_and_duplicate_users() {
        let both_ai = PlayerMap::from_pair(PlayerSlot::ai(1), PlayerSlot::ai(2));
        assert!(GameSession::new(SessionId::new("x"), SessionConfig::default(), both_ai, GameRng::new(1).state(), now()).is_err());

        let dup = PlayerMap::from_pair(PlayerSlot::human("a"), PlayerSlot::human("a"));
        assert!(GameSession::new(SessionId::new("y"), SessionConfig::default(), dup, GameRng::new(1).state(), now()).is_err());
    }

    #[test]
    fn test_seat_lookup() {
        let mut p = players();
        p[PlayerId::SECOND] = PlayerSlot::ai(3);
        let s = GameSession::new(SessionId::new("s3"), SessionConfig::default(), p, GameRng::new(1).state(), now()).unwrap();
        assert_eq!(s.seat_of(&UserId::new("alice")), Some(PlayerId::FIRST));
        assert_eq!(s.seat_of(&UserId::new("carol")), None);
        assert_eq!(s.ai_seat(), Some(PlayerId::SECOND));
        assert_eq!(s.seat_of_color(Color::White), PlayerId::SECOND);
    }

    #[test]
    fn test_running_clock() {
        let cfg = SessionConfig::default().with_main_time(60);
        let s = GameSession::new(SessionId::new("s4"), cfg, players(), GameRng::new(1).state(), now()).unwrap();
        let later = now() + Duration::seconds(10);
        assert_eq!(s.remaining_time_ms(PlayerId::FIRST, later), 50_000);
        assert_eq!(s.remaining_time_ms(PlayerId::SECOND, later), 60_000);
    }
}
