//! Session-end orchestration.
//!
//! Called once a session is in `Scoring`. Counts the position, decides the
//! result, and applies rating, XP, manner, counters and rewards to every
//! human seat's persisted record.
//!
//! Each player is processed on its own: a store failure for one player is
//! logged and leaves that player without a summary, but the other player and
//! the session itself still finish.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::config::ScoringConfig;
use super::progression::{apply_xp, xp_gain};
use super::rating::{rating_delta, Outcome};
use super::rewards::{commit, roll_rewards, RewardOutcome};
use super::summary::{PlayerStats, PlayerSummary};
use crate::core::{
    EndTrigger, GameMode, GameSession, Phase, PlayerId, PlayerKind, PlayerMap, RandomSource,
    StoreError, WinReason,
};
use crate::engine::EngineScore;
use crate::rules::{analyze, estimate_dead_stones, AnalysisInput, Color, Point, ScoreResult};
use crate::store::{self, KvStore, UserRecord};

/// Area score of the current position. Speed games convert remaining clock
/// time into bonus points.
#[must_use]
pub fn compute_score(session: &GameSession, dead_stones: &[Point], now: DateTime<Utc>) -> ScoreResult {
    let captures_of = |color: Color| session.captures[session.seat_of_color(color)];
    let input = AnalysisInput {
        black_captures: captures_of(Color::Black),
        white_captures: captures_of(Color::White),
        komi: session.final_komi,
        dead_stones,
    };
    let mut scores = analyze(&session.board, &input);

    if session.config.mode == GameMode::Speed && session.is_clocked() {
        let divisor = f64::from(session.config.time_bonus_divisor.max(1));
        for color in [Color::Black, Color::White] {
            let seat = session.seat_of_color(color);
            let secs = (session.remaining_time_ms(seat, now).max(0) / 1000) as f64;
            scores.add_time_bonus(color, secs / divisor);
        }
    }
    scores
}

/// Result of a counted game, or the recorded trigger if play stopped early.
#[must_use]
pub fn decide(session: &GameSession, scores: &ScoreResult, engine: Option<&EngineScore>) -> EndTrigger {
    if let Some(trigger) = session.end_trigger {
        return trigger;
    }

    let leader = scores.leader();
    if let Some(engine) = engine {
        if engine.winner != leader {
            warn!(
                session = %session.id,
                local = ?leader,
                engine = ?engine.winner,
                margin = engine.margin,
                "engine score disagrees with local count"
            );
        }
    }

    EndTrigger {
        winner: leader.map(|c| session.seat_of_color(c)),
        reason: WinReason::Score,
        initiator: None,
    }
}

/// Is `seat` behind on the board right now?
#[must_use]
pub fn is_losing(session: &GameSession, seat: PlayerId) -> bool {
    let dead = estimate_dead_stones(&session.board);
    let scores = compute_score(session, &dead, session.phase_started_at);
    let own = scores.for_color(session.color_of(seat)).total;
    let other = scores.for_color(session.color_of(seat).opponent()).total;
    own < other
}

/// Count and end a session in `Scoring`. Returns false if there was nothing
/// to do.
///
/// `dead_stones` is the engine's judgement; without one the dead stones are
/// estimated from the position.
pub fn finish<R: RandomSource + ?Sized>(
    session: &mut GameSession,
    dead_stones: Option<&[Point]>,
    engine: Option<&EngineScore>,
    store: &dyn KvStore,
    cfg: &ScoringConfig,
    now: DateTime<Utc>,
    rng: &mut R,
) -> bool {
    if session.phase != Phase::Scoring {
        return false;
    }
    let estimated;
    let dead = match dead_stones {
        Some(dead) => dead,
        None => {
            estimated = estimate_dead_stones(&session.board);
            &estimated
        }
    };
    let scores = compute_score(session, dead, now);
    session.final_scores = Some(scores);
    let trigger = decide(session, &scores, engine);
    end_session(session, trigger, store, cfg, now, rng)
}

/// Move a session to `Ended` or `NoContest` and settle both players.
///
/// Idempotent: a session already in a terminal phase is left untouched.
pub fn end_session<R: RandomSource + ?Sized>(
    session: &mut GameSession,
    trigger: EndTrigger,
    store: &dyn KvStore,
    cfg: &ScoringConfig,
    now: DateTime<Utc>,
    rng: &mut R,
) -> bool {
    if session.phase.is_terminal() {
        return false;
    }

    let view: &GameSession = session;
    let no_contest = trigger.reason.is_abandonment() && view.move_count() < view.config.min_moves_for_result;
    let losing_at_end = view.players.map(|seat, _| {
        trigger.reason == WinReason::Disconnect && trigger.initiator == Some(seat) && is_losing(view, seat)
    });

    // Loaded up front so both players are rated against pre-match values.
    let records: PlayerMap<Option<Result<UserRecord, StoreError>>> = view
        .players
        .map(|_, slot| (!slot.is_ai()).then(|| store::load_user(store, &slot.user_id)));

    for seat in PlayerId::both() {
        let Some(loaded) = &records[seat] else {
            // Engine seats are never persisted, but a no-contest still
            // reports both sides.
            if no_contest {
                let synthetic = UserRecord::new(session.players[seat].user_id.clone());
                let summary = PlayerSummary::unchanged(&synthetic, seat, None, true);
                session.summary.insert(summary.user_id.clone(), summary);
            }
            continue;
        };
        let result = loaded.as_ref().map_err(StoreError::clone).and_then(|record| {
            let settle = Settlement {
                session: &*session,
                seat,
                trigger: &trigger,
                no_contest,
                losing_at_end: losing_at_end[seat],
                opponent: records[seat.opponent()].as_ref().and_then(|r| r.as_ref().ok()),
                cfg,
            };
            let (updated, summary) = settle.apply(record.clone(), rng);
            store::save_user(store, &updated)?;
            Ok(summary)
        });

        match result {
            Ok(summary) => {
                session.summary.insert(summary.user_id.clone(), summary);
            }
            Err(e) => {
                error!(session = %session.id, %seat, error = %e, code = e.code(), "player summary failed");
            }
        }
    }

    session.winner = if no_contest { None } else { trigger.winner };
    session.win_reason = Some(trigger.reason);
    session.end_trigger = Some(trigger);
    session.turn_started_at = None;
    session.ended_at = Some(now);
    let phase = if no_contest { Phase::NoContest } else { Phase::Ended };
    session.enter_phase(phase, now, None);

    info!(
        session = %session.id,
        phase = ?phase,
        winner = ?session.winner,
        reason = ?trigger.reason,
        summaries = session.summary.len(),
        "session ended"
    );
    true
}

/// Inputs for settling one seat.
struct Settlement<'a> {
    session: &'a GameSession,
    seat: PlayerId,
    trigger: &'a EndTrigger,
    no_contest: bool,
    losing_at_end: bool,
    /// Opponent's record as it was before this session ended.
    opponent: Option<&'a UserRecord>,
    cfg: &'a ScoringConfig,
}

impl Settlement<'_> {
    fn apply<R: RandomSource + ?Sized>(&self, mut record: UserRecord, rng: &mut R) -> (UserRecord, PlayerSummary) {
        if self.no_contest {
            return self.apply_no_contest(record);
        }

        let before = PlayerStats::from(&record);
        let outcome = match self.trigger.winner {
            None => Outcome::Draw,
            Some(w) if w == self.seat => Outcome::Win,
            Some(_) => Outcome::Loss,
        };
        let mode = self.session.config.mode;
        let opponent_slot = &self.session.players[self.seat.opponent()];

        // XP and level
        let opponent_level = match opponent_slot.kind {
            PlayerKind::Ai { level } => u32::from(level),
            PlayerKind::Human => self.opponent.map_or(record.level, |o| o.level),
        };
        let gained = xp_gain(self.cfg, mode, outcome, record.level, opponent_level, record.xp_bonus_percent);
        let progress = apply_xp(record.level, record.xp, gained, self.cfg.xp_per_level);
        record.level = progress.level;
        record.xp = progress.xp;

        // Rating: ranked human-vs-human only.
        let mut rating_change = 0;
        if self.session.config.ranked && !opponent_slot.is_ai() {
            match self.opponent {
                Some(opponent) => {
                    rating_change = rating_delta(record.rating, opponent.rating, outcome, self.cfg.rating_k);
                    record.rating += rating_change;
                }
                None => warn!(session = %self.session.id, seat = %self.seat, "opponent record unavailable, rating unchanged"),
            }
        }

        // Manner
        let mut penalty = self.session.manner_penalties[self.seat];
        if self.losing_at_end {
            penalty += self.cfg.disconnect_manner_penalty;
        }
        let manner_change = apply_manner(&mut record, penalty);

        match outcome {
            Outcome::Win => record.wins += 1,
            Outcome::Loss => record.losses += 1,
            Outcome::Draw => record.draws += 1,
        }

        let roll = roll_rewards(self.cfg, mode, outcome, record.loot_bonus_percent, rng);
        let rewards = commit(&mut record.gold, &mut record.inventory, roll);
        if let RewardOutcome::Withheld { reason, .. } = &rewards {
            warn!(session = %self.session.id, user = %record.user_id, ?reason, "rewards withheld");
        }

        let summary = PlayerSummary {
            user_id: record.user_id.clone(),
            seat: self.seat,
            outcome: Some(outcome),
            no_contest: false,
            before,
            after: PlayerStats::from(&record),
            xp_gained: gained,
            levels_gained: progress.levels_gained,
            rating_delta: rating_change,
            manner_delta: manner_change,
            rewards,
        };
        (record, summary)
    }

    /// Only the initiator pays; nobody's counters move.
    fn apply_no_contest(&self, mut record: UserRecord) -> (UserRecord, PlayerSummary) {
        if self.trigger.initiator != Some(self.seat) {
            let summary = PlayerSummary::unchanged(&record, self.seat, None, true);
            return (record, summary);
        }

        let before = PlayerStats::from(&record);
        let rating_change = if self.session.config.ranked {
            record.rating -= self.cfg.no_contest_rating_penalty;
            -self.cfg.no_contest_rating_penalty
        } else {
            0
        };
        let manner_change = apply_manner(&mut record, self.cfg.no_contest_manner_penalty);

        let mut summary = PlayerSummary::unchanged(&record, self.seat, None, true);
        summary.before = before;
        summary.rating_delta = rating_change;
        summary.manner_delta = manner_change;
        (record, summary)
    }
}

/// Subtract a penalty with a zero floor; returns the applied change.
fn apply_manner(record: &mut UserRecord, penalty: i32) -> i32 {
    let before = record.manner;
    record.manner = (record.manner - penalty).max(0);
    record.manner - before
}
