//! Phase dispatcher and deadline sweep.
//!
//! Both entry points take the current record by reference and return a
//! complete updated record. A rejected action returns an error and leaves the
//! caller's record untouched.
//!
//! Transitions are driven by player actions (when both seats have done what a
//! phase needs) and by [`sweep`], which compares the phase's absolute
//! deadline with the current time. A sweep that runs late still applies the
//! transition; no phase depends on a timer firing exactly once.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::komi;
use super::placement;
use crate::core::{
    Bid, EndTrigger, GameError, GameMode, GameSession, KomiResolution, MoveRecord, Phase,
    PlayerAction, PlayerId, PlayerMap, RandomSource, WinReason,
};
use crate::rules::{process_move, Color, Move, MoveOptions, Point};

/// Most transitions one sweep tick may chain.
const MAX_SWEEP_STEPS: usize = 8;

/// Prepare a freshly created session: engine seats place their base stones
/// up front.
pub fn start<R: RandomSource + ?Sized>(mut session: GameSession, rng: &mut R) -> GameSession {
    if session.phase == Phase::BasePlacement {
        if let Some(ai) = session.ai_seat() {
            placement::place_remaining_randomly(&mut session, ai, rng);
        }
    }
    info!(session = %session.id, mode = session.config.mode.name(), phase = ?session.phase, "session started");
    session
}

/// Route an action to the active phase's handler.
pub fn apply_action<R: RandomSource + ?Sized>(
    session: &GameSession,
    seat: PlayerId,
    action: &PlayerAction,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<GameSession, GameError> {
    let mut next = session.clone();

    match (session.phase, action) {
        (phase, PlayerAction::Resign | PlayerAction::Disconnect) => {
            if phase.is_terminal() || phase == Phase::Scoring {
                return Err(wrong_phase(Phase::Playing, phase));
            }
            let reason = if matches!(action, PlayerAction::Resign) {
                WinReason::Resign
            } else {
                WinReason::Disconnect
            };
            let trigger = EndTrigger {
                winner: Some(seat.opponent()),
                reason,
                initiator: Some(seat),
            };
            enter_scoring(&mut next, now, Some(trigger));
        }

        (Phase::BasePlacement, PlayerAction::PlaceBaseStone { x, y }) => {
            placement::place_base_stone(&mut next, seat, Point::new(*x, *y))?;
            if placement::placement_complete(&next) {
                enter_komi_bidding(&mut next, now);
            }
        }
        (Phase::BasePlacement, PlayerAction::PlaceRemainingBaseStonesRandomly) => {
            placement::place_remaining_randomly(&mut next, seat, rng);
            if placement::placement_complete(&next) {
                enter_komi_bidding(&mut next, now);
            }
        }

        (Phase::KomiBidding, PlayerAction::UpdateKomiBid { bid }) => {
            komi::submit_bid(&mut next, seat, *bid)?;
            let other = seat.opponent();
            if next.players[other].is_ai() && next.auction.bids[other].is_none() {
                next.auction.bids[other] = Some(komi::ai_counter_bid(bid));
            }
            if komi::bids_complete(&next) {
                enter_reveal(&mut next, now, rng);
            }
        }

        (Phase::BaseGameStartConfirmation, PlayerAction::ConfirmBaseReveal) => {
            if next.confirmations[seat] {
                return Err(GameError::AlreadySubmitted);
            }
            next.confirmations[seat] = true;
            if next.confirmations.all(|c| *c) {
                enter_playing(&mut next, now);
            }
        }

        (Phase::Playing, PlayerAction::PlaceStone { x, y }) => {
            ensure_turn(&next, seat)?;
            if clock_expired(&next, seat, now) {
                timeout(&mut next, seat, now);
            } else {
                play_stone(&mut next, seat, Point::new(*x, *y), now)?;
            }
        }
        (Phase::Playing, PlayerAction::Pass) => {
            ensure_turn(&next, seat)?;
            if clock_expired(&next, seat, now) {
                timeout(&mut next, seat, now);
            } else {
                pass(&mut next, seat, now);
            }
        }

        (phase, other) => return Err(wrong_phase(expected_phase(other), phase)),
    }

    debug!(session = %next.id, %seat, action = action.kind(), phase = ?next.phase, "action applied");
    Ok(next)
}

/// Apply every deadline that has passed. Returns `None` if nothing changed.
pub fn sweep<R: RandomSource + ?Sized>(
    session: &GameSession,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Option<GameSession> {
    let mut current: Option<GameSession> = None;
    for _ in 0..MAX_SWEEP_STEPS {
        let base = current.as_ref().unwrap_or(session);
        match sweep_once(base, now, rng) {
            Some(next) => current = Some(next),
            None => break,
        }
    }
    current
}

fn sweep_once<R: RandomSource + ?Sized>(
    session: &GameSession,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Option<GameSession> {
    let mut next = session.clone();

    match session.phase {
        Phase::BasePlacement if session.deadline_passed(now) => {
            let target = next.config.base_stones;
            for seat in PlayerId::both() {
                if next.base.stones[seat].len() < target {
                    placement::place_remaining_randomly(&mut next, seat, rng);
                    next.base.auto_filled[seat] = true;
                    if !next.players[seat].is_ai() {
                        next.manner_penalties[seat] += next.config.auto_fill_penalty;
                    }
                }
            }
            enter_komi_bidding(&mut next, now);
        }
        Phase::KomiBidding if session.deadline_passed(now) => {
            for (_, bid) in next.auction.bids.iter_mut() {
                bid.get_or_insert_with(Bid::default);
            }
            enter_reveal(&mut next, now, rng);
        }
        Phase::KomiBidReveal if session.deadline_passed(now) => {
            // No-op unless the record was restored without its resolution.
            resolve_auction(&mut next, rng);
            apply_reveal(&mut next, now);
        }
        Phase::BaseGameStartConfirmation if session.deadline_passed(now) => {
            enter_playing(&mut next, now);
        }
        Phase::Playing if session.is_clocked() => {
            let seat = session.seat_to_move();
            if !clock_expired(session, seat, now) {
                return None;
            }
            timeout(&mut next, seat, now);
        }
        _ => return None,
    }

    debug!(session = %next.id, from = ?session.phase, to = ?next.phase, "deadline sweep transition");
    Some(next)
}

fn wrong_phase(expected: Phase, actual: Phase) -> GameError {
    GameError::WrongPhase { expected, actual }
}

fn expected_phase(action: &PlayerAction) -> Phase {
    match action {
        PlayerAction::PlaceBaseStone { .. } | PlayerAction::PlaceRemainingBaseStonesRandomly => {
            Phase::BasePlacement
        }
        PlayerAction::UpdateKomiBid { .. } => Phase::KomiBidding,
        PlayerAction::ConfirmBaseReveal => Phase::BaseGameStartConfirmation,
        PlayerAction::PlaceStone { .. }
        | PlayerAction::Pass
        | PlayerAction::Resign
        | PlayerAction::Disconnect => Phase::Playing,
    }
}

fn ensure_turn(session: &GameSession, seat: PlayerId) -> Result<(), GameError> {
    if session.seat_to_move() == seat {
        Ok(())
    } else {
        Err(GameError::NotYourTurn)
    }
}

fn clock_expired(session: &GameSession, seat: PlayerId, now: DateTime<Utc>) -> bool {
    session.is_clocked() && session.remaining_time_ms(seat, now) <= 0
}

fn enter_komi_bidding(next: &mut GameSession, now: DateTime<Utc>) {
    let size = next.config.board_size;
    next.base.survivors = placement::resolve_overlaps(&next.base.stones, size);
    next.auction.bids = PlayerMap::default();
    next.auction.resolution = None;
    let secs = next.config.durations.bidding_secs;
    next.enter_phase(Phase::KomiBidding, now, Some(secs));
    info!(session = %next.id, round = next.auction.round, "komi bidding opened");
}

fn enter_reveal<R: RandomSource + ?Sized>(next: &mut GameSession, now: DateTime<Utc>, rng: &mut R) {
    let secs = next.config.durations.reveal_secs;
    next.enter_phase(Phase::KomiBidReveal, now, Some(secs));
    resolve_auction(next, rng);
}

/// Runs at most once per round; the stored resolution is the processed flag.
fn resolve_auction<R: RandomSource + ?Sized>(next: &mut GameSession, rng: &mut R) {
    if next.auction.resolution.is_some() {
        return;
    }
    let bids = next.auction.bids.map(|_, b| b.unwrap_or_default());
    let resolution = komi::resolve(&bids, next.config.komi, next.auction.round, rng);
    info!(session = %next.id, round = next.auction.round, ?resolution, "komi auction resolved");
    next.auction.resolution = Some(resolution);
}

fn apply_reveal(next: &mut GameSession, now: DateTime<Utc>) {
    match next.auction.resolution.clone() {
        Some(KomiResolution::Rebid) => {
            next.auction.round += 1;
            let secs = next.config.durations.bidding_secs;
            next.auction.bids = PlayerMap::default();
            next.auction.resolution = None;
            next.enter_phase(Phase::KomiBidding, now, Some(secs));
            info!(session = %next.id, round = next.auction.round, "komi tie, bidding again");
        }
        Some(KomiResolution::Assigned { colors, final_komi, .. }) => {
            next.colors = colors;
            next.final_komi = final_komi;
            next.board = placement::lay_out(&next.base.survivors, &next.colors, next.config.board_size);
            next.confirmations = next.players.map(|_, slot| slot.is_ai());
            let secs = next.config.durations.confirmation_secs;
            next.enter_phase(Phase::BaseGameStartConfirmation, now, Some(secs));
            if next.confirmations.all(|c| *c) {
                enter_playing(next, now);
            }
        }
        None => {}
    }
}

fn enter_playing(next: &mut GameSession, now: DateTime<Utc>) {
    next.enter_phase(Phase::Playing, now, None);
    next.to_move = Color::Black;
    next.ko = None;
    next.consecutive_passes = 0;
    next.turn_started_at = Some(now);
    info!(session = %next.id, komi = next.final_komi, "play started");
}

/// Stop play. The running turn's time is charged so clocks are final.
pub(crate) fn enter_scoring(next: &mut GameSession, now: DateTime<Utc>, trigger: Option<EndTrigger>) {
    if next.phase == Phase::Playing && next.is_clocked() {
        let seat = next.seat_to_move();
        next.remaining_ms[seat] = next.remaining_time_ms(seat, now).max(0);
    }
    next.turn_started_at = None;
    next.end_trigger = trigger;
    next.enter_phase(Phase::Scoring, now, None);
    info!(session = %next.id, ?trigger, "scoring");
}

fn timeout(next: &mut GameSession, seat: PlayerId, now: DateTime<Utc>) {
    let trigger = EndTrigger {
        winner: Some(seat.opponent()),
        reason: WinReason::Timeout,
        initiator: Some(seat),
    };
    enter_scoring(next, now, Some(trigger));
}

/// Deduct the finished turn from the mover's clock and hand the turn over.
fn finish_turn(next: &mut GameSession, seat: PlayerId, now: DateTime<Utc>) {
    if next.is_clocked() {
        next.remaining_ms[seat] = next.remaining_time_ms(seat, now);
    }
    next.to_move = next.to_move.opponent();
    next.turn_started_at = Some(now);
}

fn play_stone(next: &mut GameSession, seat: PlayerId, p: Point, now: DateTime<Utc>) -> Result<(), GameError> {
    let color = next.color_of(seat);
    let mv = Move { point: p, player: color };
    if mv.is_pass() {
        pass(next, seat, now);
        return Ok(());
    }
    let ply = next.ply();
    let outcome = process_move(&next.board, &mv, next.ko.as_ref(), ply, MoveOptions::default())?;

    let captured = outcome.captured.len() as u32;
    next.board = outcome.board;
    next.ko = outcome.ko;
    next.captures[seat] += captured;
    next.consecutive_passes = 0;
    next.move_history.push_back(MoveRecord::new(seat, mv, ply, captured));
    finish_turn(next, seat, now);

    if let Some(trigger) = objective_reached(next) {
        enter_scoring(next, now, Some(trigger));
    }
    Ok(())
}

fn pass(next: &mut GameSession, seat: PlayerId, now: DateTime<Utc>) {
    let color = next.color_of(seat);
    let ply = next.ply();
    next.move_history.push_back(MoveRecord::new(seat, Move::pass(color), ply, 0));
    next.ko = None;
    next.consecutive_passes += 1;
    finish_turn(next, seat, now);

    if let Some(trigger) = objective_reached(next) {
        enter_scoring(next, now, Some(trigger));
    } else if next.consecutive_passes >= 2 {
        enter_scoring(next, now, None);
    }
}

/// Immediate win conditions of the objective modes.
fn objective_reached(session: &GameSession) -> Option<EndTrigger> {
    match session.config.mode {
        GameMode::Capture { target } => PlayerId::both()
            .find(|seat| session.captures[*seat] >= target)
            .map(|seat| EndTrigger {
                winner: Some(seat),
                reason: WinReason::CaptureLimit,
                initiator: None,
            }),
        GameMode::Survival {
            white_turn_limit,
            capture_target,
        } => {
            let white = session.seat_of_color(Color::White);
            if session.captures[white] >= capture_target {
                Some(EndTrigger {
                    winner: Some(white),
                    reason: WinReason::CaptureLimit,
                    initiator: None,
                })
            } else if session.moves_by(Color::White) >= white_turn_limit {
                Some(EndTrigger {
                    winner: Some(white.opponent()),
                    reason: WinReason::SurvivalSuccess,
                    initiator: None,
                })
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Is the engine seat's objective still open? Used to forbid engine passes.
#[must_use]
pub fn objective_open(session: &GameSession) -> bool {
    session.config.mode.is_objective_mode() && !session.phase.is_terminal() && objective_reached(session).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GameRng, PlayerSlot, SessionConfig, SessionId};
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn session(cfg: SessionConfig) -> GameSession {
        let players = PlayerMap::from_pair(PlayerSlot::human("a"), PlayerSlot::human("b"));
        GameSession::new(SessionId::new("m"), cfg, players, GameRng::new(1).state(), t0()).unwrap()
    }

    #[test]
    fn test_wrong_phase_rejected_without_mutation() {
        let s = session(SessionConfig::default());
        let bid = PlayerAction::UpdateKomiBid { bid: Bid::default() };
        let err = apply_action(&s, PlayerId::FIRST, &bid, t0(), &mut GameRng::new(1)).unwrap_err();
        assert!(matches!(
            err,
            GameError::WrongPhase {
                expected: Phase::KomiBidding,
                actual: Phase::Playing
            }
        ));
    }

    #[test]
    fn test_turn_order_enforced() {
        let s = session(SessionConfig::default());
        let mv = PlayerAction::PlaceStone { x: 3, y: 3 };
        let err = apply_action(&s, PlayerId::SECOND, &mv, t0(), &mut GameRng::new(1)).unwrap_err();
        assert!(matches!(err, GameError::NotYourTurn));

        let next = apply_action(&s, PlayerId::FIRST, &mv, t0(), &mut GameRng::new(1)).unwrap();
        assert_eq!(next.to_move, Color::White);
        assert_eq!(next.move_count(), 1);
    }

    #[test]
    fn test_two_passes_enter_scoring() {
        let s = session(SessionConfig::default());
        let mut rng = GameRng::new(1);
        let s = apply_action(&s, PlayerId::FIRST, &PlayerAction::Pass, t0(), &mut rng).unwrap();
        assert_eq!(s.phase, Phase::Playing);
        let s = apply_action(&s, PlayerId::SECOND, &PlayerAction::Pass, t0(), &mut rng).unwrap();
        assert_eq!(s.phase, Phase::Scoring);
        assert_eq!(s.end_trigger, None);
    }

    #[test]
    fn test_resign_records_trigger() {
        let s = session(SessionConfig::default());
        let s = apply_action(&s, PlayerId::SECOND, &PlayerAction::Resign, t0(), &mut GameRng::new(1)).unwrap();
        assert_eq!(s.phase, Phase::Scoring);
        assert_eq!(
            s.end_trigger,
            Some(EndTrigger {
                winner: Some(PlayerId::FIRST),
                reason: WinReason::Resign,
                initiator: Some(PlayerId::SECOND)
            })
        );
        let again = apply_action(&s, PlayerId::FIRST, &PlayerAction::Resign, t0(), &mut GameRng::new(1));
        assert!(again.is_err());
    }

    #[test]
    fn test_clock_timeout_by_sweep() {
        let s = session(SessionConfig::default().with_main_time(30));
        let mut rng = GameRng::new(1);
        assert!(sweep(&s, t0() + Duration::seconds(29), &mut rng).is_none());

        let s = sweep(&s, t0() + Duration::seconds(31), &mut rng).unwrap();
        assert_eq!(s.phase, Phase::Scoring);
        let trigger = s.end_trigger.unwrap();
        assert_eq!(trigger.reason, WinReason::Timeout);
        assert_eq!(trigger.winner, Some(PlayerId::SECOND));
        assert_eq!(s.remaining_ms[PlayerId::FIRST], 0);
    }

    #[test]
    fn test_capture_mode_ends_on_target() {
        let cfg = SessionConfig::for_mode(GameMode::Capture { target: 1 });
        let mut s = session(cfg);
        let mut rng = GameRng::new(1);
        // Black surrounds a white stone at (0,0): B(1,0) W(0,0) B(0,1)
        for (seat, x, y) in [(PlayerId::FIRST, 1, 0), (PlayerId::SECOND, 0, 0), (PlayerId::FIRST, 0, 1)] {
            s = apply_action(&s, seat, &PlayerAction::PlaceStone { x, y }, t0(), &mut rng).unwrap();
        }
        assert_eq!(s.phase, Phase::Scoring);
        assert_eq!(s.end_trigger.unwrap().reason, WinReason::CaptureLimit);
        assert_eq!(s.end_trigger.unwrap().winner, Some(PlayerId::FIRST));
    }

    #[test]
    fn test_reveal_sweep_resolves_missing_resolution() {
        let mut s = session(SessionConfig::for_mode(GameMode::Base).with_board_size(9));
        s.auction.bids[PlayerId::FIRST] = Some(Bid { color: Color::Black, komi: 2 });
        s.auction.bids[PlayerId::SECOND] = Some(Bid { color: Color::White, komi: 0 });
        s.enter_phase(Phase::KomiBidReveal, t0(), Some(5));
        assert!(s.auction.resolution.is_none());

        let mut rng = GameRng::new(1);
        assert!(sweep(&s, t0() + Duration::seconds(1), &mut rng).is_none());
        let next = sweep(&s, t0() + Duration::seconds(5), &mut rng).unwrap();
        assert_eq!(next.phase, Phase::BaseGameStartConfirmation);
        assert_eq!(next.color_of(PlayerId::FIRST), Color::Black);
        assert_eq!(next.final_komi, s.config.komi);
    }

    #[test]
    fn test_survival_turn_limit() {
        let cfg = SessionConfig::for_mode(GameMode::Survival {
            white_turn_limit: 1,
            capture_target: 5,
        });
        let mut s = session(cfg);
        let mut rng = GameRng::new(1);
        assert!(objective_open(&s));
        s = apply_action(&s, PlayerId::FIRST, &PlayerAction::PlaceStone { x: 4, y: 4 }, t0(), &mut rng).unwrap();
        s = apply_action(&s, PlayerId::SECOND, &PlayerAction::Pass, t0(), &mut rng).unwrap();
        assert_eq!(s.phase, Phase::Scoring);
        assert_eq!(s.end_trigger.unwrap().reason, WinReason::SurvivalSuccess);
        assert_eq!(s.end_trigger.unwrap().winner, Some(PlayerId::FIRST));
    }
}
