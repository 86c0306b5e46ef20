//! The match service.
//!
//! Owns the session registry, one engine bridge per AI-backed session, and
//! the persistence store. Every mutation of a session happens under that
//! session's lock: player actions, deadline sweeps, engine turns and the
//! end-of-match orchestration. Different sessions run independently.
//!
//! Engine failures never undo an accepted action. A recoverable fault is
//! handled inside the bridge; an unavailable process is logged, leaves the
//! engine seat idle, and is reported by [`MatchService::engine_available`]
//! until [`MatchService::recreate_engine`] replaces it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::config::{ArenaConfig, NewSession};
use crate::core::{
    GameError, GameMode, GameRng, GameSession, Phase, PlayerAction, PlayerId, PlayerKind,
    SessionId, UserId,
};
use crate::engine::{
    EngineBridge, EngineError, EngineLauncher, EngineScore, EngineSetup, GoalContext, Vertex,
};
use crate::rules::Point;
use crate::scoring;
use crate::session::{self, SessionRegistry};
use crate::store::{self, KvStore};

type SharedBridge = Arc<AsyncMutex<EngineBridge>>;

/// Async front door for running matches.
pub struct MatchService {
    config: ArenaConfig,
    registry: SessionRegistry,
    engines: Mutex<HashMap<SessionId, SharedBridge>>,
    launcher: Arc<dyn EngineLauncher>,
    store: Arc<dyn KvStore>,
}

impl MatchService {
    pub fn new(config: ArenaConfig, launcher: Arc<dyn EngineLauncher>, store: Arc<dyn KvStore>) -> Self {
        Self {
            config,
            registry: SessionRegistry::new(),
            engines: Mutex::new(HashMap::new()),
            launcher,
            store,
        }
    }

    /// Service configuration.
    #[must_use]
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Live session registry.
    #[must_use]
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Form a match. Starts and configures an engine when a seat is AI.
    pub async fn create_session(&self, request: NewSession, now: DateTime<Utc>) -> Result<GameSession, GameError> {
        let id = request.id.unwrap_or_else(SessionId::generate);
        let seed = request.seed.unwrap_or_else(|| id.seed());
        let mut rng = GameRng::new(seed);

        let session = GameSession::new(id.clone(), request.config, request.players, rng.state(), now)?;
        let mut session = session::start(session, &mut rng);
        session.rng = rng.state();

        if let Some(ai) = session.ai_seat() {
            let bridge = self.launch_engine(&session, ai).await?;
            self.engines.lock().insert(id.clone(), Arc::new(AsyncMutex::new(bridge)));
        }

        let handle = match self.registry.insert(session) {
            Ok(handle) => handle,
            Err(e) => {
                self.teardown_engine(&id);
                return Err(e);
            }
        };

        let mut guard = handle.lock().await;
        info!(session = %id, mode = guard.config.mode.name(), ai = guard.requires_engine(), "session created");
        let unchanged = guard.clone();
        self.after_transition(&unchanged, &mut guard, now).await;
        Ok(guard.clone())
    }

    /// Apply a player's action and everything it sets off.
    pub async fn submit(
        &self,
        id: &SessionId,
        user: &UserId,
        action: PlayerAction,
        now: DateTime<Utc>,
    ) -> Result<GameSession, GameError> {
        let handle = self.registry.get(id)?;
        let mut guard = handle.lock().await;

        let seat = guard.seat_of(user).ok_or(GameError::NotAParticipant)?;
        if guard.players[seat].is_ai() {
            return Err(GameError::NotAParticipant);
        }

        let mut rng = GameRng::from_state(&guard.rng);
        let mut next = session::apply_action(&guard, seat, &action, now, &mut rng)?;
        next.rng = rng.state();

        let previous = std::mem::replace(&mut *guard, next);
        self.after_transition(&previous, &mut guard, now).await;
        Ok(guard.clone())
    }

    /// Apply passed deadlines across all sessions. Returns how many sessions
    /// changed.
    pub async fn sweep(self: &Arc<Self>, now: DateTime<Utc>) -> usize {
        let mut tasks = JoinSet::new();
        for id in self.registry.ids() {
            let service = Arc::clone(self);
            tasks.spawn(async move {
                let result = service.sweep_session(&id, now).await;
                (id, result)
            });
        }

        let mut changed = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(true))) => changed += 1,
                Ok((_, Ok(false))) => {}
                Ok((id, Err(e))) => debug!(session = %id, error = %e, "sweep skipped session"),
                Err(e) => error!(error = %e, "sweep task failed"),
            }
        }
        changed
    }

    /// Sweep one session.
    pub async fn sweep_session(&self, id: &SessionId, now: DateTime<Utc>) -> Result<bool, GameError> {
        let handle = self.registry.get(id)?;
        let mut guard = handle.lock().await;

        let mut rng = GameRng::from_state(&guard.rng);
        let Some(mut next) = session::sweep(&guard, now, &mut rng) else {
            return Ok(false);
        };
        next.rng = rng.state();

        let previous = std::mem::replace(&mut *guard, next);
        self.after_transition(&previous, &mut guard, now).await;
        Ok(true)
    }

    /// Current record of a session.
    pub async fn snapshot(&self, id: &SessionId) -> Result<GameSession, GameError> {
        self.registry.snapshot(id).await
    }

    /// Drop a session from memory, killing its engine.
    pub fn remove(&self, id: &SessionId) -> Result<(), GameError> {
        self.teardown_engine(id);
        self.registry
            .delete(id)
            .map(|_| ())
            .ok_or_else(|| GameError::SessionNotFound(id.to_string()))
    }

    /// Does the session have a working engine?
    pub async fn engine_available(&self, id: &SessionId) -> bool {
        match self.bridge(id) {
            Some(bridge) => bridge.lock().await.is_operational(),
            None => false,
        }
    }

    /// Replace a session's engine with a fresh process loaded with the
    /// current position, then let the engine seat move if it is its turn.
    pub async fn recreate_engine(&self, id: &SessionId, now: DateTime<Utc>) -> Result<(), GameError> {
        let handle = self.registry.get(id)?;
        let mut guard = handle.lock().await;
        let Some(ai) = guard.ai_seat() else {
            return Err(GameError::InvalidAction("session has no engine seat".into()));
        };
        if guard.phase.is_terminal() {
            return Err(GameError::InvalidAction("session has ended".into()));
        }

        self.teardown_engine(id);
        let mut bridge = self.launch_engine(&guard, ai).await?;
        if guard.phase == Phase::Playing {
            bridge.refresh_placement(&guard.board).await?;
        }
        self.engines.lock().insert(id.clone(), Arc::new(AsyncMutex::new(bridge)));
        info!(session = %id, "engine recreated");

        let unchanged = guard.clone();
        self.after_transition(&unchanged, &mut guard, now).await;
        Ok(())
    }

    async fn launch_engine(&self, session: &GameSession, ai: PlayerId) -> Result<EngineBridge, GameError> {
        let level = match session.players[ai].kind {
            PlayerKind::Ai { level } => level,
            PlayerKind::Human => self.config.engine.default_level,
        };
        let setup = EngineSetup {
            board_size: session.config.board_size,
            komi: session.final_komi,
            level,
        };
        let connection = self.launcher.launch(&self.config.engine).await?;
        Ok(EngineBridge::start(connection, setup).await?)
    }

    fn bridge(&self, id: &SessionId) -> Option<SharedBridge> {
        self.engines.lock().get(id).cloned()
    }

    fn teardown_engine(&self, id: &SessionId) {
        let removed = self.engines.lock().remove(id);
        if let Some(bridge) = removed {
            match bridge.try_lock() {
                Ok(bridge) => bridge.shutdown(),
                // Someone is mid-command; dropping the last handle kills the process.
                Err(_) => debug!(session = %id, "engine busy at teardown"),
            }
        }
    }

    /// Follow-up work after the record changed from `previous` to `session`:
    /// engine mirroring, the engine seat's turn, scoring, archiving.
    async fn after_transition(&self, previous: &GameSession, session: &mut GameSession, now: DateTime<Utc>) {
        let mut rng = GameRng::from_state(&session.rng);

        if let Some(bridge) = self.bridge(&session.id) {
            let mut bridge = bridge.lock().await;
            if let Err(e) = self.drive_engine(previous, session, &mut bridge, now, &mut rng).await {
                error!(session = %session.id, error = %e, code = e.code(), "engine unavailable, engine seat idle");
            }
        }

        session.rng = rng.state();
        if session.phase == Phase::Scoring {
            self.score(session, now).await;
        }

        if session.phase.is_terminal() {
            if let Err(e) = store::archive_session(self.store.as_ref(), session) {
                error!(session = %session.id, error = %e, "session archive failed");
            }
            self.teardown_engine(&session.id);
        }
    }

    async fn drive_engine(
        &self,
        previous: &GameSession,
        session: &mut GameSession,
        bridge: &mut EngineBridge,
        now: DateTime<Utc>,
        rng: &mut GameRng,
    ) -> Result<(), EngineError> {
        if previous.phase != Phase::Playing
            && session.phase == Phase::Playing
            && session.config.mode == GameMode::Base
        {
            bridge.refresh_placement(&session.board).await?;
            bridge.set_komi(session.final_komi).await?;
        }

        for record in session.move_history.iter().skip(previous.move_count()) {
            bridge.play(record.mv).await?;
        }

        let Some(ai) = session.ai_seat() else {
            return Ok(());
        };
        if session.phase != Phase::Playing || session.seat_to_move() != ai {
            return Ok(());
        }

        let color = session.color_of(ai);
        let goal = GoalContext {
            objective_open: session::objective_open(session),
            opponent_passed: session.move_history.last().is_some_and(|r| r.mv.is_pass()),
        };
        let action = match bridge.generate_move(color, goal, rng).await? {
            Vertex::Point(Point { x, y }) => PlayerAction::PlaceStone { x, y },
            Vertex::Pass => PlayerAction::Pass,
            Vertex::Resign => PlayerAction::Resign,
        };

        let before = session.move_count();
        let next = match session::apply_action(session, ai, &action, now, rng) {
            Ok(next) => next,
            Err(e) => {
                warn!(session = %session.id, error = %e, ?action, "engine move refused, passing");
                match session::apply_action(session, ai, &PlayerAction::Pass, now, rng) {
                    Ok(next) => next,
                    Err(e) => {
                        error!(session = %session.id, error = %e, "engine pass refused");
                        return Ok(());
                    }
                }
            }
        };
        *session = next;

        for record in session.move_history.iter().skip(before) {
            bridge.play(record.mv).await?;
        }
        debug!(session = %session.id, ?action, "engine seat moved");
        Ok(())
    }

    /// Count and settle. Reward rolls draw from their own stream, so the
    /// session's sequence is the same whatever the rewards were.
    async fn score(&self, session: &mut GameSession, now: DateTime<Utc>) {
        let mut dead: Option<Vec<Point>> = None;
        let mut engine_score: Option<EngineScore> = None;

        // Positions that stopped early are not counted by the engine.
        let bridge = if session.end_trigger.is_none() {
            self.bridge(&session.id)
        } else {
            None
        };
        if let Some(bridge) = bridge {
            let mut bridge = bridge.lock().await;
            match bridge.dead_stones().await {
                Ok(stones) => dead = Some(stones),
                Err(e) => warn!(session = %session.id, error = %e, "dead stone query failed"),
            }
            match bridge.final_score().await {
                Ok(score) => {
                    info!(session = %session.id, winner = ?score.winner, margin = score.margin, "engine final score");
                    engine_score = Some(score);
                }
                Err(e) => warn!(session = %session.id, error = %e, "engine final score failed"),
            }
        }

        let mut loot = GameRng::from_state(&session.rng).for_context("loot");
        scoring::finish(
            session,
            dead.as_deref(),
            engine_score.as_ref(),
            self.store.as_ref(),
            &self.config.scoring,
            now,
            &mut loot,
        );
    }
}
