//! Match state and authoritative tick loop

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::interval;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::util::time::{tick_duration, tick_millis, unix_millis};
use crate::ws::protocol::{ClientMsg, GameOverReason, MatchStatus, ServerMsg};

use super::collision::{CollisionEvent, CollisionSystem};
use super::combat::CombatSystem;
use super::entities::EntityRegistry;
use super::players::{Direction, PlayerDirectory, Role};
use super::rules::GameRules;
use super::session::{Outcome, Phase, Session, SessionEvent};
use super::snapshot::SnapshotBuilder;
use super::spawner::Spawner;
use super::{Outbound, PlayerInput};

/// Match state (owned by match task)
pub struct MatchState {
    pub rules: GameRules,
    pub seed: u64,
    pub tick: u64,
    /// Simulation clock, advanced by one tick's worth of ms per tick
    pub clock_ms: u64,
    pub players: PlayerDirectory,
    pub entities: EntityRegistry,
    pub session: Session,
    pub spawner: Spawner,
    rng: ChaCha8Rng,
    snapshots: SnapshotBuilder,
}

impl MatchState {
    pub fn new(rules: GameRules, seed: u64) -> Self {
        Self {
            session: Session::new(rules.countdown_secs),
            rules,
            seed,
            tick: 0,
            clock_ms: 0,
            players: PlayerDirectory::new(),
            entities: EntityRegistry::new(),
            spawner: Spawner::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            snapshots: SnapshotBuilder::new(),
        }
    }

    pub fn status(&self) -> MatchStatus {
        MatchStatus {
            phase: self.session.phase(),
            players: self.players.len(),
        }
    }

    /// Apply one input event. Runs between ticks.
    pub fn apply(&mut self, input: PlayerInput) -> Vec<Outbound> {
        let conn_id = input.conn_id;
        let mut out = Vec::new();
        trace!(
            conn_id = %conn_id,
            msg = ?input.msg,
            queued_ms = unix_millis().saturating_sub(input.received_at),
            "Input"
        );

        match input.msg {
            ClientMsg::Join { role } => self.handle_join(conn_id, role, &mut out),
            ClientMsg::Move { direction } => self.handle_move(conn_id, direction),
            ClientMsg::SetPosition { x, y } => {
                if !self.players.update_position(conn_id, x, y, &self.rules) {
                    debug!(conn_id = %conn_id, "Position from connection without a slot");
                }
            }
            ClientMsg::Shoot { shoot } => self.handle_shoot(conn_id, shoot),
            ClientMsg::Ready => self.handle_ready(conn_id, &mut out),
            ClientMsg::Restart => self.handle_restart(&mut out),
            ClientMsg::BulletHit { x, y } => self.handle_bullet_hit(conn_id, x, y),
            ClientMsg::Ping { t } => out.push(Outbound::to(conn_id, ServerMsg::Pong { t })),
            ClientMsg::Leave => self.handle_leave(conn_id, &mut out),
        }

        out
    }

    /// Handle player join request
    fn handle_join(&mut self, conn_id: Uuid, preferred: Option<Role>, out: &mut Vec<Outbound>) {
        match self.players.assign_role(conn_id, preferred, &self.rules) {
            Ok(player) => {
                let role = player.role;
                info!(
                    player_id = %conn_id,
                    role = ?role,
                    player_count = self.players.len(),
                    "Player joined"
                );
                out.push(Outbound::to(
                    conn_id,
                    ServerMsg::RoleAssigned {
                        player_id: conn_id,
                        role,
                    },
                ));
                if self.players.is_full() {
                    info!("Both slots taken, waiting for ready");
                }
            }
            Err(err) => {
                warn!(conn_id = %conn_id, error = %err, "Join rejected");
                out.push(Outbound::to(
                    conn_id,
                    ServerMsg::Error {
                        code: err.code().to_string(),
                        message: err.to_string(),
                    },
                ));
            }
        }
    }

    fn handle_move(&mut self, conn_id: Uuid, direction: Direction) {
        if !self.players.step(conn_id, direction, &self.rules) {
            debug!(conn_id = %conn_id, "Move from connection without a slot");
        }
    }

    fn handle_shoot(&mut self, conn_id: Uuid, shoot: bool) {
        if !self.session.is_active() {
            debug!(conn_id = %conn_id, phase = ?self.session.phase(), "Shoot outside a round ignored");
            return;
        }
        self.players.set_shoot_intent(conn_id, shoot);
    }

    fn handle_ready(&mut self, conn_id: Uuid, out: &mut Vec<Outbound>) {
        let Some(role) = self.players.get(conn_id).map(|p| p.role) else {
            debug!(conn_id = %conn_id, "Ready from connection without a slot");
            return;
        };

        if self.session.is_ready(role) {
            debug!(player_id = %conn_id, "Already ready");
            return;
        }

        info!(player_id = %conn_id, role = ?role, "Player ready");
        if let Some(event) = self.session.ready(role) {
            out.push(self.session_message(event));
        }
    }

    fn handle_restart(&mut self, out: &mut Vec<Outbound>) {
        if !self.session.restart() {
            debug!(phase = ?self.session.phase(), "Restart outside game over ignored");
            return;
        }

        self.entities.clear();
        self.players.reset_for_new_round(&self.rules);
        self.spawner.reset();
        self.snapshots.force_next();
        info!(tick = self.tick, "Session reset");
        out.push(Outbound::all(ServerMsg::Reset));
    }

    /// Bullet collision reported by a view that simulates its own bullets
    fn handle_bullet_hit(&mut self, conn_id: Uuid, x: f32, y: f32) {
        if !self.session.is_active() || self.players.get(conn_id).is_none() {
            debug!(conn_id = %conn_id, "Bullet hit outside a round ignored");
            return;
        }

        let event = CollisionSystem::resolve_reported_hit(
            &mut self.players,
            &mut self.entities,
            &self.rules,
            conn_id,
            x,
            y,
        );
        if let Some(event) = event {
            debug!(player_id = %conn_id, event = ?event, "Reported bullet hit applied");
        }
    }

    /// Handle player leave
    fn handle_leave(&mut self, conn_id: Uuid, out: &mut Vec<Outbound>) {
        let Some(player) = self.players.remove(conn_id) else {
            return;
        };
        self.entities.remove_bullets_of(conn_id);

        info!(
            player_id = %conn_id,
            role = ?player.role,
            phase = ?self.session.phase(),
            "Player left"
        );

        match self.session.phase() {
            Phase::Waiting => self.session.unready(player.role),
            Phase::CountingDown => {
                self.session.cancel_countdown();
                info!("Countdown cancelled");
                out.push(Outbound::all(ServerMsg::Reset));
            }
            Phase::Active => {
                if self.session.finish() {
                    info!(tick = self.tick, "Round forfeited");
                    out.push(self.game_over(GameOverReason::Forfeit));
                }
            }
            Phase::Over => {}
        }
    }

    /// Run a single simulation tick
    pub fn tick(&mut self) -> Vec<Outbound> {
        let dt = tick_millis();
        self.tick += 1;
        self.clock_ms += dt;
        let mut out = Vec::new();

        match self.session.phase() {
            Phase::CountingDown => {
                if let Some(event) = self.session.tick(dt) {
                    out.push(self.session_message(event));
                }
            }
            Phase::Active => self.run_round(dt, &mut out),
            Phase::Waiting | Phase::Over => {}
        }

        if let Some(msg) = self.snapshots.players_if_changed(&self.players, self.clock_ms) {
            out.push(Outbound::all(msg));
        }
        out.push(Outbound::all(SnapshotBuilder::entities(self.tick, &self.entities)));
        out
    }

    /// Shooting, spawning, collisions and the end-of-round check
    fn run_round(&mut self, dt: u64, out: &mut Vec<Outbound>) {
        let now = self.clock_ms;

        for player in self.players.iter_mut() {
            player.expire_effects(now);
        }

        let shots = CombatSystem::fire(&mut self.players, &mut self.entities, &self.rules, now);
        for shot in &shots {
            debug!(player_id = %shot.shooter_id, bullets = shot.bullet_ids.len(), "Shot fired");
        }

        let report = self.spawner.step(&mut self.rng, &mut self.entities, &self.rules);
        if report.obstacles + report.hearts + report.triple_shots > 0 {
            debug!(tick = self.tick, report = ?report, "Spawned");
        }

        let events = CollisionSystem::resolve(&mut self.players, &mut self.entities, &self.rules, now);
        for event in events {
            if let CollisionEvent::PlayerHit {
                player_id,
                lives,
                eliminated,
                ..
            } = event
            {
                info!(player_id = %player_id, lives, eliminated, "Player hit");
                out.push(Outbound::all(ServerMsg::CollisionDetected { player_id, lives }));
            }
        }

        if let Some(level) = self.spawner.difficulty.advance(dt, &self.rules) {
            info!(level, tick = self.tick, "Difficulty raised");
        }

        if self.players.iter().any(|p| p.is_eliminated()) && self.session.finish() {
            info!(tick = self.tick, "Round over");
            out.push(self.game_over(GameOverReason::Eliminated));
        }
    }

    fn session_message(&self, event: SessionEvent) -> Outbound {
        let msg = match event {
            SessionEvent::Countdown(countdown) => {
                info!(countdown, "Countdown");
                ServerMsg::Countdown { countdown }
            }
            SessionEvent::Started => {
                info!(tick = self.tick, "Round started");
                ServerMsg::GameStart { tick: self.tick }
            }
        };
        Outbound::all(msg)
    }

    fn game_over(&self, reason: GameOverReason) -> Outbound {
        Outbound::all(ServerMsg::GameOver {
            players: SnapshotBuilder::players(&self.players, self.clock_ms),
            outcome: Outcome::decide(self.players.iter()),
            reason,
        })
    }
}

/// Handle to the running match
#[derive(Clone)]
pub struct MatchHandle {
    pub input_tx: mpsc::Sender<PlayerInput>,
    pub outbound_tx: broadcast::Sender<Outbound>,
    pub status_rx: watch::Receiver<MatchStatus>,
}

impl MatchHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.outbound_tx.subscribe()
    }

    pub fn status(&self) -> MatchStatus {
        *self.status_rx.borrow()
    }
}

/// The authoritative game match
pub struct GameMatch {
    state: MatchState,
    input_rx: mpsc::Receiver<PlayerInput>,
    outbound_tx: broadcast::Sender<Outbound>,
    status_tx: watch::Sender<MatchStatus>,
}

impl GameMatch {
    /// Create the match and the handle connections talk to it through
    pub fn new(rules: GameRules, seed: u64) -> (Self, MatchHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (outbound_tx, _) = broadcast::channel(256);

        let state = MatchState::new(rules, seed);
        let (status_tx, status_rx) = watch::channel(state.status());

        let handle = MatchHandle {
            input_tx,
            outbound_tx: outbound_tx.clone(),
            status_rx,
        };

        let game_match = Self {
            state,
            input_rx,
            outbound_tx,
            status_tx,
        };

        (game_match, handle)
    }

    /// Run the authoritative tick loop until every input sender is gone
    pub async fn run(mut self) {
        info!(seed = self.state.seed, "Game loop started");

        let mut tick_interval = interval(tick_duration());
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;

            // Drain input queue
            let open = self.process_inputs();

            let out = self.state.tick();
            self.broadcast(out);
            self.status_tx.send_if_modified(|status| {
                let current = self.state.status();
                let changed = *status != current;
                *status = current;
                changed
            });

            if !open {
                info!(tick = self.state.tick, "Input channel closed, stopping game loop");
                break;
            }
        }
    }

    /// Process all pending inputs. Returns false once the channel is closed.
    fn process_inputs(&mut self) -> bool {
        loop {
            match self.input_rx.try_recv() {
                Ok(input) => {
                    let out = self.state.apply(input);
                    self.broadcast(out);
                }
                Err(mpsc::error::TryRecvError::Empty) => return true,
                Err(mpsc::error::TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn broadcast(&self, out: Vec<Outbound>) {
        for envelope in out {
            // No receivers just means nobody is connected
            let _ = self.outbound_tx.send(envelope);
        }
    }
}
