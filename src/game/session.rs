//! Session state machine: ready-up, countdown, active round, game over

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::players::{Player, Role};

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Waiting for both players to ready up
    Waiting,
    /// Countdown before start
    CountingDown,
    /// Round in progress
    Active,
    /// Round ended, waiting for a restart
    Over,
}

/// Transitions that views need to hear about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Seconds left before the round starts
    Countdown(u32),
    /// Round started
    Started,
}

/// Round result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Winner { player_id: Uuid, role: Role },
    Tie,
}

impl Outcome {
    /// Strictly highest score wins, anything else is a tie
    pub fn decide<'a>(players: impl IntoIterator<Item = &'a Player>) -> Self {
        let mut best: Option<&Player> = None;
        let mut tied = false;

        for player in players {
            match best {
                Some(leader) if player.score == leader.score => tied = true,
                Some(leader) if player.score < leader.score => {}
                _ => {
                    best = Some(player);
                    tied = false;
                }
            }
        }

        match best {
            Some(leader) if !tied => Outcome::Winner {
                player_id: leader.id,
                role: leader.role,
            },
            _ => Outcome::Tie,
        }
    }
}

/// Process-wide session lifecycle
#[derive(Debug)]
pub struct Session {
    phase: Phase,
    ready: HashSet<Role>,
    countdown_secs: u32,
    countdown_remaining: u32,
    countdown_elapsed_ms: u64,
}

impl Session {
    pub fn new(countdown_secs: u32) -> Self {
        Self {
            phase: Phase::Waiting,
            ready: HashSet::new(),
            countdown_secs,
            countdown_remaining: 0,
            countdown_elapsed_ms: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    pub fn ready_count(&self) -> usize {
        self.ready.len()
    }

    pub fn is_ready(&self, role: Role) -> bool {
        self.ready.contains(&role)
    }

    /// Seconds left while counting down
    pub fn countdown_remaining(&self) -> Option<u32> {
        (self.phase == Phase::CountingDown).then_some(self.countdown_remaining)
    }

    /// Record a ready signal. Starts the countdown once both slots are ready.
    pub fn ready(&mut self, role: Role) -> Option<SessionEvent> {
        if self.phase != Phase::Waiting {
            return None;
        }
        self.ready.insert(role);
        if Role::ALL.iter().any(|r| !self.ready.contains(r)) {
            return None;
        }

        if self.countdown_secs == 0 {
            self.phase = Phase::Active;
            return Some(SessionEvent::Started);
        }
        self.phase = Phase::CountingDown;
        self.countdown_remaining = self.countdown_secs;
        self.countdown_elapsed_ms = 0;
        Some(SessionEvent::Countdown(self.countdown_remaining))
    }

    /// Withdraw a ready signal (the slot was vacated)
    pub fn unready(&mut self, role: Role) {
        if self.phase == Phase::Waiting {
            self.ready.remove(&role);
        }
    }

    /// Advance the countdown by one tick's worth of time
    pub fn tick(&mut self, dt_ms: u64) -> Option<SessionEvent> {
        if self.phase != Phase::CountingDown {
            return None;
        }

        self.countdown_elapsed_ms += dt_ms;
        if self.countdown_elapsed_ms < 1_000 {
            return None;
        }
        self.countdown_elapsed_ms -= 1_000;
        self.countdown_remaining = self.countdown_remaining.saturating_sub(1);

        if self.countdown_remaining == 0 {
            self.phase = Phase::Active;
            Some(SessionEvent::Started)
        } else {
            Some(SessionEvent::Countdown(self.countdown_remaining))
        }
    }

    /// Abort a running countdown back to waiting; ready flags are cleared
    pub fn cancel_countdown(&mut self) -> bool {
        if self.phase != Phase::CountingDown {
            return false;
        }
        self.phase = Phase::Waiting;
        self.ready.clear();
        self.countdown_remaining = 0;
        self.countdown_elapsed_ms = 0;
        true
    }

    /// End the active round. Only the first call has an effect.
    pub fn finish(&mut self) -> bool {
        if self.phase != Phase::Active {
            return false;
        }
        self.phase = Phase::Over;
        true
    }

    /// Back to waiting after a finished round. Ignored in any other phase.
    pub fn restart(&mut self) -> bool {
        if self.phase != Phase::Over {
            return false;
        }
        *self = Self::new(self.countdown_secs);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::rules::GameRules;
    use crate::util::time::tick_millis;

    fn player(role: Role, score: u32) -> Player {
        let mut p = Player::new(Uuid::new_v4(), role, &GameRules::standard());
        p.score = score;
        p
    }

    fn start(session: &mut Session) {
        session.ready(Role::Circle);
        session.ready(Role::Square);
        while session.tick(tick_millis()) != Some(SessionEvent::Started) {}
    }

    #[test]
    fn countdown_starts_when_both_ready() {
        let mut session = Session::new(3);
        assert_eq!(session.ready(Role::Circle), None);
        assert_eq!(session.ready(Role::Circle), None);
        assert_eq!(session.ready_count(), 1);
        assert_eq!(session.phase(), Phase::Waiting);

        assert_eq!(session.ready(Role::Square), Some(SessionEvent::Countdown(3)));
        assert_eq!(session.phase(), Phase::CountingDown);
        assert_eq!(session.countdown_remaining(), Some(3));
    }

    #[test]
    fn countdown_emits_once_per_second_then_starts() {
        let mut session = Session::new(3);
        session.ready(Role::Circle);
        session.ready(Role::Square);

        let mut events = Vec::new();
        let mut elapsed = 0;
        while session.phase() == Phase::CountingDown {
            elapsed += tick_millis();
            if let Some(event) = session.tick(tick_millis()) {
                events.push((elapsed, event));
            }
        }

        let kinds: Vec<_> = events.iter().map(|(_, e)| *e).collect();
        assert_eq!(
            kinds,
            vec![
                SessionEvent::Countdown(2),
                SessionEvent::Countdown(1),
                SessionEvent::Started
            ]
        );
        // ~1s apart
        for (i, (at, _)) in events.iter().enumerate() {
            let expected = (i as u64 + 1) * 1_000;
            assert!(*at >= expected && *at < expected + tick_millis(), "event at {at}");
        }
        assert!(session.is_active());
    }

    #[test]
    fn zero_countdown_starts_immediately() {
        let mut session = Session::new(0);
        session.ready(Role::Square);
        assert_eq!(session.ready(Role::Circle), Some(SessionEvent::Started));
        assert!(session.is_active());
    }

    #[test]
    fn ready_ignored_outside_waiting() {
        let mut session = Session::new(3);
        start(&mut session);
        assert_eq!(session.ready(Role::Circle), None);
        assert!(session.is_active());
    }

    #[test]
    fn unready_drops_a_waiting_slot() {
        let mut session = Session::new(3);
        session.ready(Role::Circle);
        session.unready(Role::Circle);
        assert_eq!(session.ready(Role::Square), None);
        assert_eq!(session.phase(), Phase::Waiting);
    }

    #[test]
    fn cancel_countdown_returns_to_waiting() {
        let mut session = Session::new(3);
        session.ready(Role::Circle);
        session.ready(Role::Square);
        assert!(session.cancel_countdown());
        assert_eq!(session.phase(), Phase::Waiting);
        assert_eq!(session.ready_count(), 0);
        assert_eq!(session.tick(5_000), None);
        assert!(!session.cancel_countdown());
    }

    #[test]
    fn finish_happens_exactly_once() {
        let mut session = Session::new(3);
        assert!(!session.finish());
        start(&mut session);
        assert!(session.finish());
        assert!(!session.finish());
        assert_eq!(session.phase(), Phase::Over);
    }

    #[test]
    fn restart_only_from_over_and_idempotent() {
        let mut session = Session::new(3);
        session.ready(Role::Circle);
        assert!(!session.restart());
        assert!(session.is_ready(Role::Circle));

        session.ready(Role::Square);
        while session.tick(tick_millis()) != Some(SessionEvent::Started) {}
        session.finish();

        assert!(session.restart());
        assert!(!session.restart());
        assert_eq!(session.phase(), Phase::Waiting);
        assert_eq!(session.ready_count(), 0);
        assert_eq!(session.countdown_remaining(), None);
    }

    #[test]
    fn higher_score_wins() {
        let a = player(Role::Circle, 5);
        let b = player(Role::Square, 3);
        assert_eq!(
            Outcome::decide([&a, &b]),
            Outcome::Winner {
                player_id: a.id,
                role: Role::Circle
            }
        );
        assert_eq!(
            Outcome::decide([&b, &a]),
            Outcome::Winner {
                player_id: a.id,
                role: Role::Circle
            }
        );
    }

    #[test]
    fn equal_scores_tie() {
        let a = player(Role::Circle, 4);
        let b = player(Role::Square, 4);
        assert_eq!(Outcome::decide([&a, &b]), Outcome::Tie);
        assert_eq!(Outcome::decide(Vec::<&Player>::new()), Outcome::Tie);
    }

    #[test]
    fn lone_player_wins() {
        let b = player(Role::Square, 0);
        assert!(matches!(Outcome::decide([&b]), Outcome::Winner { role: Role::Square, .. }));
    }
}
