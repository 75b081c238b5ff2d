//! Player directory: the two fixed player slots and their attributes

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::collision::Rect;
use super::rules::{GameRules, HitboxAnchor};

/// The two fixed roles. Views draw `Circle` as player 1 and `Square` as player 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[serde(alias = "client1")]
    Circle,
    #[serde(alias = "client2")]
    Square,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Circle, Role::Square];

    fn slot(self) -> usize {
        match self {
            Role::Circle => 0,
            Role::Square => 1,
        }
    }
}

/// Movement direction for a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Player state (authoritative)
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: Uuid,
    pub role: Role,
    pub x: f32,
    pub y: f32,
    pub lives: u32,
    pub score: u32,
    /// Set by input, consumed by the shooting step
    pub shoot_intent: bool,
    /// Simulation time (ms) at which invincibility ends
    pub invincible_until: Option<u64>,
    /// Simulation time (ms) at which the triple-shot buff ends
    pub triple_shot_until: Option<u64>,
    /// Earliest simulation time (ms) of the next shot
    pub next_shot_at: u64,
}

impl Player {
    pub fn new(id: Uuid, role: Role, rules: &GameRules) -> Self {
        Self {
            id,
            role,
            x: rules.spawn_x,
            y: rules.spawn_y,
            lives: rules.initial_lives,
            score: 0,
            shoot_intent: false,
            invincible_until: None,
            triple_shot_until: None,
            next_shot_at: 0,
        }
    }

    pub fn is_invincible(&self, now_ms: u64) -> bool {
        self.invincible_until.is_some_and(|until| now_ms < until)
    }

    pub fn has_triple_shot(&self, now_ms: u64) -> bool {
        self.triple_shot_until.is_some_and(|until| now_ms < until)
    }

    pub fn is_eliminated(&self) -> bool {
        self.lives == 0
    }

    /// Clear timed effects that have run out
    pub fn expire_effects(&mut self, now_ms: u64) {
        if !self.is_invincible(now_ms) {
            self.invincible_until = None;
        }
        if !self.has_triple_shot(now_ms) {
            self.triple_shot_until = None;
        }
    }

    pub fn add_score(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    /// Gain a life, returns false when already at the cap
    pub fn gain_life(&mut self, max_lives: u32) -> bool {
        if self.lives < max_lives {
            self.lives += 1;
            true
        } else {
            false
        }
    }

    pub fn hitbox(&self, rules: &GameRules) -> Rect {
        let size = rules.player_size;
        match rules.hitbox_anchor {
            HitboxAnchor::Center => Rect::new(self.x - size / 2.0, self.y - size / 2.0, size, size),
            HitboxAnchor::Corner => Rect::new(self.x, self.y, size, size),
        }
    }

    /// Restore round-start values, keeping identity and role
    pub fn reset(&mut self, rules: &GameRules) {
        *self = Self::new(self.id, self.role, rules);
    }

    fn move_to(&mut self, x: f32, y: f32, rules: &GameRules) {
        self.x = x.clamp(0.0, rules.arena_width);
        self.y = y.clamp(0.0, rules.arena_height);
    }
}

/// Join failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("Both player slots are taken")]
    ArenaFull,
}

impl JoinError {
    pub fn code(&self) -> &'static str {
        match self {
            JoinError::ArenaFull => "arena_full",
        }
    }
}

/// Slot table with capacity two, indexed by role
#[derive(Debug, Default)]
pub struct PlayerDirectory {
    slots: [Option<Player>; 2],
}

impl PlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give a connection a player slot.
    ///
    /// The preferred role is used when free, otherwise the next free one.
    /// A connection that already holds a slot keeps it.
    pub fn assign_role(
        &mut self,
        id: Uuid,
        preferred: Option<Role>,
        rules: &GameRules,
    ) -> Result<&Player, JoinError> {
        if let Some(slot) = self.slot_of(id) {
            return self.slots[slot].as_ref().ok_or(JoinError::ArenaFull);
        }

        let role = preferred
            .filter(|role| self.slots[role.slot()].is_none())
            .or_else(|| Role::ALL.into_iter().find(|role| self.slots[role.slot()].is_none()))
            .ok_or(JoinError::ArenaFull)?;

        Ok(&*self.slots[role.slot()].insert(Player::new(id, role, rules)))
    }

    fn slot_of(&self, id: Uuid) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|p| p.id == id))
    }

    pub fn get(&self, id: Uuid) -> Option<&Player> {
        self.slot_of(id).and_then(|slot| self.slots[slot].as_ref())
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Player> {
        self.slot_of(id).and_then(|slot| self.slots[slot].as_mut())
    }

    /// Absolute position override, clamped to the arena
    pub fn update_position(&mut self, id: Uuid, x: f32, y: f32, rules: &GameRules) -> bool {
        match self.get_mut(id) {
            Some(player) => {
                player.move_to(x, y, rules);
                true
            }
            None => false,
        }
    }

    /// Fixed-size step in one direction, clamped to the arena
    pub fn step(&mut self, id: Uuid, direction: Direction, rules: &GameRules) -> bool {
        let Some(player) = self.get_mut(id) else {
            return false;
        };
        let (dx, dy) = match direction {
            Direction::Up => (0.0, -rules.move_step),
            Direction::Down => (0.0, rules.move_step),
            Direction::Left => (-rules.move_step, 0.0),
            Direction::Right => (rules.move_step, 0.0),
        };
        let (x, y) = (player.x + dx, player.y + dy);
        player.move_to(x, y, rules);
        true
    }

    pub fn set_shoot_intent(&mut self, id: Uuid, shoot: bool) -> bool {
        match self.get_mut(id) {
            Some(player) => {
                player.shoot_intent = shoot;
                true
            }
            None => false,
        }
    }

    /// Free the connection's slot
    pub fn remove(&mut self, id: Uuid) -> Option<Player> {
        self.slot_of(id).and_then(|slot| self.slots[slot].take())
    }

    /// Restore every present player to round-start values
    pub fn reset_for_new_round(&mut self, rules: &GameRules) {
        for player in self.iter_mut() {
            player.reset(rules);
        }
    }

    /// Players in slot order
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.slots.iter_mut().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.slots.len()
    }
}
