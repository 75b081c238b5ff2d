//! Spawner: random obstacle/pickup creation and the difficulty ramp

use rand::Rng;

use super::entities::{EntityRegistry, PickupKind};
use super::rules::GameRules;

/// What a single spawn step produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpawnReport {
    pub obstacles: u32,
    pub hearts: u32,
    pub triple_shots: u32,
    /// Entities that fell out of the arena
    pub pruned: usize,
}

/// Difficulty scalar, raised on its own timer while a round is active
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Difficulty {
    pub level: f32,
    elapsed_ms: u64,
}

impl Difficulty {
    pub fn new() -> Self {
        Self {
            level: 1.0,
            elapsed_ms: 0,
        }
    }

    /// Advance the timer. Returns the new level when it changed.
    pub fn advance(&mut self, dt_ms: u64, rules: &GameRules) -> Option<f32> {
        let ramp = rules.difficulty?;
        if ramp.interval_ms == 0 || self.level >= ramp.max {
            return None;
        }

        self.elapsed_ms += dt_ms;
        let mut changed = false;
        while self.elapsed_ms >= ramp.interval_ms && self.level < ramp.max {
            self.elapsed_ms -= ramp.interval_ms;
            self.level = (self.level + ramp.step).min(ramp.max);
            changed = true;
        }
        changed.then_some(self.level)
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns entities and moves them each active tick
#[derive(Debug, Default)]
pub struct Spawner {
    pub difficulty: Difficulty,
}

impl Spawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// One spawn step: independent trials per entity kind, then advance and prune
    pub fn step<R: Rng>(
        &mut self,
        rng: &mut R,
        entities: &mut EntityRegistry,
        rules: &GameRules,
    ) -> SpawnReport {
        let scale = self.difficulty.level;
        let mut report = SpawnReport::default();

        if Self::trial(rng, rules.obstacle_chance, scale) {
            let width = rules.obstacle_min_width + rng.gen::<f32>() * rules.obstacle_width_range;
            let height = width * rules.obstacle_aspect;
            let x = rng.gen::<f32>() * (rules.arena_width - width);
            let speed = rules.obstacle_speed(width) * scale;
            entities.spawn_obstacle(x, width, height, speed, rules.obstacle_hit_points(width));
            report.obstacles += 1;
        }

        if Self::trial(rng, rules.heart_chance, scale) {
            Self::spawn_pickup(rng, entities, rules, PickupKind::Heart, scale);
            report.hearts += 1;
        }

        if Self::trial(rng, rules.triple_shot_chance, scale) {
            Self::spawn_pickup(rng, entities, rules, PickupKind::TripleShot, scale);
            report.triple_shots += 1;
        }

        entities.advance();
        report.pruned = entities.prune(rules.arena_width, rules.arena_height);
        report
    }

    pub fn reset(&mut self) {
        self.difficulty = Difficulty::new();
    }

    fn trial<R: Rng>(rng: &mut R, chance: f64, scale: f32) -> bool {
        let p = (chance * scale as f64).clamp(0.0, 1.0);
        rng.gen_bool(p)
    }

    fn spawn_pickup<R: Rng>(
        rng: &mut R,
        entities: &mut EntityRegistry,
        rules: &GameRules,
        kind: PickupKind,
        scale: f32,
    ) {
        let x = rng.gen::<f32>() * (rules.arena_width - rules.pickup_size);
        entities.spawn_pickup(kind, x, rules.pickup_size, rules.pickup_speed * scale);
    }
}
