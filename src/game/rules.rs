//! Tunable game rules
//!
//! Several generations of the game shipped with different constants. Each is
//! kept as a named rule set rather than hard-coding one of them.

use std::f32::consts::FRAC_PI_4;

/// Where the player hit box sits relative to the player's position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitboxAnchor {
    /// Position is the center of the box (matches how views draw the shapes)
    Center,
    /// Position is the top-left corner of the box
    Corner,
}

/// What collecting a triple-shot pickup does
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TripleShotEffect {
    /// Fire three bullets per shot until the buff expires
    Buff { duration_ms: u64 },
    /// Flat score bonus
    Score(u32),
}

/// Difficulty ramp while a round is active
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyRules {
    /// Added to the scalar on every step
    pub step: f32,
    /// Active time between steps
    pub interval_ms: u64,
    /// Upper bound of the scalar
    pub max: f32,
}

/// Complete rule set for a match
#[derive(Debug, Clone, PartialEq)]
pub struct GameRules {
    /// Arena size
    pub arena_width: f32,
    pub arena_height: f32,

    /// Player hit box edge length
    pub player_size: f32,
    pub hitbox_anchor: HitboxAnchor,
    /// Position players start (and restart) at
    pub spawn_x: f32,
    pub spawn_y: f32,
    /// Position delta for one `move` event
    pub move_step: f32,

    pub initial_lives: u32,
    pub max_lives: u32,
    pub invincibility_ms: u64,

    /// Per-tick spawn probabilities before difficulty scaling
    pub obstacle_chance: f64,
    pub heart_chance: f64,
    pub triple_shot_chance: f64,

    /// Obstacle width is drawn from `min_width..min_width + width_range`
    pub obstacle_min_width: f32,
    pub obstacle_width_range: f32,
    /// Height as a fraction of width
    pub obstacle_aspect: f32,
    /// Fall speed is `max(min_speed, base_speed - width * speed_per_width)`
    pub obstacle_base_speed: f32,
    pub obstacle_speed_per_width: f32,
    pub obstacle_min_speed: f32,
    /// Obstacles at least this wide take `multi_hit_points` bullets
    pub multi_hit_width: Option<f32>,
    pub multi_hit_points: u32,

    pub pickup_size: f32,
    pub pickup_speed: f32,

    pub bullet_width: f32,
    pub bullet_height: f32,
    pub bullet_speed: f32,
    pub shot_cooldown_ms: u64,
    /// Angle between the center and side bullets of a triple shot
    pub triple_shot_spread: f32,
    pub triple_shot: TripleShotEffect,

    /// Score for destroying an entity is `round(width * points_per_width)`,
    /// at least 1 and at most `max_points_per_kill`
    pub points_per_width: f32,
    pub max_points_per_kill: u32,

    pub difficulty: Option<DifficultyRules>,

    /// Countdown length in seconds
    pub countdown_secs: u32,
}

impl GameRules {
    /// Current rule set: five-life cap, difficulty ramp, timed triple-shot buff
    pub fn standard() -> Self {
        Self {
            arena_width: 800.0,
            arena_height: 600.0,
            player_size: 40.0,
            hitbox_anchor: HitboxAnchor::Center,
            spawn_x: 400.0,
            spawn_y: 300.0,
            move_step: 5.0,
            initial_lives: 3,
            max_lives: 5,
            invincibility_ms: 5_000,
            obstacle_chance: 1.0 / 20.0,
            heart_chance: 1.0 / 100.0,
            triple_shot_chance: 1.0 / 150.0,
            obstacle_min_width: 20.0,
            obstacle_width_range: 50.0,
            obstacle_aspect: 0.5,
            obstacle_base_speed: 8.0,
            obstacle_speed_per_width: 0.1,
            obstacle_min_speed: 2.0,
            multi_hit_width: Some(60.0),
            multi_hit_points: 2,
            pickup_size: 20.0,
            pickup_speed: 3.0,
            bullet_width: 5.0,
            bullet_height: 10.0,
            bullet_speed: 7.0,
            shot_cooldown_ms: 200,
            triple_shot_spread: FRAC_PI_4,
            triple_shot: TripleShotEffect::Buff { duration_ms: 10_000 },
            points_per_width: 0.1,
            max_points_per_kill: 5,
            difficulty: Some(DifficultyRules {
                step: 0.1,
                interval_ms: 10_000,
                max: 2.0,
            }),
            countdown_secs: 3,
        }
    }

    /// First-generation rules: three lives, no ramp, triple-shot pickups score a point
    pub fn classic() -> Self {
        Self {
            hitbox_anchor: HitboxAnchor::Corner,
            max_lives: 3,
            multi_hit_width: None,
            triple_shot: TripleShotEffect::Score(1),
            difficulty: None,
            ..Self::standard()
        }
    }

    /// Look up a rule set by name
    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "standard" => Some(Self::standard()),
            "classic" => Some(Self::classic()),
            _ => None,
        }
    }

    /// Fall speed for an obstacle of the given width (larger is slower)
    pub fn obstacle_speed(&self, width: f32) -> f32 {
        (self.obstacle_base_speed - width * self.obstacle_speed_per_width)
            .max(self.obstacle_min_speed)
    }

    /// Hit points for an obstacle of the given width
    pub fn obstacle_hit_points(&self, width: f32) -> u32 {
        match self.multi_hit_width {
            Some(threshold) if width >= threshold => self.multi_hit_points.max(1),
            _ => 1,
        }
    }

    /// Points awarded for destroying an entity of the given width
    pub fn points_for_width(&self, width: f32) -> u32 {
        let raw = (width * self.points_per_width).round().max(1.0) as u32;
        raw.min(self.max_points_per_kill)
    }
}

impl Default for GameRules {
    fn default() -> Self {
        Self::standard()
    }
}
