//! Entity registry: falling obstacles, pickups and player bullets

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::collision::Rect;
use super::rules::GameRules;

/// Registry-wide entity id
pub type EntityId = u64;

/// Pickup kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickupKind {
    /// Restores one life
    Heart,
    /// Triple-shot buff (or score, depending on rules)
    TripleShot,
}

/// Falling obstacle. Geometry and speed never change after spawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub speed: f32,
    /// Bullet hits left before destruction
    pub hit_points: u32,
}

impl Obstacle {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Falling pickup
#[derive(Debug, Clone, PartialEq)]
pub struct Pickup {
    pub id: EntityId,
    pub kind: PickupKind,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub speed: f32,
}

impl Pickup {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.size, self.size)
    }
}

/// Bullet fired by a player
#[derive(Debug, Clone, PartialEq)]
pub struct Bullet {
    pub id: EntityId,
    pub owner_id: Uuid,
    pub x: f32,
    pub y: f32,
    /// Heading in radians, 0 is straight up, positive turns right
    pub angle: f32,
    pub speed: f32,
    pub width: f32,
    pub height: f32,
}

impl Bullet {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    fn step(&mut self) {
        self.x += self.angle.sin() * self.speed;
        self.y -= self.angle.cos() * self.speed;
    }
}

/// All non-player entities in the arena
#[derive(Debug, Default)]
pub struct EntityRegistry {
    pub obstacles: Vec<Obstacle>,
    pub hearts: Vec<Pickup>,
    pub triple_shots: Vec<Pickup>,
    pub bullets: Vec<Bullet>,
    next_id: EntityId,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> EntityId {
        self.next_id += 1;
        self.next_id
    }

    /// Append an obstacle at the top edge
    pub fn spawn_obstacle(
        &mut self,
        x: f32,
        width: f32,
        height: f32,
        speed: f32,
        hit_points: u32,
    ) -> EntityId {
        let id = self.allocate_id();
        self.obstacles.push(Obstacle {
            id,
            x,
            y: 0.0,
            width,
            height,
            speed,
            hit_points: hit_points.max(1),
        });
        id
    }

    /// Append a pickup at the top edge
    pub fn spawn_pickup(&mut self, kind: PickupKind, x: f32, size: f32, speed: f32) -> EntityId {
        let id = self.allocate_id();
        let pickup = Pickup {
            id,
            kind,
            x,
            y: 0.0,
            size,
            speed,
        };
        match kind {
            PickupKind::Heart => self.hearts.push(pickup),
            PickupKind::TripleShot => self.triple_shots.push(pickup),
        }
        id
    }

    /// Append a bullet; `x`/`y` is the bullet's top-left corner
    pub fn spawn_bullet(
        &mut self,
        owner_id: Uuid,
        x: f32,
        y: f32,
        angle: f32,
        rules: &GameRules,
    ) -> EntityId {
        let id = self.allocate_id();
        self.bullets.push(Bullet {
            id,
            owner_id,
            x,
            y,
            angle,
            speed: rules.bullet_speed,
            width: rules.bullet_width,
            height: rules.bullet_height,
        });
        id
    }

    /// Move every entity one tick along its path
    pub fn advance(&mut self) {
        for obstacle in &mut self.obstacles {
            obstacle.y += obstacle.speed;
        }
        for pickup in self.hearts.iter_mut().chain(self.triple_shots.iter_mut()) {
            pickup.y += pickup.speed;
        }
        for bullet in &mut self.bullets {
            bullet.step();
        }
    }

    /// Drop entities that left the arena. Returns how many were removed.
    pub fn prune(&mut self, width: f32, height: f32) -> usize {
        let before = self.len();

        self.obstacles.retain(|o| o.y <= height);
        self.hearts.retain(|p| p.y <= height);
        self.triple_shots.retain(|p| p.y <= height);

        let arena = Rect::new(0.0, 0.0, width, height);
        self.bullets.retain(|b| b.rect().overlaps(&arena));

        before - self.len()
    }

    /// Remove every entity whose id is in `ids`
    pub fn remove_ids(&mut self, ids: &HashSet<EntityId>) {
        if ids.is_empty() {
            return;
        }
        self.obstacles.retain(|o| !ids.contains(&o.id));
        self.hearts.retain(|p| !ids.contains(&p.id));
        self.triple_shots.retain(|p| !ids.contains(&p.id));
        self.bullets.retain(|b| !ids.contains(&b.id));
    }

    /// Remove all bullets owned by a player
    pub fn remove_bullets_of(&mut self, owner_id: Uuid) {
        self.bullets.retain(|b| b.owner_id != owner_id);
    }

    pub fn clear(&mut self) {
        self.obstacles.clear();
        self.hearts.clear();
        self.triple_shots.clear();
        self.bullets.clear();
    }

    pub fn len(&self) -> usize {
        self.obstacles.len() + self.hearts.len() + self.triple_shots.len() + self.bullets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
