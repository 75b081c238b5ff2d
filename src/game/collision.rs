//! Collision detection and resolution
//!
//! All tests are plain axis-aligned rectangle overlap, evaluated once per tick.
//! Fast or thin entities can tunnel through each other between ticks.
//!
//! Removal is two-pass: ids are collected in a set during the scan (anything
//! already in the set is skipped) and the collections are rebuilt afterwards,
//! so removing one entity never causes a sibling to be skipped or visited twice.

use std::collections::HashSet;

use uuid::Uuid;

use super::entities::{EntityId, EntityRegistry, Obstacle, Pickup};
use super::players::PlayerDirectory;
use super::rules::{GameRules, TripleShotEffect};

/// Axis-aligned rectangle, `x`/`y` is the top-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Strict overlap; touching edges do not count
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }
}

/// Outcome of a single collision
#[derive(Debug, Clone, PartialEq)]
pub enum CollisionEvent {
    /// Obstacle damaged a player
    PlayerHit {
        player_id: Uuid,
        obstacle_id: EntityId,
        lives: u32,
        eliminated: bool,
    },
    HeartCollected {
        player_id: Uuid,
        lives: u32,
    },
    TripleShotCollected {
        player_id: Uuid,
    },
    /// Bullet took a hit point off a multi-hit obstacle
    ObstacleDamaged {
        owner_id: Uuid,
        obstacle_id: EntityId,
        hit_points: u32,
    },
    /// Bullet destroyed an obstacle or pickup
    EntityDestroyed {
        owner_id: Uuid,
        entity_id: EntityId,
        points: u32,
    },
}

/// What a bullet did to the first entity it overlapped
enum Strike {
    Damaged { entity_id: EntityId, hit_points: u32 },
    Destroyed { entity_id: EntityId, points: u32 },
}

/// Collision system for players, bullets, obstacles and pickups
pub struct CollisionSystem;

impl CollisionSystem {
    /// Run every collision test for one tick and apply the results.
    ///
    /// Per player (in slot order): obstacles, then hearts, then triple shots.
    /// Then every bullet against obstacles first, pickups second.
    pub fn resolve(
        players: &mut PlayerDirectory,
        entities: &mut EntityRegistry,
        rules: &GameRules,
        now_ms: u64,
    ) -> Vec<CollisionEvent> {
        let mut events = Vec::new();
        let mut removed: HashSet<EntityId> = HashSet::new();

        for player in players.iter_mut() {
            let hitbox = player.hitbox(rules);

            for obstacle in &entities.obstacles {
                if removed.contains(&obstacle.id) || !hitbox.overlaps(&obstacle.rect()) {
                    continue;
                }
                // Eliminated and invincible players pass through untouched
                if player.is_eliminated() || player.is_invincible(now_ms) {
                    continue;
                }

                removed.insert(obstacle.id);
                player.lives -= 1;
                let eliminated = player.is_eliminated();
                if !eliminated {
                    player.invincible_until = Some(now_ms + rules.invincibility_ms);
                }

                events.push(CollisionEvent::PlayerHit {
                    player_id: player.id,
                    obstacle_id: obstacle.id,
                    lives: player.lives,
                    eliminated,
                });
            }

            if player.is_eliminated() {
                continue;
            }

            for heart in &entities.hearts {
                if removed.contains(&heart.id) || !hitbox.overlaps(&heart.rect()) {
                    continue;
                }
                removed.insert(heart.id);
                player.gain_life(rules.max_lives);
                events.push(CollisionEvent::HeartCollected {
                    player_id: player.id,
                    lives: player.lives,
                });
            }

            for pickup in &entities.triple_shots {
                if removed.contains(&pickup.id) || !hitbox.overlaps(&pickup.rect()) {
                    continue;
                }
                removed.insert(pickup.id);
                match rules.triple_shot {
                    TripleShotEffect::Buff { duration_ms } => {
                        player.triple_shot_until = Some(now_ms + duration_ms);
                    }
                    TripleShotEffect::Score(points) => player.add_score(points),
                }
                events.push(CollisionEvent::TripleShotCollected {
                    player_id: player.id,
                });
            }
        }

        let obstacles = &mut entities.obstacles;
        let pickups = [&entities.hearts, &entities.triple_shots];
        for bullet in &entities.bullets {
            if removed.contains(&bullet.id) {
                continue;
            }
            let Some(strike) = Self::strike(&bullet.rect(), obstacles, pickups, &mut removed, rules)
            else {
                continue;
            };
            removed.insert(bullet.id);
            events.push(Self::apply_strike(players, bullet.owner_id, strike));
        }

        entities.remove_ids(&removed);
        events
    }

    /// Resolve a bullet hit computed by a client against the current entities.
    ///
    /// The reported bullet position is tested exactly like a server bullet.
    /// Returns `None` when nothing is under the bullet.
    pub fn resolve_reported_hit(
        players: &mut PlayerDirectory,
        entities: &mut EntityRegistry,
        rules: &GameRules,
        owner_id: Uuid,
        x: f32,
        y: f32,
    ) -> Option<CollisionEvent> {
        let bullet = Rect::new(x, y, rules.bullet_width, rules.bullet_height);
        let mut removed = HashSet::new();
        let pickups = [&entities.hearts, &entities.triple_shots];
        let strike = Self::strike(&bullet, &mut entities.obstacles, pickups, &mut removed, rules)?;

        entities.remove_ids(&removed);
        Some(Self::apply_strike(players, owner_id, strike))
    }

    /// Find the first live entity under the bullet and damage it.
    /// Destroyed entities are added to `removed`.
    fn strike(
        bullet: &Rect,
        obstacles: &mut [Obstacle],
        pickups: [&Vec<Pickup>; 2],
        removed: &mut HashSet<EntityId>,
        rules: &GameRules,
    ) -> Option<Strike> {
        if let Some(obstacle) = obstacles
            .iter_mut()
            .find(|o| !removed.contains(&o.id) && bullet.overlaps(&o.rect()))
        {
            obstacle.hit_points = obstacle.hit_points.saturating_sub(1);
            if obstacle.hit_points > 0 {
                return Some(Strike::Damaged {
                    entity_id: obstacle.id,
                    hit_points: obstacle.hit_points,
                });
            }
            removed.insert(obstacle.id);
            return Some(Strike::Destroyed {
                entity_id: obstacle.id,
                points: rules.points_for_width(obstacle.width),
            });
        }

        let pickup = pickups
            .into_iter()
            .flatten()
            .find(|p| !removed.contains(&p.id) && bullet.overlaps(&p.rect()))?;
        removed.insert(pickup.id);
        Some(Strike::Destroyed {
            entity_id: pickup.id,
            points: rules.points_for_width(pickup.size),
        })
    }

    fn apply_strike(players: &mut PlayerDirectory, owner_id: Uuid, strike: Strike) -> CollisionEvent {
        match strike {
            Strike::Damaged {
                entity_id,
                hit_points,
            } => CollisionEvent::ObstacleDamaged {
                owner_id,
                obstacle_id: entity_id,
                hit_points,
            },
            Strike::Destroyed { entity_id, points } => {
                // Owner may have disconnected since firing
                if let Some(owner) = players.get_mut(owner_id) {
                    owner.add_score(points);
                }
                CollisionEvent::EntityDestroyed {
                    owner_id,
                    entity_id,
                    points,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::PickupKind;
    use crate::game::players::Role;

    struct Fixture {
        rules: GameRules,
        players: PlayerDirectory,
        entities: EntityRegistry,
        circle: Uuid,
        square: Uuid,
    }

    impl Fixture {
        fn new(rules: GameRules) -> Self {
            let mut players = PlayerDirectory::new();
            let circle = Uuid::new_v4();
            let square = Uuid::new_v4();
            players.assign_role(circle, Some(Role::Circle), &rules).unwrap();
            players.assign_role(square, Some(Role::Square), &rules).unwrap();
            // Park the square player out of the way
            players.update_position(square, 780.0, 580.0, &rules);
            Self {
                rules,
                players,
                entities: EntityRegistry::new(),
                circle,
                square,
            }
        }

        fn place(&mut self, id: Uuid, x: f32, y: f32) {
            self.players.update_position(id, x, y, &self.rules);
        }

        fn obstacle_at(&mut self, x: f32, y: f32, size: f32) -> EntityId {
            let id = self.entities.spawn_obstacle(x, size, size, 2.0, 1);
            self.entities.obstacles.last_mut().unwrap().y = y;
            id
        }

        fn pickup_at(&mut self, kind: PickupKind, x: f32, y: f32) -> EntityId {
            let id = self.entities.spawn_pickup(kind, x, 20.0, 3.0);
            let list = match kind {
                PickupKind::Heart => &mut self.entities.hearts,
                PickupKind::TripleShot => &mut self.entities.triple_shots,
            };
            list.last_mut().unwrap().y = y;
            id
        }

        fn resolve(&mut self, now_ms: u64) -> Vec<CollisionEvent> {
            CollisionSystem::resolve(&mut self.players, &mut self.entities, &self.rules, now_ms)
        }

        fn circle(&self) -> &crate::game::players::Player {
            self.players.get(self.circle).unwrap()
        }
    }

    #[test]
    fn rect_overlap_is_strict() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.overlaps(&Rect::new(9.0, 9.0, 10.0, 10.0)));
        assert!(!a.overlaps(&Rect::new(10.0, 0.0, 10.0, 10.0)));
        assert!(!a.overlaps(&Rect::new(0.0, 10.0, 10.0, 10.0)));
        assert!(a.overlaps(&Rect::new(2.0, 2.0, 1.0, 1.0)));
    }

    #[test]
    fn obstacle_hit_costs_a_life_and_grants_invincibility() {
        let mut f = Fixture::new(GameRules::standard());
        f.place(f.circle, 10.0, 10.0);
        let obstacle = f.obstacle_at(0.0, 0.0, 30.0);

        let events = f.resolve(1_000);

        assert_eq!(
            events,
            vec![CollisionEvent::PlayerHit {
                player_id: f.circle,
                obstacle_id: obstacle,
                lives: 2,
                eliminated: false,
            }]
        );
        assert_eq!(f.circle().lives, 2);
        assert_eq!(f.circle().invincible_until, Some(1_000 + f.rules.invincibility_ms));
        assert!(f.entities.obstacles.is_empty());
    }

    #[test]
    fn invincibility_blocks_obstacles_but_not_pickups() {
        let mut f = Fixture::new(GameRules::standard());
        f.place(f.circle, 100.0, 100.0);
        f.players.get_mut(f.circle).unwrap().invincible_until = Some(5_000);
        f.obstacle_at(90.0, 90.0, 30.0);
        f.pickup_at(PickupKind::Heart, 95.0, 95.0);

        let events = f.resolve(4_999);

        assert_eq!(
            events,
            vec![CollisionEvent::HeartCollected {
                player_id: f.circle,
                lives: 4,
            }]
        );
        assert_eq!(f.entities.obstacles.len(), 1);
        assert!(f.entities.hearts.is_empty());

        // Once the window has passed the same obstacle does damage
        let events = f.resolve(5_000);
        assert!(matches!(events[0], CollisionEvent::PlayerHit { lives: 3, .. }));
    }

    #[test]
    fn several_obstacles_in_one_tick_hit_once() {
        let mut f = Fixture::new(GameRules::standard());
        f.place(f.circle, 100.0, 100.0);
        let first = f.obstacle_at(85.0, 85.0, 20.0);
        let second = f.obstacle_at(95.0, 95.0, 20.0);
        let third = f.obstacle_at(100.0, 100.0, 10.0);

        let events = f.resolve(0);

        // The first hit grants invincibility, the rest stay in play
        assert_eq!(events.len(), 1);
        assert_eq!(f.circle().lives, 2);
        let left: Vec<_> = f.entities.obstacles.iter().map(|o| o.id).collect();
        assert_eq!(left, vec![second, third]);
        assert!(!left.contains(&first));
    }

    #[test]
    fn last_life_eliminates_without_invincibility() {
        let mut f = Fixture::new(GameRules::standard());
        f.place(f.circle, 100.0, 100.0);
        f.players.get_mut(f.circle).unwrap().lives = 1;
        f.obstacle_at(90.0, 90.0, 30.0);
        f.obstacle_at(95.0, 95.0, 30.0);
        f.pickup_at(PickupKind::Heart, 95.0, 95.0);

        let events = f.resolve(0);

        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            CollisionEvent::PlayerHit {
                lives: 0,
                eliminated: true,
                ..
            }
        ));
        assert_eq!(f.circle().lives, 0);
        assert_eq!(f.circle().invincible_until, None);
        // Eliminated players neither take further hits nor collect pickups
        assert_eq!(f.entities.obstacles.len(), 1);
        assert_eq!(f.entities.hearts.len(), 1);
    }

    #[test]
    fn heart_at_max_lives_is_still_consumed() {
        let mut f = Fixture::new(GameRules::standard());
        f.place(f.circle, 100.0, 100.0);
        f.players.get_mut(f.circle).unwrap().lives = f.rules.max_lives;
        f.pickup_at(PickupKind::Heart, 95.0, 95.0);

        f.resolve(0);

        assert_eq!(f.circle().lives, f.rules.max_lives);
        assert!(f.entities.hearts.is_empty());
    }

    #[test]
    fn triple_shot_effect_depends_on_rules() {
        let mut f = Fixture::new(GameRules::standard());
        f.place(f.circle, 100.0, 100.0);
        f.pickup_at(PickupKind::TripleShot, 95.0, 95.0);
        f.resolve(2_000);
        assert_eq!(f.circle().triple_shot_until, Some(12_000));
        assert_eq!(f.circle().score, 0);

        let mut f = Fixture::new(GameRules::classic());
        f.place(f.circle, 100.0, 100.0);
        f.pickup_at(PickupKind::TripleShot, 105.0, 105.0);
        f.resolve(2_000);
        assert_eq!(f.circle().triple_shot_until, None);
        assert_eq!(f.circle().score, 1);
        assert!(f.entities.triple_shots.is_empty());
    }

    #[test]
    fn pickup_goes_to_first_player_only() {
        let mut f = Fixture::new(GameRules::standard());
        f.place(f.circle, 100.0, 100.0);
        f.place(f.square, 105.0, 105.0);
        f.pickup_at(PickupKind::Heart, 95.0, 95.0);

        let events = f.resolve(0);

        assert_eq!(events.len(), 1);
        assert_eq!(f.circle().lives, 4);
        assert_eq!(f.players.get(f.square).unwrap().lives, 3);
    }

    #[test]
    fn bullet_destroys_obstacle_and_scores() {
        let mut f = Fixture::new(GameRules::standard());
        let obstacle = f.obstacle_at(200.0, 100.0, 40.0);
        let bullet = f.entities.spawn_bullet(f.circle, 210.0, 120.0, 0.0, &f.rules);

        let events = f.resolve(0);

        assert_eq!(
            events,
            vec![CollisionEvent::EntityDestroyed {
                owner_id: f.circle,
                entity_id: obstacle,
                points: 4,
            }]
        );
        assert_eq!(f.circle().score, 4);
        assert!(f.entities.obstacles.is_empty());
        assert!(f.entities.bullets.iter().all(|b| b.id != bullet));
    }

    #[test]
    fn multi_hit_obstacle_needs_two_bullets() {
        let mut f = Fixture::new(GameRules::standard());
        let obstacle = f.entities.spawn_obstacle(200.0, 64.0, 32.0, 2.0, 2);
        f.entities.spawn_bullet(f.circle, 210.0, 10.0, 0.0, &f.rules);
        f.entities.spawn_bullet(f.square, 220.0, 10.0, 0.0, &f.rules);

        let events = f.resolve(0);

        assert_eq!(
            events,
            vec![
                CollisionEvent::ObstacleDamaged {
                    owner_id: f.circle,
                    obstacle_id: obstacle,
                    hit_points: 1,
                },
                CollisionEvent::EntityDestroyed {
                    owner_id: f.square,
                    entity_id: obstacle,
                    points: 5,
                },
            ]
        );
        assert_eq!(f.circle().score, 0);
        assert_eq!(f.players.get(f.square).unwrap().score, 5);
        assert!(f.entities.bullets.is_empty());
    }

    #[test]
    fn two_bullets_on_one_obstacle_only_score_once() {
        let mut f = Fixture::new(GameRules::standard());
        f.obstacle_at(200.0, 100.0, 30.0);
        let spare = f.entities.spawn_bullet(f.circle, 205.0, 105.0, 0.0, &f.rules);
        f.entities.spawn_bullet(f.circle, 210.0, 105.0, 0.0, &f.rules);
        // First bullet in the list wins
        let first = f.entities.bullets[0].id;
        assert_eq!(first, spare);

        let events = f.resolve(0);

        assert_eq!(events.len(), 1);
        assert_eq!(f.circle().score, 3);
        assert_eq!(f.entities.bullets.len(), 1);
        assert_ne!(f.entities.bullets[0].id, first);
    }

    #[test]
    fn bullet_destroys_pickup() {
        let mut f = Fixture::new(GameRules::standard());
        let heart = f.pickup_at(PickupKind::Heart, 300.0, 100.0);
        f.entities.spawn_bullet(f.square, 305.0, 105.0, 0.0, &f.rules);

        let events = f.resolve(0);

        assert_eq!(
            events,
            vec![CollisionEvent::EntityDestroyed {
                owner_id: f.square,
                entity_id: heart,
                points: 2,
            }]
        );
        assert!(f.entities.hearts.is_empty());
    }

    #[test]
    fn obstacle_taken_by_player_is_not_struck_by_bullet() {
        let mut f = Fixture::new(GameRules::standard());
        f.place(f.circle, 100.0, 100.0);
        f.obstacle_at(90.0, 90.0, 30.0);
        f.entities.spawn_bullet(f.square, 95.0, 95.0, 0.0, &f.rules);

        let events = f.resolve(0);

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], CollisionEvent::PlayerHit { .. }));
        assert_eq!(f.players.get(f.square).unwrap().score, 0);
        assert_eq!(f.entities.bullets.len(), 1);
    }

    #[test]
    fn reported_hit_scores_for_reporter() {
        let mut f = Fixture::new(GameRules::standard());
        let obstacle = f.obstacle_at(400.0, 50.0, 20.0);

        let missed = CollisionSystem::resolve_reported_hit(
            &mut f.players,
            &mut f.entities,
            &f.rules,
            f.square,
            10.0,
            10.0,
        );
        assert_eq!(missed, None);

        let event = CollisionSystem::resolve_reported_hit(
            &mut f.players,
            &mut f.entities,
            &f.rules,
            f.square,
            405.0,
            55.0,
        );
        assert_eq!(
            event,
            Some(CollisionEvent::EntityDestroyed {
                owner_id: f.square,
                entity_id: obstacle,
                points: 2,
            })
        );
        assert_eq!(f.players.get(f.square).unwrap().score, 2);
        assert!(f.entities.obstacles.is_empty());
    }
}
