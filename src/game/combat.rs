//! Combat system - shoot intents, cooldowns and bullet spawning

use uuid::Uuid;

use super::entities::{EntityId, EntityRegistry};
use super::players::{Player, PlayerDirectory};
use super::rules::GameRules;

/// Bullets fired by one player this tick
#[derive(Debug, Clone, PartialEq)]
pub struct ShotFired {
    pub shooter_id: Uuid,
    pub bullet_ids: Vec<EntityId>,
}

/// Combat system for turning shoot intents into bullets
pub struct CombatSystem;

impl CombatSystem {
    /// Check if a player can fire (cooldown check)
    pub fn can_fire(player: &Player, now_ms: u64) -> bool {
        !player.is_eliminated() && now_ms >= player.next_shot_at
    }

    /// Headings for one shot: straight up, plus the fan when triple shot is active
    pub fn shot_angles(player: &Player, now_ms: u64, rules: &GameRules) -> Vec<f32> {
        if player.has_triple_shot(now_ms) {
            vec![0.0, -rules.triple_shot_spread, rules.triple_shot_spread]
        } else {
            vec![0.0]
        }
    }

    /// Consume every player's shoot intent and spawn bullets.
    ///
    /// The intent is cleared whether or not the shot happens, so one pulse
    /// never produces more than one volley.
    pub fn fire(
        players: &mut PlayerDirectory,
        entities: &mut EntityRegistry,
        rules: &GameRules,
        now_ms: u64,
    ) -> Vec<ShotFired> {
        let mut shots = Vec::new();

        for player in players.iter_mut() {
            if !std::mem::take(&mut player.shoot_intent) {
                continue;
            }
            if !Self::can_fire(player, now_ms) {
                continue;
            }

            // Bullets leave from the top center of the avatar
            let hitbox = player.hitbox(rules);
            let origin_x = hitbox.x + hitbox.w / 2.0 - rules.bullet_width / 2.0;
            let origin_y = hitbox.y;
            let bullet_ids = Self::shot_angles(player, now_ms, rules)
                .into_iter()
                .map(|angle| entities.spawn_bullet(player.id, origin_x, origin_y, angle, rules))
                .collect();

            player.next_shot_at = now_ms + rules.shot_cooldown_ms;
            shots.push(ShotFired {
                shooter_id: player.id,
                bullet_ids,
            });
        }

        shots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (GameRules, PlayerDirectory, EntityRegistry, Uuid) {
        let rules = GameRules::standard();
        let mut players = PlayerDirectory::new();
        let id = Uuid::new_v4();
        players.assign_role(id, None, &rules).unwrap();
        (rules, players, EntityRegistry::new(), id)
    }

    #[test]
    fn no_intent_no_bullets() {
        let (rules, mut players, mut entities, _) = setup();
        assert!(CombatSystem::fire(&mut players, &mut entities, &rules, 0).is_empty());
        assert!(entities.bullets.is_empty());
    }

    #[test]
    fn intent_fires_once_and_is_consumed() {
        let (rules, mut players, mut entities, id) = setup();
        players.set_shoot_intent(id, true);

        let shots = CombatSystem::fire(&mut players, &mut entities, &rules, 1_000);
        assert_eq!(shots.len(), 1);
        assert_eq!(shots[0].bullet_ids.len(), 1);
        assert!(!players.get(id).unwrap().shoot_intent);

        let bullet = &entities.bullets[0];
        assert_eq!(bullet.owner_id, id);
        assert_eq!(bullet.angle, 0.0);
        assert_eq!((bullet.x, bullet.y), (397.5, 280.0));

        // Same pulse does not fire again
        assert!(CombatSystem::fire(&mut players, &mut entities, &rules, 2_000).is_empty());
    }

    #[test]
    fn corner_anchored_bullets_leave_from_top_center() {
        let rules = GameRules::classic();
        let mut players = PlayerDirectory::new();
        let mut entities = EntityRegistry::new();
        let id = Uuid::new_v4();
        players.assign_role(id, None, &rules).unwrap();
        players.update_position(id, 400.0, 300.0, &rules);
        players.set_shoot_intent(id, true);

        CombatSystem::fire(&mut players, &mut entities, &rules, 1_000);

        let hitbox = players.get(id).unwrap().hitbox(&rules);
        let bullet = &entities.bullets[0];
        assert_eq!(hitbox.x, 400.0);
        assert_eq!((bullet.x, bullet.y), (417.5, 300.0));
        assert!(bullet.x >= hitbox.x && bullet.x + rules.bullet_width <= hitbox.x + hitbox.w);
    }

    #[test]
    fn cooldown_swallows_pulses() {
        let (rules, mut players, mut entities, id) = setup();
        players.set_shoot_intent(id, true);
        CombatSystem::fire(&mut players, &mut entities, &rules, 1_000);

        players.set_shoot_intent(id, true);
        let shots = CombatSystem::fire(&mut players, &mut entities, &rules, 1_100);
        assert!(shots.is_empty());
        assert!(!players.get(id).unwrap().shoot_intent);

        players.set_shoot_intent(id, true);
        let shots = CombatSystem::fire(&mut players, &mut entities, &rules, 1_200);
        assert_eq!(shots.len(), 1);
        assert_eq!(entities.bullets.len(), 2);
    }

    #[test]
    fn triple_shot_fans_out() {
        let (rules, mut players, mut entities, id) = setup();
        players.get_mut(id).unwrap().triple_shot_until = Some(5_000);
        players.set_shoot_intent(id, true);

        let shots = CombatSystem::fire(&mut players, &mut entities, &rules, 1_000);
        assert_eq!(shots[0].bullet_ids.len(), 3);
        let angles: Vec<f32> = entities.bullets.iter().map(|b| b.angle).collect();
        assert_eq!(angles, vec![0.0, -rules.triple_shot_spread, rules.triple_shot_spread]);
    }

    #[test]
    fn eliminated_player_cannot_fire() {
        let (rules, mut players, mut entities, id) = setup();
        players.get_mut(id).unwrap().lives = 0;
        players.set_shoot_intent(id, true);
        assert!(CombatSystem::fire(&mut players, &mut entities, &rules, 0).is_empty());
    }
}
