//! Snapshot building for network transmission

use crate::ws::protocol::{
    BulletSnapshot, ObstacleSnapshot, PickupSnapshot, PlayerSnapshot, ServerMsg,
};

use super::entities::{EntityRegistry, Pickup};
use super::players::{Player, PlayerDirectory};

/// Builds player and entity snapshots.
///
/// The player list is only re-sent when it differs from the last one sent,
/// which covers directory mutations as well as buffs running out.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    last_players: Option<Vec<PlayerSnapshot>>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force a player snapshot on the next check (after a reset)
    pub fn force_next(&mut self) {
        self.last_players = None;
    }

    /// `players` message if anything changed since the last one
    pub fn players_if_changed(&mut self, players: &PlayerDirectory, now_ms: u64) -> Option<ServerMsg> {
        let current = Self::players(players, now_ms);
        if self.last_players.as_ref() == Some(&current) {
            return None;
        }
        self.last_players = Some(current.clone());
        Some(ServerMsg::Players { players: current })
    }

    /// Players in slot order
    pub fn players(players: &PlayerDirectory, now_ms: u64) -> Vec<PlayerSnapshot> {
        players.iter().map(|p| Self::player(p, now_ms)).collect()
    }

    fn player(p: &Player, now_ms: u64) -> PlayerSnapshot {
        PlayerSnapshot {
            id: p.id,
            role: p.role,
            x: p.x,
            y: p.y,
            lives: p.lives,
            score: p.score,
            shoot: p.shoot_intent,
            invincible: p.is_invincible(now_ms),
            triple_shot: p.has_triple_shot(now_ms),
        }
    }

    /// Build the per-tick `entities` message
    pub fn entities(tick: u64, entities: &EntityRegistry) -> ServerMsg {
        ServerMsg::Entities {
            tick,
            obstacles: entities
                .obstacles
                .iter()
                .map(|o| ObstacleSnapshot {
                    id: o.id,
                    x: o.x,
                    y: o.y,
                    width: o.width,
                    height: o.height,
                    hit_points: o.hit_points,
                })
                .collect(),
            hearts: entities.hearts.iter().map(Self::pickup).collect(),
            tripleshots: entities.triple_shots.iter().map(Self::pickup).collect(),
            bullets: entities
                .bullets
                .iter()
                .map(|b| BulletSnapshot {
                    id: b.id,
                    owner_id: b.owner_id,
                    x: b.x,
                    y: b.y,
                    angle: b.angle,
                })
                .collect(),
        }
    }

    fn pickup(p: &Pickup) -> PickupSnapshot {
        PickupSnapshot {
            id: p.id,
            kind: p.kind,
            x: p.x,
            y: p.y,
            size: p.size,
        }
    }
}
