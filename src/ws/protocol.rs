//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::game::entities::{EntityId, PickupKind};
use crate::game::players::{Direction, Role};
use crate::game::session::{Outcome, Phase};

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Claim a player slot
    Join {
        /// Preferred role, otherwise the next free one
        #[serde(default)]
        role: Option<Role>,
    },

    /// Fixed-size step
    Move { direction: Direction },

    /// Absolute position (keyboard-driven views)
    SetPosition { x: f32, y: f32 },

    /// Shoot intent from a button or sensor bridge
    Shoot {
        #[serde(deserialize_with = "flag")]
        shoot: bool,
    },

    /// Ready to start
    Ready,

    /// Start a new round after game over
    Restart,

    /// Bullet collision computed by a view that simulates its own bullets
    BulletHit {
        /// Bullet top-left corner
        x: f32,
        y: f32,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },

    /// Leave the arena
    Leave,
}

/// Accepts `true`/`false` as well as the `0`/`1` the sensor bridge sends
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
    })
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        connection_id: Uuid,
        server_time: u64,
    },

    /// Slot granted to this connection
    RoleAssigned {
        player_id: Uuid,
        role: Role,
    },

    /// Full player directory
    Players {
        players: Vec<PlayerSnapshot>,
    },

    /// All falling entities and bullets
    Entities {
        /// Server tick number
        tick: u64,
        obstacles: Vec<ObstacleSnapshot>,
        hearts: Vec<PickupSnapshot>,
        tripleshots: Vec<PickupSnapshot>,
        bullets: Vec<BulletSnapshot>,
    },

    /// Round countdown
    Countdown {
        countdown: u32,
    },

    /// Round has started
    GameStart {
        tick: u64,
    },

    /// Round has ended
    GameOver {
        players: Vec<PlayerSnapshot>,
        outcome: Outcome,
        reason: GameOverReason,
    },

    /// Session was reset; views reinitialize
    Reset,

    /// A player lost a life to an obstacle
    CollisionDetected {
        player_id: Uuid,
        lives: u32,
    },

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Why a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    /// A player ran out of lives
    Eliminated,
    /// A player left mid-round
    Forfeit,
}

/// Player state in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: Uuid,
    pub role: Role,
    pub x: f32,
    pub y: f32,
    pub lives: u32,
    pub score: u32,
    pub shoot: bool,
    pub invincible: bool,
    pub triple_shot: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleSnapshot {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub hit_points: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupSnapshot {
    pub id: EntityId,
    pub kind: PickupKind,
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletSnapshot {
    pub id: EntityId,
    pub owner_id: Uuid,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

/// Match status published for the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchStatus {
    pub phase: Phase,
    pub players: usize,
}
