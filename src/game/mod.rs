//! Game simulation modules

pub mod collision;
pub mod combat;
pub mod entities;
pub mod r#match;
pub mod players;
pub mod rules;
pub mod session;
pub mod snapshot;
pub mod spawner;

pub use r#match::{GameMatch, MatchHandle};

use crate::ws::protocol::{ClientMsg, ServerMsg};
use uuid::Uuid;

/// Player input received from WebSocket
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub conn_id: Uuid,
    pub msg: ClientMsg,
    pub received_at: u64,
}

/// Audience of an outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    All,
    Only(Uuid),
}

/// Server message together with who should receive it
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub target: Target,
    pub msg: ServerMsg,
}

impl Outbound {
    pub fn all(msg: ServerMsg) -> Self {
        Self {
            target: Target::All,
            msg,
        }
    }

    pub fn to(conn_id: Uuid, msg: ServerMsg) -> Self {
        Self {
            target: Target::Only(conn_id),
            msg,
        }
    }

    /// Whether this envelope should be written to the given connection
    pub fn is_for(&self, conn_id: Uuid) -> bool {
        match self.target {
            Target::All => true,
            Target::Only(id) => id == conn_id,
        }
    }
}
