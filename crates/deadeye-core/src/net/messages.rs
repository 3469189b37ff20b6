use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mode::GameMode;
use crate::settings::GameSettings;

/// Identifier the relay assigns to each connected trainer.
pub type PeerId = u64;

/// Network message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Peer -> Relay
    JoinLobby = 0x01,

    // Relay -> Peer
    Welcome = 0x02,

    // Peer <-> Peer (fanned out by the relay)
    GameStart = 0x10,
    TargetHit = 0x11,
    GameEnd = 0x12,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::JoinLobby),
            0x02 => Some(Self::Welcome),
            0x10 => Some(Self::GameStart),
            0x11 => Some(Self::TargetHit),
            0x12 => Some(Self::GameEnd),
            _ => None,
        }
    }

    /// True for messages that travel between peers inside a [`SyncEnvelope`].
    pub fn is_sync(self) -> bool {
        matches!(self, Self::GameStart | Self::TargetHit | Self::GameEnd)
    }
}

/// Something a shot can hit, named so that a remote peer can find it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    Target(Uuid),
    Agent(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinLobbyMsg {
    pub lobby: String,
    pub protocol_version: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeMsg {
    pub peer_id: PeerId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStartMsg {
    pub mode: GameMode,
    pub settings: GameSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetHitMsg {
    pub entity: EntityRef,
    pub hit_score: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEndMsg {
    pub score: u64,
    pub player_kills: u32,
}

/// Session lifecycle events mirrored between peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncMessage {
    GameStart(GameStartMsg),
    TargetHit(TargetHitMsg),
    GameEnd(GameEndMsg),
}

impl SyncMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::GameStart(_) => MessageType::GameStart,
            Self::TargetHit(_) => MessageType::TargetHit,
            Self::GameEnd(_) => MessageType::GameEnd,
        }
    }
}

/// A sync message stamped with the peer that produced it, so receivers can
/// discard echoes of their own traffic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEnvelope {
    pub sender: PeerId,
    pub message: SyncMessage,
}
