use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};

use deadeye_core::net::messages::{MessageType, PeerId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("lobby name must not be empty")]
    EmptyLobbyName,
    #[error("maximum lobby limit reached ({0})")]
    LobbyLimit(usize),
}

/// Who receives a routed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fanout {
    /// Every peer in the lobby except the sender.
    Others,
    /// Every peer in the lobby, the sender included.
    Everyone,
}

/// Routing for a peer-originated frame, or `None` if peers may not send it.
pub fn fanout_for(msg_type: MessageType) -> Option<Fanout> {
    match msg_type {
        MessageType::GameStart => Some(Fanout::Others),
        MessageType::TargetHit | MessageType::GameEnd => Some(Fanout::Everyone),
        MessageType::JoinLobby | MessageType::Welcome => None,
    }
}

/// Peek at the tag byte of a frame.
pub fn peek_message_type(data: &[u8]) -> Option<MessageType> {
    data.first().copied().and_then(MessageType::from_byte)
}

/// A relay lobby: every connected peer's bounded outbound queue.
#[derive(Default)]
struct Lobby {
    peers: HashMap<PeerId, mpsc::Sender<Vec<u8>>>,
}

/// Lobbies and their peers. Frames are routed by tag only; payloads are
/// never decoded.
pub struct RelayState {
    lobbies: HashMap<String, Lobby>,
    next_peer_id: PeerId,
    max_lobbies: usize,
}

impl RelayState {
    pub fn new(max_lobbies: usize) -> Self {
        Self {
            lobbies: HashMap::new(),
            next_peer_id: 1,
            max_lobbies,
        }
    }

    /// Add a peer to `lobby`, creating the lobby on first join.
    pub fn join(
        &mut self,
        lobby: &str,
        tx: mpsc::Sender<Vec<u8>>,
    ) -> Result<PeerId, RelayError> {
        if lobby.is_empty() {
            return Err(RelayError::EmptyLobbyName);
        }
        if !self.lobbies.contains_key(lobby) && self.lobbies.len() >= self.max_lobbies {
            return Err(RelayError::LobbyLimit(self.max_lobbies));
        }
        let id = self.next_peer_id;
        self.next_peer_id += 1;
        self.lobbies
            .entry(lobby.to_string())
            .or_default()
            .peers
            .insert(id, tx);
        Ok(id)
    }

    /// Remove a peer. Returns true if its lobby was emptied and removed.
    pub fn leave(&mut self, lobby: &str, peer: PeerId) -> bool {
        let Some(room) = self.lobbies.get_mut(lobby) else {
            return false;
        };
        room.peers.remove(&peer);
        if room.peers.is_empty() {
            self.lobbies.remove(lobby);
            return true;
        }
        false
    }

    /// Deliver a frame from `sender` to the lobby. Returns how many peers it
    /// was queued for. A peer whose queue is full misses the frame.
    pub fn route(&self, lobby: &str, sender: PeerId, data: &[u8]) -> usize {
        let Some(fanout) = peek_message_type(data).and_then(fanout_for) else {
            return 0;
        };
        let Some(room) = self.lobbies.get(lobby) else {
            return 0;
        };
        let mut delivered = 0;
        for (&id, tx) in &room.peers {
            if fanout == Fanout::Others && id == sender {
                continue;
            }
            match tx.try_send(data.to_vec()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(lobby, peer_id = id, "Peer queue full, frame dropped");
                },
                Err(mpsc::error::TrySendError::Closed(_)) => {},
            }
        }
        delivered
    }

    pub fn lobby_exists(&self, lobby: &str) -> bool {
        self.lobbies.contains_key(lobby)
    }

    pub fn lobby_count(&self) -> usize {
        self.lobbies.len()
    }

    pub fn peer_count(&self, lobby: &str) -> usize {
        self.lobbies.get(lobby).map_or(0, |l| l.peers.len())
    }
}

/// Shared relay state behind an async RwLock.
pub type SharedRelayState = Arc<RwLock<RelayState>>;
