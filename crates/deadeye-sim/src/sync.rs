use deadeye_core::mode::GameMode;
use deadeye_core::net::link::{SyncError, SyncLink};
use deadeye_core::net::messages::{
    EntityRef, GameEndMsg, GameStartMsg, PeerId, SyncEnvelope, SyncMessage, TargetHitMsg,
};
use deadeye_core::net::protocol::{decode_envelope, encode_envelope};
use deadeye_core::settings::GameSettings;

/// Mirrors session lifecycle events to other peers over a [`SyncLink`].
///
/// Sync is best-effort: encode and transport failures are logged and the
/// message is dropped. The local session never waits on the network.
pub struct SyncAdapter {
    peer_id: PeerId,
    link: Box<dyn SyncLink>,
    connected: bool,
}

impl std::fmt::Debug for SyncAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncAdapter")
            .field("peer_id", &self.peer_id)
            .field("connected", &self.connected)
            .finish_non_exhaustive()
    }
}

impl SyncAdapter {
    pub fn new(peer_id: PeerId, link: Box<dyn SyncLink>) -> Self {
        Self {
            peer_id,
            link,
            connected: true,
        }
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// False once the link has reported a disconnect.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn announce_start(&mut self, mode: GameMode, settings: &GameSettings) {
        self.send(SyncMessage::GameStart(GameStartMsg {
            mode,
            settings: settings.clone(),
        }));
    }

    pub fn announce_hit(&mut self, entity: EntityRef, hit_score: f32) {
        self.send(SyncMessage::TargetHit(TargetHitMsg { entity, hit_score }));
    }

    pub fn announce_end(&mut self, score: u64, player_kills: u32) {
        self.send(SyncMessage::GameEnd(GameEndMsg {
            score,
            player_kills,
        }));
    }

    fn send(&mut self, message: SyncMessage) {
        if !self.connected {
            return;
        }
        let msg_type = message.message_type();
        let frame = match encode_envelope(&SyncEnvelope {
            sender: self.peer_id,
            message,
        }) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(?msg_type, error = %e, "Failed to encode sync message");
                return;
            },
        };
        if let Err(e) = self.link.send(frame) {
            self.on_link_error(e);
        }
    }

    /// Drain every waiting frame. Malformed frames and echoes of our own
    /// messages are skipped.
    pub fn poll(&mut self) -> Vec<SyncMessage> {
        let mut messages = Vec::new();
        while self.connected {
            let frame = match self.link.try_recv() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    self.on_link_error(e);
                    break;
                },
            };
            match decode_envelope(&frame) {
                Ok(envelope) if envelope.sender == self.peer_id => {
                    tracing::debug!(peer = self.peer_id, "Ignoring own sync echo");
                },
                Ok(envelope) => messages.push(envelope.message),
                Err(e) => {
                    tracing::warn!(error = %e, len = frame.len(), "Dropping malformed sync frame");
                },
            }
        }
        messages
    }

    fn on_link_error(&mut self, error: SyncError) {
        match error {
            SyncError::Disconnected => {
                if self.connected {
                    tracing::warn!(peer = self.peer_id, "Sync link disconnected");
                }
                self.connected = false;
            },
            SyncError::Protocol(e) => {
                tracing::warn!(error = %e, "Sync protocol error");
            },
        }
    }
}
